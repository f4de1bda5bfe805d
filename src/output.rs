use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::models::{columns, Currency, ProductRecord};

fn needs_quotes(field: &str) -> bool {
    field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r')
}

pub fn write_row<W: Write>(w: &mut W, row: &[String]) -> io::Result<()> {
    let mut first = true;
    for cell in row {
        if !first {
            write!(w, ",")?;
        } else {
            first = false;
        }
        if needs_quotes(cell) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            write!(w, "{}", cell)?;
        }
    }
    writeln!(w)
}

/// Header plus one row per record.
pub fn write_records<W: Write>(w: &mut W, records: &[ProductRecord], currency: Currency) -> io::Result<()> {
    write_row(w, &columns(currency))?;
    for record in records {
        write_row(w, &record.to_row())?;
    }
    Ok(())
}

/// `<stem>_<region>_<YYYY-MM-DD>.csv`
pub fn output_file_name(stem: &str, region: &str, date: NaiveDate) -> String {
    format!("{}_{}_{}.csv", stem, region.to_lowercase(), date.format("%Y-%m-%d"))
}

pub fn write_csv_file(
    out_dir: &Path,
    file_name: &str,
    records: &[ProductRecord],
    currency: Currency,
) -> Result<PathBuf> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory {}", out_dir.display()))?;

    let path = out_dir.join(file_name);
    let file = File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    write_records(&mut writer, records, currency)?;
    writer.flush()?;

    Ok(path)
}
