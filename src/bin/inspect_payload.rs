use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;

use lineup_specs::extract::FieldExtractor;
use lineup_specs::models::{Category, Field};
use lineup_specs::parsers::{resolve_column_names, resolve_columns, ShapeRegistry};

/// Show how a captured payload normalizes: grid rows, column names and extracted fields.
#[derive(Debug, Parser)]
#[command(name = "inspect-payload")]
struct Args {
    /// JSON payload files
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Category whose extraction rules to apply (ipad, mac)
    #[arg(long, default_value = "ipad")]
    category: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let category = match args.category.to_lowercase().as_str() {
        "mac" | "macbook" => Category::Mac,
        _ => Category::Ipad,
    };
    let registry = ShapeRegistry::default();
    let extractor = FieldExtractor::for_category(category);

    for path in &args.files {
        println!("== {}", path.display());
        let raw = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let payload: Value = serde_json::from_str(&raw).with_context(|| format!("{} is not JSON", path.display()))?;

        let grid = registry.normalize(&payload);
        if grid.is_empty() {
            println!("No registered shape matched (tried: {})", registry.matcher_names().join(", "));
            if let Some(object) = payload.as_object() {
                let keys: Vec<&str> = object.keys().map(String::as_str).collect();
                println!("Top-level keys: {}", keys.join(", "));
            }
            continue;
        }

        let names = resolve_column_names(&payload);
        let columns = resolve_columns(&payload, &grid);
        println!(
            "Grid: {} rows, {} columns ({} named)",
            grid.len(),
            grid.width(),
            names.len()
        );

        for row in grid.rows() {
            let cells: Vec<String> = row
                .cells
                .iter()
                .map(|(column, text)| format!("[{}] {}", column, text))
                .collect();
            println!("  {:<32} {}", row.label, cells.join(" | "));
        }

        for column in extractor.extract(&grid, &columns) {
            println!("\n{} (column {})", column.name, column.column);
            for field in Field::ALL {
                if let Some(value) = column.values.get(field) {
                    println!("  {:<16} {:?}", field.key(), value);
                }
            }
            for (variant, token) in column.values.price_tokens() {
                println!("  price token      {} = {}", variant, token);
            }
        }
        println!();
    }

    Ok(())
}
