use once_cell::sync::Lazy;
use regex::Regex;

pub const PORTS_HIGH_SPEED: &str = "USB-C (Thunderbolt/USB 4)";
pub const PORTS_USB_C: &str = "USB-C";

static CHIP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(M\d+(?:\s?(?:Pro|Max|Ultra))?|A\d+\s?Pro|A\d+)\b")
        .expect("Invalid chip regex")
});

static HOURS_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d+)\s*hours?\b")
        .expect("Invalid hours regex")
});

static GRAMS_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d{2,4})\s*(?:g|grams)\b")
        .expect("Invalid grams regex")
});

static KG_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*kg\b")
        .expect("Invalid kilograms regex")
});

static GB_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d{2,5})\s*GB\b")
        .expect("Invalid GB regex")
});

static TB_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{1,2}(?:\.\d+)?)\s*TB\b")
        .expect("Invalid TB regex")
});

static UP_TO_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)up to\s*(\d+(?:\.\d+)?)\s*(GB|TB)\b")
        .expect("Invalid up-to regex")
});

static INCH_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(\d+(?:\.\d+)?)\s*(["”″]|-?inch(?:es)?\b|in\b)"#)
        .expect("Invalid inch regex")
});

static HIGH_SPEED_PORT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)thunderbolt(?:\s*/?\s*usb\s*4)?|\busb\s*4\b")
        .expect("Invalid Thunderbolt regex")
});

static USB_C_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bUSB[-\u{2011}\u{2013}\u{2014} ]?C\b")
        .expect("Invalid USB-C regex")
});

static RAM_CELL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d{1,3})\s*GB\b")
        .expect("Invalid memory cell regex")
});

static RAM_TEXT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d{1,3})\s*GB\s+(?:of\s+)?(?:unified\s+)?(?:memory|RAM)\b")
        .expect("Invalid memory regex")
});

/// Smallest diagonal accepted from a bare "in" unit; "2 in 1" is not a display.
const MIN_BARE_INCHES: f64 = 5.0;

/// Base and top storage tiers of a product.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StorageBounds {
    pub base_gb: Option<f64>,
    pub top_tb: Option<f64>,
}

impl StorageBounds {
    pub fn is_empty(&self) -> bool {
        self.base_gb.is_none() && self.top_tb.is_none()
    }
}

/// First chip family mention ("M4", "M3 Pro", "A17 Pro", "A16").
pub fn parse_chip(text: &str) -> Option<String> {
    CHIP_REGEX
        .find(text)
        .map(|m| m.as_str().split_whitespace().collect::<Vec<_>>().join(" "))
}

pub fn parse_battery_hours(text: &str) -> Option<f64> {
    HOURS_REGEX
        .captures(text)
        .and_then(|caps| caps[1].parse::<f64>().ok())
}

/// Weight in kilograms from a grams amount ("444 g") or a kilograms amount ("1.24 kg").
pub fn parse_weight_kg(text: &str) -> Option<f64> {
    let text = text.replace(',', "");
    if let Some(caps) = GRAMS_REGEX.captures(&text) {
        if let Ok(grams) = caps[1].parse::<f64>() {
            return Some((grams / 1000.0 * 1000.0).round() / 1000.0);
        }
    }

    KG_REGEX
        .captures(&text)
        .and_then(|caps| caps[1].parse::<f64>().ok())
}

/// Storage options: smallest capacity in GB and largest in TB.
///
/// An "up to N GB/TB" phrase only contributes to the top tier; without any other capacity the
/// base tier stays unknown.
pub fn parse_storage(text: &str) -> StorageBounds {
    let up_to = UP_TO_REGEX.captures(text).and_then(|caps| {
        let amount = caps[1].parse::<f64>().ok()?;
        let gb = if caps[2].eq_ignore_ascii_case("tb") { amount * 1000.0 } else { amount };
        Some((caps.get(0)?.range(), gb))
    });

    let listed = match &up_to {
        Some((range, _)) => format!("{} {}", &text[..range.start], &text[range.end..]),
        None => text.to_string(),
    };

    let gigabytes = GB_REGEX
        .captures_iter(&listed)
        .filter_map(|caps| caps[1].parse::<f64>().ok());
    let terabytes = TB_REGEX
        .captures_iter(&listed)
        .filter_map(|caps| caps[1].parse::<f64>().ok())
        .map(|tb| tb * 1000.0);
    let capacities: Vec<f64> = gigabytes.chain(terabytes).collect();

    let base_gb = capacities.iter().copied().reduce(f64::min);
    let top_gb = capacities
        .iter()
        .copied()
        .chain(up_to.map(|(_, gb)| gb))
        .reduce(f64::max);

    StorageBounds {
        base_gb,
        top_tb: top_gb.map(|gb| gb / 1000.0),
    }
}

/// Storage from running page text, where memory amounts ("16GB unified memory") sit next to
/// the storage options and must not count as capacities.
pub fn parse_storage_text(text: &str) -> StorageBounds {
    parse_storage(&RAM_TEXT_REGEX.replace_all(text, " "))
}

/// First diagonal size: `11"`, `13”`, `8.3″`, `11-inch`, `24 in`.
pub fn parse_display_inches(text: &str) -> Option<f64> {
    INCH_REGEX.captures_iter(text).find_map(|caps| {
        let inches = caps[1].parse::<f64>().ok()?;
        let bare = caps[2].eq_ignore_ascii_case("in");
        (!bare || inches >= MIN_BARE_INCHES).then_some(inches)
    })
}

/// Port category, not the full port list.
pub fn parse_ports(text: &str) -> Option<String> {
    if HIGH_SPEED_PORT_REGEX.is_match(text) {
        Some(PORTS_HIGH_SPEED.to_string())
    } else if USB_C_REGEX.is_match(text) {
        Some(PORTS_USB_C.to_string())
    } else {
        None
    }
}

/// Only the high-speed category; used where the cell describes something other than ports.
pub fn parse_high_speed_ports(text: &str) -> Option<String> {
    HIGH_SPEED_PORT_REGEX
        .is_match(text)
        .then(|| PORTS_HIGH_SPEED.to_string())
}

/// Smallest GB amount in a memory cell ("16GB, 24GB or 32GB").
pub fn parse_ram_cell(text: &str) -> Option<f64> {
    RAM_CELL_REGEX
        .captures_iter(text)
        .filter_map(|caps| caps[1].parse::<f64>().ok())
        .reduce(f64::min)
}

/// Memory mentioned in running text ("8GB unified memory", "16 GB of RAM").
pub fn parse_ram_text(text: &str) -> Option<f64> {
    RAM_TEXT_REGEX
        .captures(text)
        .and_then(|caps| caps[1].parse::<f64>().ok())
}
