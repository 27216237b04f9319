use crate::ArcStr;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use std::{fs, io, path::Path};

/// Dates in the DOH tables are all ISO 8601 calendar dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Converts a not found error to Ok(false)
pub fn path_exists(path: &Path) -> io::Result<bool> {
    match fs::metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if matches!(e.kind(), io::ErrorKind::NotFound) => Ok(false),
        Err(e) => Err(e),
    }
}

// Helpers for serde to parse fields with quirks.

/// Parse a string, mapping the empty string to `None`.
pub fn optional_string<'de, D>(d: D) -> Result<Option<ArcStr>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Deserialize::deserialize(d)?;
    Ok(s.filter(|s| !s.is_empty()).map(Into::into))
}

/// Parse a `yyyy-mm-dd` date, mapping the empty string to `None`.
pub fn opt_date<'de, D>(d: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let s: Option<String> = Deserialize::deserialize(d)?;
    match s.as_deref() {
        None | Some("") => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, DATE_FORMAT)
            .map(Some)
            .map_err(|e| Error::custom(format!("invalid date \"{}\": {}", s, e))),
    }
}

/// Parse a decimal coordinate, mapping the empty string to `None`.
pub fn opt_f64<'de, D>(d: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let s: Option<String> = Deserialize::deserialize(d)?;
    match s.as_deref() {
        None | Some("") => Ok(None),
        Some(s) => s
            .parse::<f64>()
            .map(Some)
            .map_err(|e| Error::custom(format!("invalid number \"{}\": {}", s, e))),
    }
}

/// Title-case a name: the first letter of every run of letters is upper case, the rest lower.
///
/// Apostrophes and hyphens break runs, so `STA. ROSA-DE LIMA` becomes `Sta. Rosa-De Lima`.
pub fn title_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_word = false;
    for ch in input.chars() {
        if ch.is_alphabetic() {
            if in_word {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(ch);
            in_word = false;
        }
    }
    out
}

/// Case-insensitive equality that also folds non-ASCII letters (`Ñ`/`ñ`).
pub fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b) || a.to_lowercase() == b.to_lowercase()
}

/// Print an underlined section heading.
pub fn header(header: &str) {
    let len = header.chars().count();
    print!("\n{}\n", header);
    for _ in 0..len {
        print!("=");
    }
    println!("\n")
}
