use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;

use crate::error::{Error, Result};

fn flight_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Two-letter IATA airline code plus 1-4 digits, optional space: "AA123", "AA 123".
    RE.get_or_init(|| Regex::new(r"^[A-Z]{2}\s?\d{1,4}$").unwrap())
}

fn airport_code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Z]{3}$").unwrap())
}

pub fn flight_number(value: &str) -> Result<()> {
    if flight_number_re().is_match(value) {
        Ok(())
    } else {
        Err(Error::Validation(format!("invalid flight number: {value}")))
    }
}

pub fn airport_code(value: &str) -> Result<()> {
    if airport_code_re().is_match(value) {
        Ok(())
    } else {
        Err(Error::Validation(format!("invalid airport code: {value}")))
    }
}

pub fn departure_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| Error::Validation(format!("invalid date (expected YYYY-MM-DD): {value}")))
}

pub fn coordinates(latitude: f64, longitude: f64) -> Result<()> {
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(Error::Validation(format!("latitude out of range: {latitude}")));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(Error::Validation(format!(
            "longitude out of range: {longitude}"
        )));
    }
    Ok(())
}
