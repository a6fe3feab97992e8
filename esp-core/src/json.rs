//! Extraktion der Messwerte aus der Sensor-Antwort
//!
//! Kein JSON-Parser: es wird nur nach den beiden Feldnamen gesucht, dann nach
//! dem ersten `:` dahinter und einer Gleitkommazahl direkt danach. Reihenfolge
//! und umgebende Struktur sind egal, Groß-/Kleinschreibung nicht.

use crate::types::SensorReading;

/// Feldname der Temperatur in der Sensor-Antwort
pub const TEMPERATURE_FIELD: &str = "temperatura";

/// Feldname der Luftfeuchtigkeit in der Sensor-Antwort
pub const HUMIDITY_FIELD: &str = "umidade";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Kein `{` in der Antwort
    NoObject,
    /// Feldname nicht gefunden
    MissingField(&'static str),
    /// Kein `:` nach dem Feldnamen
    MissingColon(&'static str),
    /// Hinter dem `:` steht keine gültige Zahl
    InvalidNumber(&'static str),
}

/// Liest beide Messwerte; entweder beide oder keiner
pub fn parse_reading(body: &[u8]) -> Result<SensorReading, ParseError> {
    let start = body
        .iter()
        .position(|b| *b == b'{')
        .ok_or(ParseError::NoObject)?;
    let object = &body[start..];

    let temperature = number_field(object, TEMPERATURE_FIELD)?;
    let humidity = number_field(object, HUMIDITY_FIELD)?;

    Ok(SensorReading {
        temperature,
        humidity,
    })
}

fn number_field(object: &[u8], name: &'static str) -> Result<f32, ParseError> {
    let name_at = find(object, name.as_bytes()).ok_or(ParseError::MissingField(name))?;
    let after_name = &object[name_at + name.len()..];

    let colon_at = after_name
        .iter()
        .position(|b| *b == b':')
        .ok_or(ParseError::MissingColon(name))?;

    parse_number(&after_name[colon_at + 1..]).ok_or(ParseError::InvalidNumber(name))
}

/// Parst das längste Zahl-Präfix nach optionalem Whitespace
fn parse_number(input: &[u8]) -> Option<f32> {
    let skip = input
        .iter()
        .take_while(|b| b.is_ascii_whitespace())
        .count();
    let rest = &input[skip..];

    let len = rest
        .iter()
        .take_while(|b| matches!(b, b'0'..=b'9' | b'+' | b'-' | b'.' | b'e' | b'E'))
        .count();
    if len == 0 {
        return None;
    }

    core::str::from_utf8(&rest[..len]).ok()?.parse::<f32>().ok()
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}
