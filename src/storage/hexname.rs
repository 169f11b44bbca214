//! Hexname encoding for player names and clans
//!
//! Names and clans are free-form strings chosen by players. They can hold
//! spaces or be empty, so they are never written raw. Each byte becomes two
//! lowercase hex digits and the whole name is terminated by `00`:
//!
//! ```
//! use teerank::storage::hexname;
//!
//! assert_eq!(hexname::encode("nameless tee"), "6e616d656c6573732074656500");
//! assert_eq!(hexname::encode(""), "00");
//! assert_eq!(hexname::decode("74656500").unwrap(), "tee");
//! ```

use thiserror::Error;

/// Maximum length of a name or clan, in bytes
pub const MAX_NAME_LENGTH: usize = 16;

/// Errors returned when a hexname cannot be produced or read back
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HexNameError {
    #[error("Name longer than {max} bytes: {len}")]
    TooLong { len: usize, max: usize },

    #[error("Name contains a NUL byte")]
    EmbeddedNul,

    #[error("Not a valid hexname: {0}")]
    Malformed(String),

    #[error("Hexname does not decode to UTF-8: {0}")]
    NotUtf8(String),
}

/// Check a name fits the storable bounds
pub fn check(name: &str) -> Result<(), HexNameError> {
    if name.len() > MAX_NAME_LENGTH {
        return Err(HexNameError::TooLong {
            len: name.len(),
            max: MAX_NAME_LENGTH,
        });
    }
    if name.bytes().any(|b| b == 0) {
        return Err(HexNameError::EmbeddedNul);
    }
    Ok(())
}

/// Encode a name as a hexname
///
/// Bounds are not checked here; use [`check`] first for names that will be
/// persisted.
pub fn encode(name: &str) -> String {
    let mut hex = String::with_capacity(name.len() * 2 + 2);
    for byte in name.bytes() {
        hex.push_str(&format!("{byte:02x}"));
    }
    hex.push_str("00");
    hex
}

/// Decode a hexname back to the original name
pub fn decode(hex: &str) -> Result<String, HexNameError> {
    let bytes = decode_bytes(hex).ok_or_else(|| HexNameError::Malformed(hex.to_string()))?;
    if bytes.len() > MAX_NAME_LENGTH {
        return Err(HexNameError::TooLong {
            len: bytes.len(),
            max: MAX_NAME_LENGTH,
        });
    }
    String::from_utf8(bytes).map_err(|_| HexNameError::NotUtf8(hex.to_string()))
}

/// Cut a name down to something [`check`] accepts
///
/// NUL bytes are dropped and the name is truncated to [`MAX_NAME_LENGTH`]
/// bytes on a character boundary.
pub fn truncate(name: &str) -> String {
    let mut fitted = String::with_capacity(name.len().min(MAX_NAME_LENGTH));
    for ch in name.chars().filter(|&ch| ch != '\0') {
        if fitted.len() + ch.len_utf8() > MAX_NAME_LENGTH {
            break;
        }
        fitted.push(ch);
    }
    fitted
}

fn decode_bytes(hex: &str) -> Option<Vec<u8>> {
    let digits = hex.as_bytes();
    if digits.len() < 2 || digits.len() % 2 != 0 {
        return None;
    }

    let (body, terminator) = digits.split_at(digits.len() - 2);
    if terminator != b"00" {
        return None;
    }

    body.chunks(2)
        .map(|pair| {
            let high = hex_value(pair[0])?;
            let low = hex_value(pair[1])?;
            match (high << 4) | low {
                0 => None,
                byte => Some(byte),
            }
        })
        .collect()
}

fn hex_value(digit: u8) -> Option<u8> {
    match digit {
        b'0'..=b'9' => Some(digit - b'0'),
        b'a'..=b'f' => Some(digit - b'a' + 10),
        b'A'..=b'F' => Some(digit - b'A' + 10),
        _ => None,
    }
}
