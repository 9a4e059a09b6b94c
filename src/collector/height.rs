//! Block height value and its permissive string parser.
//!
//! Upstreams report heights either as `0x`-prefixed hex quantities
//! (JSON-RPC) or plain decimal strings (explorer APIs). Parsing detects
//! the base from the prefix the same way integer literals do.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors returned when a string is not a valid block height.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseHeightError {
    #[error("empty block height")]
    Empty,
    #[error("invalid block height syntax: {0:?}")]
    Syntax(String),
    #[error("block height out of range: {0:?}")]
    Range(String),
}

/// Number of the most recent block known to an upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct BlockHeight(pub u64);

impl BlockHeight {
    /// Returns the raw block number.
    pub fn get(self) -> u64 {
        self.0
    }

    /// Returns the height as a gauge value.
    ///
    /// Heights above 2^53 lose precision, which is inherent to the
    /// exposition format.
    pub fn as_f64(self) -> f64 {
        self.0 as f64
    }
}

impl From<u64> for BlockHeight {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for BlockHeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::LowerHex for BlockHeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl FromStr for BlockHeight {
    type Err = ParseHeightError;

    /// Parses a height with base auto-detection.
    ///
    /// - `0x`/`0X` selects base 16, `0o`/`0O` base 8, `0b`/`0B` base 2
    /// - a leading `0` followed by more digits selects base 8
    /// - anything else is base 10
    ///
    /// Underscores may separate digits. Signs and whitespace are rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ParseHeightError::Empty);
        }

        let syntax = || ParseHeightError::Syntax(s.to_string());
        let bytes = s.as_bytes();

        let (radix, digits) = if bytes[0] == b'0' && bytes.len() >= 3 {
            match bytes[1].to_ascii_lowercase() {
                b'x' => (16, &s[2..]),
                b'o' => (8, &s[2..]),
                b'b' => (2, &s[2..]),
                _ => (8, &s[1..]),
            }
        } else if bytes[0] == b'0' {
            (8, &s[1..])
        } else {
            (10, s)
        };

        if !underscores_ok(s) {
            return Err(syntax());
        }

        let cleaned: String = digits.chars().filter(|&c| c != '_').collect();
        if cleaned.is_empty() {
            // A lone "0" is the only input whose digits vanish after the prefix.
            return if s == "0" { Ok(Self(0)) } else { Err(syntax()) };
        }
        if !cleaned.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(syntax());
        }

        u64::from_str_radix(&cleaned, radix)
            .map(Self)
            .map_err(|e| match e.kind() {
                std::num::IntErrorKind::PosOverflow => ParseHeightError::Range(s.to_string()),
                _ => syntax(),
            })
    }
}

/// Checks that every underscore sits between two digits, or between a
/// base prefix and a digit.
fn underscores_ok(s: &str) -> bool {
    #[derive(PartialEq)]
    enum Saw {
        Start,
        Digit,
        Underscore,
        Other,
    }

    let bytes = s.as_bytes();
    let mut saw = Saw::Start;
    let mut i = 0;
    let mut hex = false;

    if bytes.len() >= 2 && bytes[0] == b'0' {
        let marker = bytes[1].to_ascii_lowercase();
        if matches!(marker, b'b' | b'o' | b'x') {
            hex = marker == b'x';
            i = 2;
            saw = Saw::Digit;
        }
    }

    for &b in &bytes[i..] {
        if b.is_ascii_digit() || (hex && b.is_ascii_hexdigit()) {
            saw = Saw::Digit;
            continue;
        }
        if b == b'_' {
            if saw != Saw::Digit {
                return false;
            }
            saw = Saw::Underscore;
            continue;
        }
        if saw == Saw::Underscore {
            return false;
        }
        saw = Saw::Other;
    }

    saw != Saw::Underscore
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn parse(s: &str) -> Result<u64, ParseHeightError> {
        s.parse::<BlockHeight>().map(BlockHeight::get)
    }

    #[test]
    fn test_parse_hex_quantity() {
        assert_eq!(parse("0x10d4f"), Ok(68943));
        assert_eq!(parse("0X10D4F"), Ok(68943));
        assert_eq!(parse("0xffffffffffffffff"), Ok(u64::MAX));
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse("123456"), Ok(123456));
        assert_eq!(parse("18446744073709551615"), Ok(u64::MAX));
    }

    #[test]
    fn test_parse_other_bases() {
        assert_eq!(parse("0"), Ok(0));
        assert_eq!(parse("017"), Ok(15));
        assert_eq!(parse("0o17"), Ok(15));
        assert_eq!(parse("0b101"), Ok(5));
        assert_eq!(parse("1_000_000"), Ok(1_000_000));
        assert_eq!(parse("0x_ff"), Ok(255));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse(""), Err(ParseHeightError::Empty));
        assert!(matches!(parse("0x"), Err(ParseHeightError::Syntax(_))));
        assert!(matches!(parse("abc"), Err(ParseHeightError::Syntax(_))));
        assert!(matches!(parse("-1"), Err(ParseHeightError::Syntax(_))));
        assert!(matches!(parse("+1"), Err(ParseHeightError::Syntax(_))));
        assert!(matches!(parse(" 1"), Err(ParseHeightError::Syntax(_))));
        assert!(matches!(parse("08"), Err(ParseHeightError::Syntax(_))));
        assert!(matches!(parse("1__0"), Err(ParseHeightError::Syntax(_))));
        assert!(matches!(parse("_1"), Err(ParseHeightError::Syntax(_))));
        assert!(matches!(parse("1_"), Err(ParseHeightError::Syntax(_))));
        assert!(matches!(
            parse("Invalid API Key"),
            Err(ParseHeightError::Syntax(_))
        ));
    }

    #[test]
    fn test_parse_overflow() {
        assert_eq!(
            parse("18446744073709551616"),
            Err(ParseHeightError::Range("18446744073709551616".to_string()))
        );
        assert!(matches!(
            parse("0x10000000000000000"),
            Err(ParseHeightError::Range(_))
        ));
    }

    #[test]
    fn test_display_formats() {
        let height = BlockHeight(68943);
        assert_eq!(height.to_string(), "68943");
        assert_eq!(format!("{:#x}", height), "0x10d4f");
        assert_eq!(height.as_f64(), 68943.0);
    }

    proptest! {
        #[test]
        fn decimal_round_trip(n in any::<u64>()) {
            let formatted = BlockHeight(n).to_string();
            prop_assert_eq!(formatted.parse::<BlockHeight>(), Ok(BlockHeight(n)));
        }

        #[test]
        fn hex_round_trip(n in any::<u64>()) {
            let formatted = format!("{:#x}", BlockHeight(n));
            prop_assert_eq!(formatted.parse::<BlockHeight>(), Ok(BlockHeight(n)));
        }
    }
}
