// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Scalar conversion table used by [`TypedValue::cast`](super::TypedValue::cast).
//!
//! | from \ to       | integer                 | float        | bool        | string    |
//! |-----------------|-------------------------|--------------|-------------|-----------|
//! | integer / enum  | two's-complement wrap   | nearest      | `!= 0`      | `Display` |
//! | float           | truncate, saturate, NaN→0 | nearest    | `!= 0.0`    | `Display` |
//! | bool            | 1 / 0                   | 1.0 / 0.0    | identity    | "true"/"false" |
//! | string          | parsed, else 0          | parsed, else 0 | see [`parse_bool`] | identity |
//!
//! Strings are trimmed before parsing. Integer text may be decimal or `0x` hex;
//! text that only parses as a float is converted with the float rules.

/// Numeric interpretation of a text value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum ParsedNumber {
    Signed(i64),
    Unsigned(u64),
    Float(f64),
}

pub(crate) fn parse_number(text: &str) -> Option<ParsedNumber> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        let magnitude = u64::from_str_radix(hex, 16).ok()?;
        return Some(if negative {
            ParsedNumber::Signed((magnitude as i64).wrapping_neg())
        } else {
            ParsedNumber::Unsigned(magnitude)
        });
    }

    if let Ok(v) = text.parse::<i64>() {
        return Some(ParsedNumber::Signed(v));
    }
    if let Ok(v) = text.parse::<u64>() {
        return Some(ParsedNumber::Unsigned(v));
    }
    text.parse::<f64>().ok().map(ParsedNumber::Float)
}

pub(crate) fn parse_bool(text: &str) -> bool {
    let lowered = text.trim().to_ascii_lowercase();
    match lowered.as_str() {
        "true" | "yes" | "on" => true,
        "false" | "no" | "off" | "" => false,
        _ => match parse_number(&lowered) {
            Some(ParsedNumber::Signed(v)) => v != 0,
            Some(ParsedNumber::Unsigned(v)) => v != 0,
            Some(ParsedNumber::Float(v)) => v != 0.0,
            None => false,
        },
    }
}

/// Per-target conversion rules. Every source family maps to a value; none fail.
pub(crate) trait ConvertFrom: Sized {
    fn from_i64(v: i64) -> Self;
    fn from_u64(v: u64) -> Self;
    fn from_f64(v: f64) -> Self;
    fn from_bool(v: bool) -> Self;
    fn from_text(text: &str) -> Self;
}

macro_rules! numeric_convert {
    ($($t:ty),* $(,)?) => {
        $(
            impl ConvertFrom for $t {
                #[inline]
                fn from_i64(v: i64) -> Self {
                    v as $t
                }

                #[inline]
                fn from_u64(v: u64) -> Self {
                    v as $t
                }

                #[inline]
                fn from_f64(v: f64) -> Self {
                    v as $t
                }

                #[inline]
                fn from_bool(v: bool) -> Self {
                    if v { 1 as $t } else { 0 as $t }
                }

                fn from_text(text: &str) -> Self {
                    match parse_number(text) {
                        Some(ParsedNumber::Signed(v)) => v as $t,
                        Some(ParsedNumber::Unsigned(v)) => v as $t,
                        Some(ParsedNumber::Float(v)) => v as $t,
                        None => {
                            tracing::trace!("unparseable numeric text {:?}, using 0", text);
                            0 as $t
                        }
                    }
                }
            }
        )*
    };
}

numeric_convert!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

impl ConvertFrom for bool {
    fn from_i64(v: i64) -> Self {
        v != 0
    }

    fn from_u64(v: u64) -> Self {
        v != 0
    }

    fn from_f64(v: f64) -> Self {
        v != 0.0
    }

    fn from_bool(v: bool) -> Self {
        v
    }

    fn from_text(text: &str) -> Self {
        parse_bool(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number_forms() {
        assert_eq!(parse_number(" 42 "), Some(ParsedNumber::Signed(42)));
        assert_eq!(parse_number("-7"), Some(ParsedNumber::Signed(-7)));
        assert_eq!(parse_number("0x1F"), Some(ParsedNumber::Unsigned(31)));
        assert_eq!(parse_number("-0x10"), Some(ParsedNumber::Signed(-16)));
        assert_eq!(
            parse_number("18446744073709551615"),
            Some(ParsedNumber::Unsigned(u64::MAX))
        );
        assert_eq!(parse_number("2.5"), Some(ParsedNumber::Float(2.5)));
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number("   "), None);
    }

    #[test]
    fn test_integer_narrowing_wraps() {
        assert_eq!(<u8 as ConvertFrom>::from_i64(300), 44);
        assert_eq!(<i8 as ConvertFrom>::from_i64(-129), 127);
        assert_eq!(<u16 as ConvertFrom>::from_i64(-1), u16::MAX);
    }

    #[test]
    fn test_float_to_integer_truncates_and_saturates() {
        assert_eq!(<i32 as ConvertFrom>::from_f64(2.9), 2);
        assert_eq!(<i32 as ConvertFrom>::from_f64(-2.9), -2);
        assert_eq!(<u8 as ConvertFrom>::from_f64(1e9), u8::MAX);
        assert_eq!(<i16 as ConvertFrom>::from_f64(f64::NAN), 0);
    }

    #[test]
    fn test_text_to_integer_falls_back_to_float_then_zero() {
        assert_eq!(<i32 as ConvertFrom>::from_text("12.75"), 12);
        assert_eq!(<i32 as ConvertFrom>::from_text("not a number"), 0);
        assert_eq!(<f64 as ConvertFrom>::from_text("nope"), 0.0);
    }

    #[test]
    fn test_parse_bool_table() {
        assert!(parse_bool("TRUE"));
        assert!(parse_bool(" on "));
        assert!(parse_bool("1"));
        assert!(parse_bool("-3.5"));
        assert!(!parse_bool("off"));
        assert!(!parse_bool("0"));
        assert!(!parse_bool(""));
        assert!(!parse_bool("maybe"));
    }
}
