// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Splits the low bits of a timestamp's nanoseconds into its user tag.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::core::error::{FieldLinkError, Result};
use crate::core::meta::TimeStamp;

/// Moves the low `bits` of `nanoseconds` into `user_tag`, both unshifted.
///
/// `bits == 0` leaves the timestamp untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct TimeTagTransform {
    bits: u8,
}

impl TimeTagTransform {
    pub const MAX_BITS: u8 = 32;

    pub fn new(bits: u8) -> Result<Self> {
        if bits > Self::MAX_BITS {
            return Err(FieldLinkError::Configuration(format!(
                "timestamp tag width {} out of range 0..={}",
                bits,
                Self::MAX_BITS
            )));
        }
        Ok(Self { bits })
    }

    pub fn bits(&self) -> u8 {
        self.bits
    }

    pub fn is_noop(&self) -> bool {
        self.bits == 0
    }

    fn mask(&self) -> u32 {
        match self.bits {
            0 => 0,
            32 => u32::MAX,
            n => (1u32 << n) - 1,
        }
    }

    pub fn apply(&self, time: &mut TimeStamp) {
        if self.is_noop() {
            return;
        }
        let mask = self.mask();
        time.user_tag = time.nanoseconds & mask;
        time.nanoseconds &= !mask;
    }

    pub fn applied(&self, mut time: TimeStamp) -> TimeStamp {
        self.apply(&mut time);
        time
    }
}

impl TryFrom<u8> for TimeTagTransform {
    type Error = FieldLinkError;

    fn try_from(bits: u8) -> Result<Self> {
        Self::new(bits)
    }
}

impl From<TimeTagTransform> for u8 {
    fn from(transform: TimeTagTransform) -> Self {
        transform.bits
    }
}

/// Parses the `nsec:lsb:<bits>` form.
impl FromStr for TimeTagTransform {
    type Err = FieldLinkError;

    fn from_str(s: &str) -> Result<Self> {
        let bits = s
            .trim()
            .strip_prefix("nsec:lsb:")
            .ok_or_else(|| {
                FieldLinkError::Configuration(format!(
                    "unknown timestamp tag spec '{}', expected nsec:lsb:<bits>",
                    s
                ))
            })?
            .parse::<u8>()
            .map_err(|e| {
                FieldLinkError::Configuration(format!("invalid timestamp tag width in '{}': {}", s, e))
            })?;
        Self::new(bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_twenty_bits() {
        let transform = TimeTagTransform::new(20).unwrap();
        let time = transform.applied(TimeStamp::new(100, 0x1234_5678));
        assert_eq!(time.user_tag, 0x45678);
        assert_eq!(time.nanoseconds, 0x1230_0000);
        assert_eq!(time.seconds_past_epoch, 100);
    }

    #[test]
    fn test_zero_bits_is_noop() {
        let mut time = TimeStamp::new(1, 0x1234_5678);
        time.user_tag = 9;
        let transform = TimeTagTransform::new(0).unwrap();
        assert_eq!(transform.applied(time), time);
    }

    #[test]
    fn test_full_width_moves_everything() {
        let transform = TimeTagTransform::new(32).unwrap();
        let time = transform.applied(TimeStamp::new(0, 0xDEAD_BEEF));
        assert_eq!(time.user_tag, 0xDEAD_BEEF);
        assert_eq!(time.nanoseconds, 0);
    }

    #[test]
    fn test_out_of_range_is_configuration_error() {
        assert!(matches!(
            TimeTagTransform::new(33),
            Err(FieldLinkError::Configuration(_))
        ));
    }

    #[test]
    fn test_parse_tag_spec() {
        let transform: TimeTagTransform = "nsec:lsb:16".parse().unwrap();
        assert_eq!(transform.bits(), 16);
        assert!("nsec:lsb:40".parse::<TimeTagTransform>().is_err());
        assert!("usec:lsb:4".parse::<TimeTagTransform>().is_err());
        assert!("nsec:lsb:x".parse::<TimeTagTransform>().is_err());
    }

    #[test]
    fn test_deserialize_validates_width() {
        let ok: TimeTagTransform = serde_json::from_str("12").unwrap();
        assert_eq!(ok.bits(), 12);
        assert!(serde_json::from_str::<TimeTagTransform>("64").is_err());
    }
}
