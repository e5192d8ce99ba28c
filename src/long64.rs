//! A 64-bit integer represented as two 32-bit halves, plus the `LongType`
//! surface a reflective field descriptor chooses to expose it as.
//!
//! Rust has native 64-bit integers, so `Long64` is not load-bearing the way
//! it would be on a host without them — but the varint wire format is
//! specified in terms of `(lo, hi)` halves (see [`crate::varint`]), and
//! `Long64` is the type that owns converting those halves to and from the
//! decimal-string / float / native-integer surfaces a caller asks for.

use core::fmt;

use crate::error::{ReadError, WriteError};

/// Whether a 64-bit integer field is signed or unsigned for the purpose of
/// decimal-string and float conversions. Wire representation (varint halves)
/// is identical either way; only `to_string`/`to_number`/`from` care.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Signedness {
    Signed,
    Unsigned,
}

/// A 64-bit integer as `(lo, hi)` 32-bit halves, with a signed/unsigned
/// interpretation fixed at construction.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Long64 {
    lo: u32,
    hi: u32,
    sign: Signedness,
}

impl fmt::Debug for Long64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Long64")
            .field("value", &self.to_decimal_string())
            .field("sign", &self.sign)
            .finish()
    }
}

impl Long64 {
    /// Builds a `Long64` directly from its wire halves.
    pub const fn from_halves(lo: u32, hi: u32, sign: Signedness) -> Self {
        Long64 { lo, hi, sign }
    }

    /// The `(lo, hi)` halves as emitted/consumed by [`crate::varint`].
    pub const fn halves(&self) -> (u32, u32) {
        (self.lo, self.hi)
    }

    pub const fn signedness(&self) -> Signedness {
        self.sign
    }

    /// Native signed 64-bit accessor ("big integer" surface). Always exact.
    pub const fn to_i64(&self) -> i64 {
        (((self.hi as u64) << 32) | self.lo as u64) as i64
    }

    /// Native unsigned 64-bit accessor ("big integer" surface). Always exact.
    pub const fn to_u64(&self) -> u64 {
        ((self.hi as u64) << 32) | self.lo as u64
    }

    pub fn from_i64(value: i64) -> Self {
        Long64::from_halves(value as u32, (value as u64 >> 32) as u32, Signedness::Signed)
    }

    pub fn from_u64(value: u64) -> Self {
        Long64::from_halves(value as u32, (value >> 32) as u32, Signedness::Unsigned)
    }

    /// Decimal representation, two's-complement interpreted when signed.
    pub fn to_decimal_string(&self) -> String {
        match self.sign {
            Signedness::Signed => self.to_i64().to_string(),
            Signedness::Unsigned => self.to_u64().to_string(),
        }
    }

    /// A host `f64`. Magnitudes above 2^53 lose precision silently — that is
    /// the caller's responsibility, matching the distilled spec's permissive
    /// behavior (see SPEC_FULL.md Design Notes).
    pub fn to_f64(&self) -> f64 {
        match self.sign {
            Signedness::Signed => self.to_i64() as f64,
            Signedness::Unsigned => self.to_u64() as f64,
        }
    }

    /// Parses a decimal string (optionally `-`-prefixed for signed) into a
    /// `Long64`. Fails with [`WriteError::InvalidLongValue`] if the string is
    /// not a valid decimal for the target signedness or overflows 64 bits.
    pub fn from_decimal_str(s: &str, sign: Signedness) -> Result<Self, WriteError> {
        match sign {
            Signedness::Signed => {
                let value: i64 = s.parse().map_err(|_| WriteError::InvalidLongValue {
                    reason: "not a valid signed 64-bit decimal string",
                })?;
                Ok(Long64::from_i64(value))
            }
            Signedness::Unsigned => {
                let value: u64 = s.parse().map_err(|_| WriteError::InvalidLongValue {
                    reason: "not a valid unsigned 64-bit decimal string",
                })?;
                Ok(Long64::from_u64(value))
            }
        }
    }

    /// Builds a `Long64` from a host float. Fails if the value is not
    /// finite, not integral, or falls outside the target signedness's range.
    pub fn from_f64(value: f64, sign: Signedness) -> Result<Self, WriteError> {
        if !value.is_finite() || value.fract() != 0.0 {
            return Err(WriteError::InvalidLongValue {
                reason: "not a finite integer value",
            });
        }
        match sign {
            Signedness::Signed => {
                if value < i64::MIN as f64 || value > i64::MAX as f64 {
                    return Err(WriteError::InvalidLongValue {
                        reason: "out of signed 64-bit range",
                    });
                }
                Ok(Long64::from_i64(value as i64))
            }
            Signedness::Unsigned => {
                if value < 0.0 || value > u64::MAX as f64 {
                    return Err(WriteError::InvalidLongValue {
                        reason: "out of unsigned 64-bit range",
                    });
                }
                Ok(Long64::from_u64(value as u64))
            }
        }
    }

    /// Decodes from the wire varint halves as read by the reflection reader,
    /// applying zigzag un-transformation first when `zigzag` is set (for
    /// `sint64` fields).
    pub fn from_wire(lo: u32, hi: u32, sign: Signedness, zigzag: bool) -> Result<Self, ReadError> {
        let (lo, hi) = if zigzag {
            crate::varint::zigzag_decode64(lo, hi)
        } else {
            (lo, hi)
        };
        Ok(Long64::from_halves(lo, hi, sign))
    }
}

/// The caller-facing surface a reflective field descriptor chooses for
/// 64-bit integer scalars.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LongType {
    /// Decimal string, safe for any magnitude.
    String,
    /// Host `f64`; caller accepts precision loss above 2^53.
    Number,
    /// Native `i64`/`u64`, exact (Rust always has this available).
    BigInt,
}

/// The decoded, caller-facing representation of a 64-bit integer scalar, per
/// the field's configured [`LongType`].
#[derive(Clone, Debug, PartialEq)]
pub enum LongValue {
    String(String),
    Number(f64),
    Signed(i64),
    Unsigned(u64),
}

/// Converts a wire-decoded `Long64` to the surface representation its field
/// descriptor requested.
pub fn reflection_long_convert(long: Long64, kind: LongType) -> LongValue {
    match kind {
        LongType::String => LongValue::String(long.to_decimal_string()),
        LongType::Number => LongValue::Number(long.to_f64()),
        LongType::BigInt => match long.signedness() {
            Signedness::Signed => LongValue::Signed(long.to_i64()),
            Signedness::Unsigned => LongValue::Unsigned(long.to_u64()),
        },
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn signed_string_round_trip(value: i64) {
            let long = Long64::from_i64(value);
            let s = long.to_decimal_string();
            let parsed = Long64::from_decimal_str(&s, Signedness::Signed).unwrap();
            prop_assert_eq!(parsed.to_i64(), value);
        }

        #[test]
        fn unsigned_string_round_trip(value: u64) {
            let long = Long64::from_u64(value);
            let s = long.to_decimal_string();
            let parsed = Long64::from_decimal_str(&s, Signedness::Unsigned).unwrap();
            prop_assert_eq!(parsed.to_u64(), value);
        }
    }

    #[test]
    fn boundary_values_round_trip() {
        let boundaries: &[i64] = &[
            0,
            1,
            -1,
            i32::MIN as i64,
            i32::MAX as i64,
            (1i64 << 53),
            -(1i64 << 53),
            i64::MAX,
            i64::MIN,
        ];
        for &value in boundaries {
            let long = Long64::from_i64(value);
            let s = long.to_decimal_string();
            let parsed = Long64::from_decimal_str(&s, Signedness::Signed).unwrap();
            assert_eq!(parsed.to_i64(), value);
        }
    }

    #[test]
    fn invalid_decimal_string_is_rejected() {
        assert!(Long64::from_decimal_str("not-a-number", Signedness::Signed).is_err());
        assert!(Long64::from_decimal_str("-1", Signedness::Unsigned).is_err());
    }

    #[test]
    fn from_f64_rejects_non_integer_and_non_finite() {
        assert!(Long64::from_f64(1.5, Signedness::Signed).is_err());
        assert!(Long64::from_f64(f64::NAN, Signedness::Signed).is_err());
        assert!(Long64::from_f64(f64::INFINITY, Signedness::Signed).is_err());
    }
}
