//! Checked numeric conversions between pixel dimensions and indices

use crate::{Error, Result};

/// Safely convert usize to i32 with overflow checking
///
/// # Errors
///
/// Returns an error if the value exceeds i32::MAX
pub fn usize_to_i32(value: usize) -> Result<i32> {
    value
        .try_into()
        .map_err(|_| Error::InvalidInput(format!("Value {value} too large to fit in i32")))
}

/// Safely convert u32 to i32 with overflow checking
///
/// # Errors
///
/// Returns an error if the value exceeds i32::MAX
pub fn u32_to_i32(value: u32) -> Result<i32> {
    value
        .try_into()
        .map_err(|_| Error::InvalidInput(format!("Value {value} too large to fit in i32")))
}

/// Convert a non-negative i32 (rect size or coordinate) to u32
///
/// # Errors
///
/// Returns an error if the value is negative
pub fn i32_to_u32(value: i32) -> Result<u32> {
    value
        .try_into()
        .map_err(|_| Error::InvalidInput(format!("Value {value} is negative")))
}

/// Saturating conversion of an intensity to an 8-bit pixel, rounding ties to even
#[must_use]
#[allow(clippy::cast_possible_truncation)] // Clamped to 0..=255 before the cast
#[allow(clippy::cast_sign_loss)]
pub fn f64_to_u8_saturate(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.round_ties_even().clamp(0.0, 255.0) as u8
}

/// Same as [`f64_to_u8_saturate`] for single precision
#[must_use]
pub fn f32_to_u8_saturate(value: f32) -> u8 {
    f64_to_u8_saturate(f64::from(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_usize_to_i32() {
        assert_eq!(usize_to_i32(42).unwrap(), 42);
        assert_eq!(usize_to_i32(0).unwrap(), 0);
        assert_eq!(usize_to_i32(i32::MAX as usize).unwrap(), i32::MAX);

        // On 64-bit systems, this should fail
        if std::mem::size_of::<usize>() > 4 {
            assert!(usize_to_i32(i32::MAX as usize + 1).is_err());
        }
    }

    #[test]
    fn test_u32_to_i32() {
        assert_eq!(u32_to_i32(70).unwrap(), 70);
        assert!(u32_to_i32(u32::MAX).is_err());
    }

    #[test]
    fn test_i32_to_u32() {
        assert_eq!(i32_to_u32(320).unwrap(), 320);
        assert!(i32_to_u32(-1).is_err());
    }

    #[test]
    fn test_saturate_rounds_half_to_even() {
        assert_eq!(f64_to_u8_saturate(127.5), 128);
        assert_eq!(f64_to_u8_saturate(126.5), 126);
        assert_eq!(f64_to_u8_saturate(-3.0), 0);
        assert_eq!(f64_to_u8_saturate(300.0), 255);
        assert_eq!(f64_to_u8_saturate(f64::NAN), 0);
        assert_eq!(f32_to_u8_saturate(254.6), 255);
    }

    proptest! {
        #[test]
        fn prop_saturate_within_range(value in any::<f64>()) {
            let out = f64_to_u8_saturate(value);
            if value.is_finite() && (0.0..=255.0).contains(&value) {
                prop_assert!((f64::from(out) - value).abs() <= 0.5);
            }
        }

        #[test]
        fn prop_u32_to_i32_within_bounds(value in 0..=i32::MAX as u32) {
            let result = u32_to_i32(value);
            prop_assert!(result.is_ok());
            prop_assert_eq!(result.unwrap() as u32, value);
        }
    }
}
