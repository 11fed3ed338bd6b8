//! Repair of coordinates whose decimal point was lost in the source export.
//!
//! The export writes `39.947334` as `39947334`. Values in the region always
//! have a two-digit integer part, so the separator goes back after the
//! second digit. Values outside the 10..99 degree range are misread by this
//! rule.

use crate::utils::error::{EtlError, Result};

const INTEGER_DIGITS: usize = 2;

/// Repairs one coordinate value.
///
/// Returns `Ok(None)` for a missing or blank value. Every `.` is removed,
/// then a single separator is inserted after the first two characters when
/// more than two remain.
pub fn normalize(raw: Option<&str>) -> Result<Option<f64>> {
    let raw = match raw.map(str::trim) {
        None | Some("") => return Ok(None),
        Some(value) => value,
    };

    let digits: String = raw.chars().filter(|c| *c != '.').collect();

    let repaired = match digits.char_indices().nth(INTEGER_DIGITS) {
        Some((split, _)) => format!("{}.{}", &digits[..split], &digits[split..]),
        None => digits,
    };

    let value = repaired.parse::<f64>().map_err(|e| EtlError::ParseError {
        value: raw.to_string(),
        reason: format!("'{}' is not a number: {}", repaired, e),
    })?;

    if !value.is_finite() {
        return Err(EtlError::ParseError {
            value: raw.to_string(),
            reason: format!("'{}' is out of range", repaired),
        });
    }

    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_value_is_none() {
        assert_eq!(normalize(None).unwrap(), None);
        assert_eq!(normalize(Some("")).unwrap(), None);
        assert_eq!(normalize(Some("   ")).unwrap(), None);
    }

    #[test]
    fn test_restores_dropped_separator() {
        assert_eq!(normalize(Some("39947334")).unwrap(), Some(39.947334));
        assert_eq!(normalize(Some("37876543")).unwrap(), Some(37.876543));
        assert_eq!(normalize(Some("32493322")).unwrap(), Some(32.493322));
    }

    #[test]
    fn test_reconstructs_original_value() {
        for original in ["39.947334", "32.5", "37.0001", "10.123456789", "99.9"] {
            let damaged = original.replace('.', "");
            let expected: f64 = original.parse().unwrap();
            assert_eq!(normalize(Some(&damaged)).unwrap(), Some(expected), "{}", original);
        }
    }

    #[test]
    fn test_already_valid_value_is_kept() {
        assert_eq!(normalize(Some("37.876543")).unwrap(), Some(37.876543));
    }

    #[test]
    fn test_every_separator_is_removed() {
        assert_eq!(normalize(Some("1.2.3")).unwrap(), Some(12.3));
        assert_eq!(normalize(Some("3.7.876.543")).unwrap(), Some(37.876543));
    }

    #[test]
    fn test_length_boundaries() {
        assert_eq!(normalize(Some("12345")).unwrap(), Some(12.345));
        assert_eq!(normalize(Some("123")).unwrap(), Some(12.3));
        assert_eq!(normalize(Some("37")).unwrap(), Some(37.0));
        assert_eq!(normalize(Some("5")).unwrap(), Some(5.0));
    }

    #[test]
    fn test_surrounding_whitespace_is_ignored() {
        assert_eq!(normalize(Some(" 39947334 ")).unwrap(), Some(39.947334));
    }

    #[test]
    fn test_non_numeric_input_fails() {
        let err = normalize(Some("ab123")).unwrap_err();
        match err {
            EtlError::ParseError { value, .. } => assert_eq!(value, "ab123"),
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(normalize(Some("x")).is_err());
        assert!(normalize(Some("nan")).is_err());
    }

    #[test]
    fn test_overflowing_exponent_fails() {
        let err = normalize(Some("99e999")).unwrap_err();
        match err {
            EtlError::ParseError { value, reason } => {
                assert_eq!(value, "99e999");
                assert!(reason.contains("out of range"), "{}", reason);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(normalize(Some("-99e999")).is_err());
    }

    #[test]
    fn test_multibyte_input_does_not_panic() {
        assert!(normalize(Some("3ç947")).is_err());
        assert!(normalize(Some("çç")).is_err());
    }
}
