//! Centralized validation and helper functions.

/// Maximum number of objects allowed in one collection of one event
pub const MAX_OBJECTS_PER_COLLECTION: usize = 10_000;

/// Largest matching radius accepted; any larger value matches everything in the detector
pub const MAX_MATCHING_RADIUS: f64 = 10.0;

/// Interpret a branch value as an object count.
///
/// Counts are stored as floating point in the event record, so the value must
/// be finite, non-negative and integral.
///
/// # Examples
///
/// ```
/// use tau_matcher::utils::validation::as_count;
///
/// assert_eq!(as_count(3.0), Some(3));
/// assert_eq!(as_count(-1.0), None);
/// assert_eq!(as_count(2.5), None);
/// ```
#[must_use]
pub fn as_count(value: f64) -> Option<usize> {
    if !value.is_finite() || value < 0.0 || value.fract() != 0.0 {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // checked above
    let count = value as usize;
    Some(count)
}

/// Check whether a collection size is within the allowed maximum.
///
/// Returns an error message if the size exceeds the limit, None if acceptable.
#[must_use]
pub fn check_object_limit(count: usize) -> Option<String> {
    if count > MAX_OBJECTS_PER_COLLECTION {
        Some(format!(
            "Too many objects: {count} exceeds maximum of {MAX_OBJECTS_PER_COLLECTION}"
        ))
    } else {
        None
    }
}

/// A matching radius must be finite, non-negative and not absurdly large.
#[must_use]
pub fn is_valid_radius(radius: f64) -> bool {
    radius.is_finite() && (0.0..=MAX_MATCHING_RADIUS).contains(&radius)
}

/// Interpret a float branch value as an integer identifier (PDG id, status, flags)
#[must_use]
pub fn as_integer(value: f64) -> Option<i64> {
    if !value.is_finite() || value.fract() != 0.0 {
        return None;
    }
    #[allow(clippy::cast_possible_truncation)] // integral by construction
    let int = value as i64;
    Some(int)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_count() {
        assert_eq!(as_count(0.0), Some(0));
        assert_eq!(as_count(12.0), Some(12));
        assert_eq!(as_count(-0.5), None);
        assert_eq!(as_count(1.5), None);
        assert_eq!(as_count(f64::NAN), None);
        assert_eq!(as_count(f64::INFINITY), None);
    }

    #[test]
    fn test_check_object_limit() {
        assert!(check_object_limit(0).is_none());
        assert!(check_object_limit(MAX_OBJECTS_PER_COLLECTION).is_none());
        assert!(check_object_limit(MAX_OBJECTS_PER_COLLECTION + 1).is_some());
    }

    #[test]
    fn test_is_valid_radius() {
        assert!(is_valid_radius(0.0));
        assert!(is_valid_radius(0.3));
        assert!(!is_valid_radius(-0.1));
        assert!(!is_valid_radius(f64::NAN));
        assert!(!is_valid_radius(100.0));
    }

    #[test]
    fn test_as_integer() {
        assert_eq!(as_integer(-11.0), Some(-11));
        assert_eq!(as_integer(1.0), Some(1));
        assert_eq!(as_integer(0.5), None);
    }
}
