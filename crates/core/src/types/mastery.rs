//! Mastery level type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`MasteryLevel`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MasteryLevelError {
    /// The value is outside the 1-10 scale.
    #[error("mastery level must be between {min} and {max} (got {value})")]
    OutOfRange {
        /// The rejected value.
        value: i64,
        /// Lowest allowed level.
        min: u8,
        /// Highest allowed level.
        max: u8,
    },
}

/// A student's mastery of the current material on a 1-10 scale.
///
/// ## Bands
///
/// - 1-3: foundation
/// - 4-6: developing
/// - 7-9: advanced
/// - 10: master
///
/// ## Examples
///
/// ```
/// use tutor_orchestrator_core::MasteryLevel;
///
/// assert!(MasteryLevel::new(7).is_ok());
/// assert!(MasteryLevel::new(0).is_err());
/// assert!(MasteryLevel::new(11).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct MasteryLevel(u8);

impl MasteryLevel {
    /// Lowest mastery level.
    pub const MIN: u8 = 1;
    /// Highest mastery level.
    pub const MAX: u8 = 10;

    /// Create a mastery level.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is outside `1..=10`.
    pub fn new(value: i64) -> Result<Self, MasteryLevelError> {
        u8::try_from(value)
            .ok()
            .filter(|v| (Self::MIN..=Self::MAX).contains(v))
            .map(Self)
            .ok_or(MasteryLevelError::OutOfRange {
                value,
                min: Self::MIN,
                max: Self::MAX,
            })
    }

    /// Create a mastery level, clamping into `1..=10`.
    #[must_use]
    pub fn saturating(value: i64) -> Self {
        let clamped = value.clamp(i64::from(Self::MIN), i64::from(Self::MAX));
        // Clamped into 1..=10, so the conversion cannot fail.
        Self(u8::try_from(clamped).unwrap_or(Self::MIN))
    }

    /// Returns the underlying value.
    #[must_use]
    pub const fn get(&self) -> u8 {
        self.0
    }

    /// Human-readable band name used in profile summaries.
    #[must_use]
    pub const fn band(&self) -> &'static str {
        match self.0 {
            0..=3 => "Foundation",
            4..=6 => "Developing",
            7..=9 => "Advanced",
            _ => "Master",
        }
    }
}

impl fmt::Display for MasteryLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i64> for MasteryLevel {
    type Error = MasteryLevelError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<MasteryLevel> for u8 {
    fn from(level: MasteryLevel) -> Self {
        level.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_in_range() {
        for v in 1..=10 {
            assert_eq!(MasteryLevel::new(v).unwrap().get(), u8::try_from(v).unwrap());
        }
    }

    #[test]
    fn test_new_out_of_range() {
        assert!(matches!(
            MasteryLevel::new(0),
            Err(MasteryLevelError::OutOfRange { value: 0, .. })
        ));
        assert!(MasteryLevel::new(11).is_err());
        assert!(MasteryLevel::new(-3).is_err());
        assert!(MasteryLevel::new(300).is_err());
    }

    #[test]
    fn test_saturating() {
        assert_eq!(MasteryLevel::saturating(-5).get(), 1);
        assert_eq!(MasteryLevel::saturating(14).get(), 10);
        assert_eq!(MasteryLevel::saturating(6).get(), 6);
    }

    #[test]
    fn test_band() {
        assert_eq!(MasteryLevel::new(2).unwrap().band(), "Foundation");
        assert_eq!(MasteryLevel::new(5).unwrap().band(), "Developing");
        assert_eq!(MasteryLevel::new(9).unwrap().band(), "Advanced");
        assert_eq!(MasteryLevel::new(10).unwrap().band(), "Master");
    }

    #[test]
    fn test_serde_rejects_out_of_range() {
        assert!(serde_json::from_str::<MasteryLevel>("12").is_err());
        let level: MasteryLevel = serde_json::from_str("7").unwrap();
        assert_eq!(level.get(), 7);
        assert_eq!(serde_json::to_string(&level).unwrap(), "7");
    }
}
