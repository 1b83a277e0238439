// ========================================================================================
//                             High-Level Data Contracts
// ========================================================================================

// This file is ONLY for types that are SHARED BETWEEN FILES, not types that only are used in one file.

use crate::error::RiskError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Biological sex as used by every calculator that stratifies or adjusts on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    /// The code used for this sex inside bundles (`"male"` / `"female"`).
    pub fn code(self) -> &'static str {
        match self {
            Sex::Male => "male",
            Sex::Female => "female",
        }
    }

    #[inline]
    pub fn female_indicator(self) -> f64 {
        indicator(self == Sex::Female)
    }
}

impl FromStr for Sex {
    type Err = RiskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" => Ok(Sex::Male),
            "female" => Ok(Sex::Female),
            other => Err(RiskError::validation(format!(
                "sex must be 'male' or 'female' (got {other:?})"
            ))),
        }
    }
}

/// Generates the string plumbing shared by every closed categorical input:
/// `code()`, `FromStr` with a `Validation` error listing the allowed codes,
/// `Display`, and serde conversions through the same codes.
macro_rules! categorical_codes {
    ($ty:ident, $what:literal, { $($variant:ident => $code:literal),+ $(,)? }) => {
        impl $ty {
            pub const ALLOWED: &'static [&'static str] = &[$($code),+];

            pub fn code(self) -> &'static str {
                match self {
                    $($ty::$variant => $code),+
                }
            }
        }

        impl std::str::FromStr for $ty {
            type Err = $crate::error::RiskError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let normalized = s.trim().to_ascii_lowercase();
                match normalized.as_str() {
                    $($code => Ok($ty::$variant),)+
                    _ => Err($crate::error::RiskError::Validation(format!(
                        "unknown {} {:?}; allowed: {:?}",
                        $what,
                        s,
                        $ty::ALLOWED
                    ))),
                }
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.code())
            }
        }

        impl TryFrom<String> for $ty {
            type Error = $crate::error::RiskError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$ty> for String {
            fn from(value: $ty) -> Self {
                value.code().to_string()
            }
        }
    };
}
pub(crate) use categorical_codes;

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl TryFrom<String> for Sex {
    type Error = RiskError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Sex> for String {
    fn from(value: Sex) -> Self {
        value.code().to_string()
    }
}

/// 1.0 for true, 0.0 for false.
#[inline]
pub fn indicator(flag: bool) -> f64 {
    if flag { 1.0 } else { 0.0 }
}

/// Rejects NaN and infinities on a named continuous input.
pub(crate) fn require_finite(name: &str, value: f64) -> Result<f64, RiskError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(RiskError::validation(format!(
            "'{name}' must be a finite number (got {value})"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sex_parses_case_insensitively() {
        assert_eq!("Male".parse::<Sex>().unwrap(), Sex::Male);
        assert_eq!(" female ".parse::<Sex>().unwrap(), Sex::Female);
    }

    #[test]
    fn unknown_sex_is_a_validation_error() {
        let err = "other".parse::<Sex>().unwrap_err();
        assert!(matches!(err, RiskError::Validation(_)));
    }

    #[test]
    fn indicator_maps_booleans() {
        assert_eq!(indicator(true), 1.0);
        assert_eq!(indicator(false), 0.0);
        assert_eq!(Sex::Female.female_indicator(), 1.0);
        assert_eq!(Sex::Male.female_indicator(), 0.0);
    }

    #[test]
    fn require_finite_rejects_nan() {
        assert!(require_finite("bmi", f64::NAN).is_err());
        assert_eq!(require_finite("bmi", 27.0).unwrap(), 27.0);
    }
}
