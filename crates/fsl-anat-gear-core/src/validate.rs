//! Checks on the flag dictionary before the tool is invoked.

use crate::params::INPUT_FLAG;
use crate::{FlagMap, FlagValue, GearError};
use log::warn;
use std::fmt;
use std::path::Path;

/// Bias-field parameter that requires nonlinear registration.
const BET_F_PARAM: &str = "betfparam";
/// Flag disabling nonlinear registration.
const NO_NONLIN_REG: &str = "nononlinreg";
/// Bias field smoothing flag.
const SMOOTHING: &str = "s";
/// Smoothing values below this risk a singular matrix downstream.
const SMOOTHING_MIN: f64 = 2.0;
/// Replacement for an unsafe smoothing value.
const SMOOTHING_DEFAULT: i64 = 10;

/// A parameter that was corrected instead of rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationWarning {
    /// Smoothing was below the safe minimum and has been reset.
    SmoothingReset {
        original: FlagValue,
        replacement: FlagValue,
    },
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SmoothingReset {
                original,
                replacement,
            } => write!(
                f,
                "the value of {original} for -s may cause a singular matrix; setting to default value of {replacement}"
            ),
        }
    }
}

/// Validate the flag dictionary, correcting recoverable values in place.
///
/// Fails when the input image is missing or when `betfparam` is positive
/// while nonlinear registration is disabled.
pub fn validate_params(params: &mut FlagMap) -> Result<Vec<ValidationWarning>, GearError> {
    let input = params
        .get(INPUT_FLAG)
        .ok_or_else(|| GearError::MissingFlag(INPUT_FLAG.to_string()))?;
    let input = Path::new(match input {
        FlagValue::Text(path) => path.as_str(),
        _ => return Err(GearError::MissingFlag(INPUT_FLAG.to_string())),
    });
    if !input.exists() {
        return Err(GearError::InputNotFound(input.to_path_buf()));
    }

    let betfparam = params.get(BET_F_PARAM).and_then(FlagValue::as_f64);
    let nonlinear_disabled = matches!(params.get(NO_NONLIN_REG), Some(FlagValue::Bool(true)));
    if let Some(betfparam) = betfparam {
        if betfparam > 0.0 && nonlinear_disabled {
            return Err(GearError::InvalidFlagCombination(format!(
                "betfparam={betfparam} requires nonlinear registration, but nononlinreg is set"
            )));
        }
    }

    let mut warnings = Vec::new();
    if let Some(smoothing) = params.get(SMOOTHING).and_then(FlagValue::as_f64) {
        if smoothing < SMOOTHING_MIN {
            let replacement = FlagValue::from(SMOOTHING_DEFAULT);
            let original = params
                .insert(SMOOTHING, replacement.clone())
                .unwrap_or_else(|| FlagValue::from(SMOOTHING_DEFAULT));
            let warning = ValidationWarning::SmoothingReset {
                original,
                replacement,
            };
            warn!("{warning}");
            warnings.push(warning);
        }
    }
    Ok(warnings)
}
