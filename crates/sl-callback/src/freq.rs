//! Update-frequency policy for expensive emissions.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use sl_types::{config_error, SlError, SlResult};

/// How often an expensive update (plots, study snapshot) should be emitted.
///
/// Two independent policies exist per callback, one for plots and one for the
/// study snapshot; they may fire on different trials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateFrequency {
    /// Fire on every trial whose number is a multiple of the stride (≥ 1).
    Every(u32),
    /// Never fire.
    Never,
    /// Fire only while the engine's stop flag is set.
    ///
    /// Known imprecision inherited from the engine: the stop flag is not a
    /// reliable single-shot marker for the final trial and may fire on more
    /// than one trailing trial, or on none.
    Last,
}

impl Default for UpdateFrequency {
    fn default() -> Self {
        Self::Every(1)
    }
}

impl UpdateFrequency {
    /// Reject strides below 1.  Called from config validation so that an
    /// invalid policy fails at construction, not mid-run.
    pub fn validate(&self) -> SlResult<()> {
        match self {
            Self::Every(0) => Err(config_error!("update frequency stride must be >= 1")),
            _ => Ok(()),
        }
    }

    /// Whether the gated update should run for this trial.
    ///
    /// A zero stride never fires; validation rejects it at construction, but
    /// the variant is publicly constructible and must not panic mid-run.
    pub fn should_fire(&self, trial_number: usize, stop_requested: bool) -> bool {
        match self {
            Self::Never => false,
            Self::Last => stop_requested,
            Self::Every(0) => false,
            Self::Every(stride) => trial_number % (*stride as usize) == 0,
        }
    }
}

impl FromStr for UpdateFrequency {
    type Err = SlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "never" => Ok(Self::Never),
            "last" => Ok(Self::Last),
            other => {
                let stride: u32 = other.parse().map_err(|_| {
                    config_error!(
                        "invalid update frequency '{other}': expected a positive integer, 'never', or 'last'"
                    )
                })?;
                let freq = Self::Every(stride);
                freq.validate()?;
                Ok(freq)
            }
        }
    }
}

impl std::fmt::Display for UpdateFrequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Every(n) => write!(f, "{n}"),
            Self::Never => write!(f, "never"),
            Self::Last => write!(f, "last"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_never_fires() {
        let freq = UpdateFrequency::Never;
        for number in 0..50 {
            assert!(!freq.should_fire(number, false));
            assert!(!freq.should_fire(number, true));
        }
    }

    #[test]
    fn every_n_fires_on_multiples() {
        for stride in 1..=7u32 {
            let freq = UpdateFrequency::Every(stride);
            for number in 0..100 {
                assert_eq!(
                    freq.should_fire(number, false),
                    number % stride as usize == 0,
                    "stride {stride}, trial {number}"
                );
            }
        }
    }

    #[test]
    fn every_n_ignores_stop_flag() {
        let freq = UpdateFrequency::Every(3);
        assert!(!freq.should_fire(2, true));
        assert!(freq.should_fire(3, true));
    }

    #[test]
    fn last_tracks_stop_flag() {
        let freq = UpdateFrequency::Last;
        for number in 0..20 {
            assert!(!freq.should_fire(number, false));
            assert!(freq.should_fire(number, true));
        }
    }

    #[test]
    fn zero_stride_is_rejected() {
        assert!(UpdateFrequency::Every(0).validate().is_err());
        assert!(UpdateFrequency::Every(1).validate().is_ok());
    }

    #[test]
    fn zero_stride_never_fires_instead_of_panicking() {
        // Validation rejects Every(0), but a directly-constructed value must
        // still be safe to evaluate.
        let freq = UpdateFrequency::Every(0);
        for number in 0..10 {
            assert!(!freq.should_fire(number, false));
            assert!(!freq.should_fire(number, true));
        }
    }

    #[test]
    fn parses_from_strings() {
        assert_eq!("never".parse::<UpdateFrequency>().unwrap(), UpdateFrequency::Never);
        assert_eq!("last".parse::<UpdateFrequency>().unwrap(), UpdateFrequency::Last);
        assert_eq!("4".parse::<UpdateFrequency>().unwrap(), UpdateFrequency::Every(4));
        assert!("0".parse::<UpdateFrequency>().is_err());
        assert!("sometimes".parse::<UpdateFrequency>().is_err());
    }
}
