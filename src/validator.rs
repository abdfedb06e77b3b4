use serde::{Deserialize, Serialize};

use crate::error::{ChainError, Result};

/// A proof-of-stake participant.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Validator {
    pub name: String,
    /// Weight in the validator draw. Must be finite and positive.
    pub stake: f64,
}

impl Validator {
    pub fn new(name: impl Into<String>, stake: f64) -> Result<Self> {
        let validator = Self {
            name: name.into(),
            stake,
        };
        validator.validate()?;
        Ok(validator)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.stake.is_finite() || self.stake <= 0.0 {
            return Err(ChainError::InvalidStake {
                name: self.name.clone(),
                stake: self.stake,
            });
        }
        Ok(())
    }
}

/// Checks every roster entry. An empty roster is allowed; it only fails once
/// proof-of-stake sealing is attempted.
pub fn validate_roster(validators: &[Validator]) -> Result<()> {
    validators.iter().try_for_each(Validator::validate)
}

/// Sum of all stakes in the roster.
pub fn total_stake(validators: &[Validator]) -> f64 {
    validators.iter().map(|v| v.stake).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_stake() {
        assert!(matches!(
            Validator::new("Mallory", 0.0),
            Err(ChainError::InvalidStake { .. })
        ));
        assert!(Validator::new("Mallory", -5.0).is_err());
        assert!(Validator::new("Mallory", f64::NAN).is_err());
    }

    #[test]
    fn roster_validation_finds_bad_entry() {
        let roster = vec![
            Validator::new("Alice", 50.0).unwrap(),
            Validator {
                name: "Bob".to_string(),
                stake: 0.0,
            },
        ];
        assert!(validate_roster(&roster).is_err());
        assert!(validate_roster(&[]).is_ok());
    }

    #[test]
    fn total_stake_sums_roster() {
        let roster = vec![
            Validator::new("Alice", 50.0).unwrap(),
            Validator::new("Bob", 30.0).unwrap(),
            Validator::new("Charlie", 20.0).unwrap(),
        ];
        assert_eq!(total_stake(&roster), 100.0);
    }
}
