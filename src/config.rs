//! Runtime settings.
//!
//! Sources, later ones winning: built-in defaults, an optional settings file
//! (format chosen by extension), then `MINICHAIN_*` environment variables
//! (`__` separates nested keys).

use std::path::Path;

use ::config::{Config, Environment, File};
use serde::Deserialize;

use crate::digest::DIGEST_LEN;
use crate::error::{ChainError, Result};
use crate::validator::Validator;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Leading hex zeros required of proof-of-work blocks.
    #[serde(default = "default_difficulty")]
    pub difficulty: usize,
    #[serde(default = "default_threads")]
    pub threads: usize,
    /// Upper bound on nonces tried per block. Unbounded when absent.
    #[serde(default)]
    pub max_attempts: Option<u64>,
    /// Seeds the validator draw. Entropy-seeded when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub store_path: Option<String>,
    #[serde(default = "default_validators")]
    pub validators: Vec<ValidatorSettings>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValidatorSettings {
    pub name: String,
    pub stake: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            difficulty: default_difficulty(),
            threads: default_threads(),
            max_attempts: None,
            seed: None,
            log_level: default_log_level(),
            store_path: None,
            validators: default_validators(),
        }
    }
}

impl Settings {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        let settings: Settings = builder
            .add_source(
                Environment::with_prefix("MINICHAIN")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.difficulty > DIGEST_LEN {
            return Err(ChainError::InvalidDifficulty(self.difficulty));
        }
        self.roster().map(|_| ())
    }

    /// The configured validators, checked for positive stake.
    pub fn roster(&self) -> Result<Vec<Validator>> {
        self.validators
            .iter()
            .map(|v| Validator::new(v.name.clone(), v.stake))
            .collect()
    }
}

fn default_difficulty() -> usize {
    2
}

fn default_threads() -> usize {
    1
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_validators() -> Vec<ValidatorSettings> {
    [("Alice", 50.0), ("Bob", 30.0), ("Charlie", 20.0)]
        .into_iter()
        .map(|(name, stake)| ValidatorSettings {
            name: name.to_string(),
            stake,
        })
        .collect()
}
