//! Proof-of-stake: assign the block to a validator drawn with probability
//! proportional to stake.
//!
//! The draw uses whatever random source the caller passes in. A seeded
//! generator makes the choice reproducible; an entropy-seeded one does not,
//! and that is accepted behavior rather than a defect.

use rand::Rng;
use tracing::debug;

use super::ConsensusStrategy;
use crate::block::{Block, BlockDraft, Seal};
use crate::error::{ChainError, Result};
use crate::validator::{total_stake, validate_roster, Validator};

/// Draws one validator by stake weight.
///
/// Cumulative stake boundaries are laid out in roster order and a value is
/// drawn uniformly from `[0, total)`; the first validator whose boundary is at
/// or above the draw wins.
pub fn select_validator<'v, R: Rng + ?Sized>(
    validators: &'v [Validator],
    rng: &mut R,
) -> Result<&'v Validator> {
    let last = validators.last().ok_or(ChainError::EmptyValidatorSet)?;
    validate_roster(validators)?;

    let total = total_stake(validators);
    if !total.is_finite() {
        return Err(ChainError::InvalidStake {
            name: "<total>".to_string(),
            stake: total,
        });
    }

    let draw = rng.gen_range(0.0..total);
    let mut cumulative = 0.0;
    for validator in validators {
        cumulative += validator.stake;
        if cumulative >= draw {
            return Ok(validator);
        }
    }
    // Only reachable through floating-point rounding in the running sum.
    Ok(last)
}

pub struct ProofOfStake<'a, R: Rng + ?Sized> {
    validators: &'a [Validator],
    rng: &'a mut R,
}

impl<'a, R: Rng + ?Sized> ProofOfStake<'a, R> {
    pub fn new(validators: &'a [Validator], rng: &'a mut R) -> Self {
        Self { validators, rng }
    }
}

impl<R: Rng + ?Sized> ConsensusStrategy for ProofOfStake<'_, R> {
    fn name(&self) -> &'static str {
        "proof-of-stake"
    }

    fn seal(&mut self, draft: BlockDraft) -> Result<Block> {
        let selected = select_validator(self.validators, &mut *self.rng)?;
        debug!(index = draft.header.index, validator = %selected.name, "validator selected");

        let seal = Seal::Stake {
            validator: selected.name.clone(),
        };
        let hash = draft.digest_with(seal.field());
        Ok(draft.into_block(seal, hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::Transaction;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    fn roster() -> Vec<Validator> {
        vec![
            Validator::new("Alice", 50.0).unwrap(),
            Validator::new("Bob", 30.0).unwrap(),
            Validator::new("Charlie", 20.0).unwrap(),
        ]
    }

    fn draft() -> BlockDraft {
        BlockDraft::new(
            2,
            "f".repeat(64),
            vec![Transaction::new("2", "Bob", "Charlie", 5.0)],
        )
    }

    #[test]
    fn empty_roster_is_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            select_validator(&[], &mut rng),
            Err(ChainError::EmptyValidatorSet)
        ));
        let err = ProofOfStake::new(&[], &mut rng).seal(draft()).unwrap_err();
        assert!(matches!(err, ChainError::EmptyValidatorSet));
    }

    #[test]
    fn selected_validator_comes_from_roster() {
        let validators = roster();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let block = ProofOfStake::new(&validators, &mut rng).seal(draft()).unwrap();
            let name = block.validator().unwrap();
            assert!(validators.iter().any(|v| v.name == name));
            assert!(block.is_valid());
        }
    }

    #[test]
    fn same_seed_same_choice() {
        let validators = roster();
        let picks = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..20)
                .map(|_| select_validator(&validators, &mut rng).unwrap().name.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(picks(42), picks(42));
    }

    #[test]
    fn single_validator_always_wins() {
        let validators = vec![Validator::new("Solo", 1.0).unwrap()];
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..10 {
            assert_eq!(select_validator(&validators, &mut rng).unwrap().name, "Solo");
        }
    }

    #[test]
    fn selection_frequency_follows_stake() {
        let validators = roster();
        let mut rng = StdRng::seed_from_u64(2024);
        let mut counts: HashMap<String, u32> = HashMap::new();
        let draws = 20_000;
        for _ in 0..draws {
            let v = select_validator(&validators, &mut rng).unwrap();
            *counts.entry(v.name.clone()).or_default() += 1;
        }
        let share = |name: &str| counts[name] as f64 / draws as f64;
        assert!((share("Alice") - 0.5).abs() < 0.03);
        assert!((share("Bob") - 0.3).abs() < 0.03);
        assert!((share("Charlie") - 0.2).abs() < 0.03);
    }

    #[test]
    fn unvalidated_roster_is_rejected() {
        let validators = vec![Validator {
            name: "Zero".to_string(),
            stake: 0.0,
        }];
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            select_validator(&validators, &mut rng),
            Err(ChainError::InvalidStake { .. })
        ));
    }
}
