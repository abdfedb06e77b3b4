use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ChainError, Result};

/// A value transfer between two parties.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Transaction {
    /// Caller-chosen identifier.
    pub id: String,
    /// Paying party.
    pub sender: String,
    /// Receiving party.
    pub receiver: String,
    /// Amount transferred.
    pub amount: f64,
}

impl Transaction {
    pub fn new(
        id: impl Into<String>,
        sender: impl Into<String>,
        receiver: impl Into<String>,
        amount: f64,
    ) -> Self {
        Self {
            id: id.into(),
            sender: sender.into(),
            receiver: receiver.into(),
            amount,
        }
    }

    /// Canonical encoding used as the Merkle leaf: `id:sender->receiver:amount`.
    pub fn encode(&self) -> String {
        self.to_string()
    }

    /// Rejects transactions whose canonical encoding could be shared with a
    /// different transaction, and negative or non-finite amounts.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [("id", &self.id), ("sender", &self.sender), ("receiver", &self.receiver)] {
            if value.contains(':') || value.contains("->") {
                return Err(ChainError::InvalidTransaction(format!(
                    "transaction {} has a {} containing ':' or '->'",
                    self.id, field
                )));
            }
        }
        if !self.amount.is_finite() {
            return Err(ChainError::InvalidTransaction(format!(
                "transaction {} has a non-finite amount",
                self.id
            )));
        }
        if self.amount < 0.0 {
            return Err(ChainError::InvalidTransaction(format!(
                "transaction {} has a negative amount {}",
                self.id, self.amount
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}->{}:{}", self.id, self.sender, self.receiver, self.amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoding_is_fixed_order() {
        let tx = Transaction::new("1", "Alice", "Bob", 10.0);
        assert_eq!(tx.encode(), "1:Alice->Bob:10");
    }

    #[test]
    fn fractional_amount_keeps_decimals() {
        let tx = Transaction::new("7", "Bob", "Charlie", 2.5);
        assert_eq!(tx.encode(), "7:Bob->Charlie:2.5");
    }

    #[test]
    fn rejects_bad_amounts() {
        assert!(Transaction::new("1", "a", "b", -1.0).validate().is_err());
        assert!(Transaction::new("1", "a", "b", f64::NAN).validate().is_err());
        assert!(Transaction::new("1", "a", "b", f64::INFINITY).validate().is_err());
        assert!(Transaction::new("0", "Genesis", "Genesis", 0.0).validate().is_ok());
    }

    #[test]
    fn rejects_separators_in_text_fields() {
        assert!(Transaction::new("a:b->c", "d", "e", 1.0).validate().is_err());
        assert!(Transaction::new("a", "b", "c:d->e", 1.0).validate().is_err());
        assert!(Transaction::new("a", "b->", "c", 1.0).validate().is_err());
        assert!(Transaction::new("a", "b-", ">c", 1.0).validate().is_ok());
    }
}
