//! Atomic multi-command submission
//!
//! A [`Transaction`] is an ordered batch of [`Command`]s applied as one
//! unit. Guarded commands (`SetIfAbsent`, `SetIfPresent`, `SetIfEquals`,
//! `Delete`) carry a precondition on the current state of their key; if any guard fails the
//! whole batch is discarded and [`TxOutcome::Aborted`] names the command
//! that failed. Nothing in the batch is visible to other readers until
//! the batch commits.

use std::fmt;

/// A single write against the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Unconditional write
    Set { key: String, value: Vec<u8> },
    /// Write only if the key does not exist (guarded)
    SetIfAbsent { key: String, value: Vec<u8> },
    /// Write only if the key exists (guarded)
    SetIfPresent { key: String, value: Vec<u8> },
    /// Write only if the key currently holds exactly `expected` (guarded)
    SetIfEquals {
        key: String,
        expected: Vec<u8>,
        value: Vec<u8>,
    },
    /// Remove an existing key (guarded: a missing key aborts the batch)
    Delete { key: String },
    /// Add a member to a named set
    SetAdd { set: String, member: String },
    /// Remove a member from a named set
    SetRemove { set: String, member: String },
}

impl Command {
    /// Whether a no-op application of this command aborts the batch
    pub fn is_guarded(&self) -> bool {
        matches!(
            self,
            Command::SetIfAbsent { .. }
                | Command::SetIfPresent { .. }
                | Command::SetIfEquals { .. }
                | Command::Delete { .. }
        )
    }

    /// Key (or set name) the command touches
    pub fn key(&self) -> &str {
        match self {
            Command::Set { key, .. }
            | Command::SetIfAbsent { key, .. }
            | Command::SetIfPresent { key, .. }
            | Command::SetIfEquals { key, .. }
            | Command::Delete { key } => key,
            Command::SetAdd { set, .. } | Command::SetRemove { set, .. } => set,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Set { key, value } => write!(f, "SET {} ({} bytes)", key, value.len()),
            Command::SetIfAbsent { key, value } => {
                write!(f, "SETNX {} ({} bytes)", key, value.len())
            }
            Command::SetIfPresent { key, value } => {
                write!(f, "SETXX {} ({} bytes)", key, value.len())
            }
            Command::SetIfEquals { key, value, .. } => {
                write!(f, "CAS {} ({} bytes)", key, value.len())
            }
            Command::Delete { key } => write!(f, "DEL {}", key),
            Command::SetAdd { set, member } => write!(f, "SADD {} {}", set, member),
            Command::SetRemove { set, member } => write!(f, "SREM {} {}", set, member),
        }
    }
}

/// Ordered batch of commands submitted in one message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transaction {
    commands: Vec<Command>,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, command: Command) -> Self {
        self.commands.push(command);
        self
    }

    pub fn set(self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.push(Command::Set {
            key: key.into(),
            value: value.into(),
        })
    }

    pub fn set_if_absent(self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.push(Command::SetIfAbsent {
            key: key.into(),
            value: value.into(),
        })
    }

    pub fn set_if_present(self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.push(Command::SetIfPresent {
            key: key.into(),
            value: value.into(),
        })
    }

    pub fn set_if_equals(
        self,
        key: impl Into<String>,
        expected: impl Into<Vec<u8>>,
        value: impl Into<Vec<u8>>,
    ) -> Self {
        self.push(Command::SetIfEquals {
            key: key.into(),
            expected: expected.into(),
            value: value.into(),
        })
    }

    pub fn delete(self, key: impl Into<String>) -> Self {
        self.push(Command::Delete { key: key.into() })
    }

    pub fn set_add(self, set: impl Into<String>, member: impl Into<String>) -> Self {
        self.push(Command::SetAdd {
            set: set.into(),
            member: member.into(),
        })
    }

    pub fn set_remove(self, set: impl Into<String>, member: impl Into<String>) -> Self {
        self.push(Command::SetRemove {
            set: set.into(),
            member: member.into(),
        })
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn into_commands(self) -> Vec<Command> {
        self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Result of submitting a [`Transaction`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxOutcome {
    /// Every command applied. One entry per command: whether it changed
    /// state (a set member newly added/removed, a key written/deleted).
    Committed(Vec<bool>),
    /// A guard failed; nothing was applied
    Aborted { index: usize, command: Command },
}

impl TxOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, TxOutcome::Committed(_))
    }

    pub fn replies(&self) -> &[bool] {
        match self {
            TxOutcome::Committed(replies) => replies,
            TxOutcome::Aborted { .. } => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_keeps_order() {
        let tx = Transaction::new()
            .set_if_absent("order:1", b"{}".to_vec())
            .set_add("orders", "order:1");

        assert_eq!(tx.len(), 2);
        assert!(matches!(tx.commands()[0], Command::SetIfAbsent { .. }));
        assert!(matches!(tx.commands()[1], Command::SetAdd { .. }));
    }

    #[test]
    fn test_guarded_commands() {
        assert!(Command::Delete { key: "k".into() }.is_guarded());
        assert!(
            Command::SetIfEquals {
                key: "k".into(),
                expected: vec![1],
                value: vec![2]
            }
            .is_guarded()
        );
        assert!(
            Command::SetIfPresent {
                key: "k".into(),
                value: vec![]
            }
            .is_guarded()
        );
        assert!(
            !Command::SetRemove {
                set: "s".into(),
                member: "m".into()
            }
            .is_guarded()
        );
        assert!(
            !Command::Set {
                key: "k".into(),
                value: vec![]
            }
            .is_guarded()
        );
    }

    #[test]
    fn test_display() {
        let cmd = Command::SetAdd {
            set: "orders".into(),
            member: "order:7".into(),
        };
        assert_eq!(cmd.to_string(), "SADD orders order:7");
        assert_eq!(cmd.key(), "orders");

        let cmd = Command::SetIfAbsent {
            key: "order:7".into(),
            value: vec![0; 12],
        };
        assert_eq!(cmd.to_string(), "SETNX order:7 (12 bytes)");
    }

    #[test]
    fn test_outcome_replies() {
        let committed = TxOutcome::Committed(vec![true, false]);
        assert!(committed.is_committed());
        assert_eq!(committed.replies(), &[true, false]);

        let aborted = TxOutcome::Aborted {
            index: 0,
            command: Command::Delete { key: "k".into() },
        };
        assert!(!aborted.is_committed());
        assert!(aborted.replies().is_empty());
    }
}
