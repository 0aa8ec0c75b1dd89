//! `LABEL` / `GOTO` targets and the jump guard.
//!
//! Jumps are flat: there is no call stack, so the only thing bounding a
//! `GOTO` cycle is a per-label traversal counter.  Every jump bumps the
//! target's counter; before each statement [`LabelTable::check`] fails the
//! run once any counter goes above the limit.

use std::collections::HashMap;

use crate::script::error::{LookupKind, ScriptError};

/// Default cap on traversals of a single label.
pub const JUMP_LIMIT: u32 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label {
    /// Top-level instruction index the label was declared at.
    pub index: usize,
    /// Number of `GOTO`s to this label since it was last declared.
    pub traversals: u32,
}

#[derive(Debug, Default)]
pub struct LabelTable {
    labels: HashMap<String, Label>,
}

impl LabelTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `name` at `index`.  Redeclaring moves the label and zeroes its
    /// counter.
    pub fn declare(&mut self, name: impl Into<String>, index: usize) {
        self.labels.insert(name.into(), Label { index, traversals: 0 });
    }

    /// Count a traversal of `name` and return its target index.
    pub fn jump(&mut self, name: &str) -> Result<usize, ScriptError> {
        let label = self.labels.get_mut(name).ok_or_else(|| ScriptError::Lookup {
            kind: LookupKind::Label,
            name: name.to_owned(),
        })?;
        label.traversals = label.traversals.saturating_add(1);
        Ok(label.index)
    }

    /// Fail if any label has been traversed more than `limit` times.
    pub fn check(&self, limit: u32) -> Result<(), ScriptError> {
        match self.labels.iter().find(|(_, l)| l.traversals > limit) {
            Some((name, _)) => Err(ScriptError::RecursionLimit {
                what: format!("label {name}"),
                limit,
            }),
            None => Ok(()),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Label> {
        self.labels.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.labels.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn clear(&mut self) {
        self.labels.clear();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jump_returns_index_and_counts() {
        let mut labels = LabelTable::new();
        labels.declare("top", 3);
        assert_eq!(labels.jump("top").unwrap(), 3);
        assert_eq!(labels.jump("top").unwrap(), 3);
        assert_eq!(labels.get("top").unwrap().traversals, 2);
    }

    #[test]
    fn unknown_label_is_lookup_error() {
        let mut labels = LabelTable::new();
        assert!(matches!(
            labels.jump("nowhere"),
            Err(ScriptError::Lookup { kind: LookupKind::Label, .. })
        ));
    }

    #[test]
    fn redeclare_relocates_and_resets() {
        let mut labels = LabelTable::new();
        labels.declare("l", 1);
        labels.jump("l").unwrap();
        labels.declare("l", 7);
        assert_eq!(labels.get("l"), Some(&Label { index: 7, traversals: 0 }));
    }

    #[test]
    fn check_trips_only_above_limit() {
        let mut labels = LabelTable::new();
        labels.declare("l", 0);
        for _ in 0..3 {
            labels.jump("l").unwrap();
        }
        assert!(labels.check(3).is_ok());
        labels.jump("l").unwrap();
        assert!(matches!(labels.check(3), Err(ScriptError::RecursionLimit { limit: 3, .. })));
    }
}
