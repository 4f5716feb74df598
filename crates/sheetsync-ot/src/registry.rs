//! Transformation and inverse rule tables
//!
//! Both registries are plain values owned by a [`CollaborativeSession`]:
//! rules are registered once at startup and only read afterwards. One rule
//! per key; registering again replaces the previous rule.
//!
//! [`CollaborativeSession`]: crate::CollaborativeSession

use crate::command::{Command, CommandKind};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// `fn(pending, applied)`, `None` when the pending command becomes void
pub type TransformFn = Arc<dyn Fn(&Command, &Command) -> Option<Command> + Send + Sync>;

/// `fn(command)`, the commands undoing it
pub type InverseFn = Arc<dyn Fn(&Command) -> Vec<Command> + Send + Sync>;

/// Rules reconciling a pending command with one applied before it
#[derive(Clone, Default)]
pub struct OtRegistry {
    rules: HashMap<(CommandKind, CommandKind), TransformFn>,
}

impl fmt::Debug for OtRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.rules.keys().collect();
        keys.sort();
        f.debug_struct("OtRegistry").field("rules", &keys).finish()
    }
}

impl OtRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `rule` for pending commands of `pending_kinds` meeting an
    /// applied command of `applied`
    pub fn add_transformation<F>(&mut self, applied: CommandKind, pending_kinds: &[CommandKind], rule: F) -> &mut Self
    where
        F: Fn(&Command, &Command) -> Option<Command> + Send + Sync + 'static,
    {
        let rule: TransformFn = Arc::new(rule);
        for pending in pending_kinds {
            if self.rules.insert((applied, *pending), Arc::clone(&rule)).is_some() {
                tracing::debug!(%applied, %pending, "replacing transformation rule");
            }
        }
        self
    }

    /// Reconcile `pending` with `applied`
    ///
    /// Without a rule for the pair the pending command passes unchanged.
    #[must_use]
    pub fn transform(&self, pending: &Command, applied: &Command) -> Option<Command> {
        match self.rules.get(&(applied.kind(), pending.kind())) {
            Some(rule) => rule(pending, applied),
            None => Some(pending.clone()),
        }
    }

    /// Whether a rule exists for the pair
    #[must_use]
    pub fn has_rule(&self, applied: CommandKind, pending: CommandKind) -> bool {
        self.rules.contains_key(&(applied, pending))
    }

    /// Number of registered pairs
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether nothing is registered
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Rules building the undo of a command
#[derive(Clone, Default)]
pub struct InverseCommandRegistry {
    rules: HashMap<CommandKind, InverseFn>,
}

impl fmt::Debug for InverseCommandRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.rules.keys().collect();
        keys.sort();
        f.debug_struct("InverseCommandRegistry").field("rules", &keys).finish()
    }
}

impl InverseCommandRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the inverse rule of `kind`
    pub fn add<F>(&mut self, kind: CommandKind, rule: F) -> &mut Self
    where
        F: Fn(&Command) -> Vec<Command> + Send + Sync + 'static,
    {
        self.rules.insert(kind, Arc::new(rule));
        self
    }

    /// Commands undoing `command`, none if its kind has no rule
    #[must_use]
    pub fn inverses(&self, command: &Command) -> Vec<Command> {
        self.rules
            .get(&command.kind())
            .map(|rule| rule(command))
            .unwrap_or_default()
    }

    /// Whether `kind` has a rule
    #[must_use]
    pub fn contains(&self, kind: CommandKind) -> bool {
        self.rules.contains_key(&kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remove(id: &str) -> Command {
        Command::RemoveGlobalFilter { id: id.to_string() }
    }

    #[test]
    fn last_registration_wins() {
        let mut registry = OtRegistry::new();
        registry
            .add_transformation(CommandKind::RemoveGlobalFilter, &[CommandKind::RemoveGlobalFilter], |_, _| None)
            .add_transformation(CommandKind::RemoveGlobalFilter, &[CommandKind::RemoveGlobalFilter], |p, _| {
                Some(p.clone())
            });
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.transform(&remove("a"), &remove("a")), Some(remove("a")));
    }

    #[test]
    fn missing_rule_is_identity() {
        let registry = OtRegistry::new();
        assert_eq!(registry.transform(&remove("a"), &remove("b")), Some(remove("a")));
        assert!(!registry.has_rule(CommandKind::RemoveGlobalFilter, CommandKind::RemoveGlobalFilter));
    }

    #[test]
    fn missing_inverse_is_empty() {
        let registry = InverseCommandRegistry::new();
        assert!(registry.inverses(&remove("a")).is_empty());
    }
}
