//! Client side of a collaborative spreadsheet session

use crate::command::Command;
use crate::error::OtError;
use crate::registry::{InverseCommandRegistry, OtRegistry};
use crate::rules::default_registries;
use std::collections::VecDeque;

/// Local commands not yet accepted by the server, and the undo stack
///
/// Remote commands are received in transport order; each one is applied to
/// every pending command before the next is considered.
#[derive(Debug, Clone)]
pub struct CollaborativeSession {
    transforms: OtRegistry,
    inverses: InverseCommandRegistry,
    pending: VecDeque<Command>,
    undo_stack: Vec<Vec<Command>>,
}

impl Default for CollaborativeSession {
    fn default() -> Self {
        let (transforms, inverses) = default_registries();
        Self::new(transforms, inverses)
    }
}

impl CollaborativeSession {
    /// Create session over the given rule tables
    #[must_use]
    pub fn new(transforms: OtRegistry, inverses: InverseCommandRegistry) -> Self {
        Self {
            transforms,
            inverses,
            pending: VecDeque::new(),
            undo_stack: Vec::new(),
        }
    }

    /// Transformation rules
    #[inline]
    #[must_use]
    pub fn transforms(&self) -> &OtRegistry {
        &self.transforms
    }

    /// Inverse rules
    #[inline]
    #[must_use]
    pub fn inverses(&self) -> &InverseCommandRegistry {
        &self.inverses
    }

    /// Queue a local command and record how to undo it
    ///
    /// # Errors
    /// Returns the validation error of an inconsistent command; nothing is
    /// queued then
    pub fn dispatch_local(&mut self, command: Command) -> Result<(), OtError> {
        command.validate()?;
        let inverse = self.inverses.inverses(&command);
        if !inverse.is_empty() {
            self.undo_stack.push(inverse);
        }
        tracing::debug!(kind = %command.kind(), pending = self.pending.len() + 1, "local command");
        self.pending.push_back(command);
        Ok(())
    }

    /// Reconcile pending commands with `applied`, received from another
    /// client; returns the pending commands it voided
    pub fn receive_remote(&mut self, applied: &Command) -> Vec<Command> {
        let mut dropped = Vec::new();
        let pending = std::mem::take(&mut self.pending);
        for command in pending {
            match self.transforms.transform(&command, applied) {
                Some(transformed) => self.pending.push_back(transformed),
                None => dropped.push(command),
            }
        }
        if !dropped.is_empty() {
            tracing::debug!(kind = %applied.kind(), dropped = dropped.len(), "remote command voided pending commands");
        }
        dropped
    }

    /// Oldest pending command, accepted by the server
    pub fn acknowledge(&mut self) -> Option<Command> {
        self.pending.pop_front()
    }

    /// Undo the last undoable local command
    ///
    /// The inverse commands are queued as pending and returned.
    pub fn undo(&mut self) -> Option<Vec<Command>> {
        let inverse = self.undo_stack.pop()?;
        self.pending.extend(inverse.iter().cloned());
        Some(inverse)
    }

    /// Commands waiting for the server, oldest first
    #[must_use]
    pub fn pending(&self) -> &VecDeque<Command> {
        &self.pending
    }

    /// Number of undoable commands
    #[must_use]
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CellPosition, FilterKind, GlobalFilter};
    use crate::insert::build_list_insert;
    use pretty_assertions::assert_eq;
    use sheetsync_model::ListDefinition;

    fn edit(id: &str) -> Command {
        Command::EditGlobalFilter {
            id: id.to_string(),
            filter: GlobalFilter::new(id, "Edited", FilterKind::Date),
        }
    }

    fn insert(id: u32) -> Command {
        build_list_insert(id, "s1", CellPosition::default(), ListDefinition::new("partner", ["name"]), 1)
    }

    #[test]
    fn remote_remove_drops_pending_edit() {
        let mut session = CollaborativeSession::default();
        session.dispatch_local(edit("f1")).unwrap();
        session.dispatch_local(edit("f2")).unwrap();

        let dropped = session.receive_remote(&Command::RemoveGlobalFilter { id: "f1".to_string() });
        assert_eq!(dropped, vec![edit("f1")]);
        assert_eq!(session.pending().iter().cloned().collect::<Vec<_>>(), vec![edit("f2")]);
    }

    #[test]
    fn remote_commands_apply_in_receipt_order() {
        let mut session = CollaborativeSession::default();
        session.dispatch_local(insert(1)).unwrap();

        session.receive_remote(&insert(1));
        session.receive_remote(&insert(2));
        assert_eq!(session.pending()[0], insert(3));
    }

    #[test]
    fn acknowledge_pops_oldest() {
        let mut session = CollaborativeSession::default();
        session.dispatch_local(edit("a")).unwrap();
        session.dispatch_local(edit("b")).unwrap();
        assert_eq!(session.acknowledge(), Some(edit("a")));
        assert_eq!(session.pending().len(), 1);
    }

    #[test]
    fn undo_queues_inverse() {
        let mut session = CollaborativeSession::default();
        let filter = GlobalFilter::new("f1", "Owner", FilterKind::Relation);
        session.dispatch_local(Command::AddGlobalFilter { filter }).unwrap();
        session.acknowledge();

        let undone = session.undo().unwrap();
        assert_eq!(undone, vec![Command::RemoveGlobalFilter { id: "f1".to_string() }]);
        assert_eq!(session.pending().len(), 1);
        assert_eq!(session.undo(), None);
    }

    #[test]
    fn invalid_command_is_not_queued() {
        let mut session = CollaborativeSession::default();
        let command = Command::EditGlobalFilter {
            id: "a".to_string(),
            filter: GlobalFilter::placeholder("b"),
        };
        assert!(session.dispatch_local(command).is_err());
        assert!(session.pending().is_empty());
        assert_eq!(session.undo_depth(), 0);
    }
}
