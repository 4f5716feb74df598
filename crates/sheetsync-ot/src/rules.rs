//! Default transformation and inverse rules

use crate::command::{Command, CommandKind, GlobalFilter};
use crate::registry::{InverseCommandRegistry, OtRegistry};

/// Register the default transformations
///
/// - a removed filter voids pending edits of the same filter
/// - a pending insert whose id was just taken by another insert of the same
///   kind moves to the next id
pub fn register_transformations(registry: &mut OtRegistry) {
    registry
        .add_transformation(
            CommandKind::RemoveGlobalFilter,
            &[CommandKind::EditGlobalFilter],
            edit_after_remove,
        )
        .add_transformation(
            CommandKind::InsertOdooList,
            &[CommandKind::InsertOdooList],
            insert_after_insert,
        )
        .add_transformation(
            CommandKind::InsertPivot,
            &[CommandKind::InsertPivot],
            insert_after_insert,
        );
}

/// Register the default inverses
///
/// Removing a filter is undone with an empty placeholder of the same id; the
/// removed content is not carried by the command.
pub fn register_inverses(registry: &mut InverseCommandRegistry) {
    registry
        .add(CommandKind::AddGlobalFilter, |command| match command {
            Command::AddGlobalFilter { filter } => vec![Command::RemoveGlobalFilter {
                id: filter.id.clone(),
            }],
            _ => Vec::new(),
        })
        .add(CommandKind::RemoveGlobalFilter, |command| match command {
            Command::RemoveGlobalFilter { id } => vec![Command::AddGlobalFilter {
                filter: GlobalFilter::placeholder(id.clone()),
            }],
            _ => Vec::new(),
        })
        .add(CommandKind::EditGlobalFilter, identity)
        .add(CommandKind::InsertOdooList, identity)
        .add(CommandKind::InsertPivot, identity);
}

/// Registries loaded with the default rules
#[must_use]
pub fn default_registries() -> (OtRegistry, InverseCommandRegistry) {
    let mut transforms = OtRegistry::new();
    register_transformations(&mut transforms);
    let mut inverses = InverseCommandRegistry::new();
    register_inverses(&mut inverses);
    (transforms, inverses)
}

fn identity(command: &Command) -> Vec<Command> {
    vec![command.clone()]
}

fn edit_after_remove(pending: &Command, applied: &Command) -> Option<Command> {
    match (pending, applied) {
        (Command::EditGlobalFilter { id, .. }, Command::RemoveGlobalFilter { id: removed }) if id == removed => {
            tracing::debug!(filter = %id, "dropping edit of removed filter");
            None
        }
        _ => Some(pending.clone()),
    }
}

fn insert_after_insert(pending: &Command, applied: &Command) -> Option<Command> {
    match (pending.insert_id(), applied.insert_id()) {
        (Some(pending_id), Some(applied_id)) if pending_id == applied_id => {
            let Some(next_id) = pending_id.checked_add(1) else {
                tracing::warn!(kind = %pending.kind(), id = pending_id, "no id left to renumber colliding insert");
                return None;
            };
            tracing::debug!(kind = %pending.kind(), from = pending_id, to = next_id, "renumbering colliding insert");
            Some(pending.clone().renumbered(next_id))
        }
        _ => Some(pending.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CellPosition, FilterKind, InsertedCell};
    use crate::formula::DataFormula;
    use pretty_assertions::assert_eq;
    use sheetsync_model::ListDefinition;

    fn edit(id: &str) -> Command {
        Command::EditGlobalFilter {
            id: id.to_string(),
            filter: GlobalFilter::new(id, "Edited", FilterKind::Text),
        }
    }

    fn list_insert(id: u32) -> Command {
        Command::InsertOdooList {
            id,
            sheet_id: "s1".to_string(),
            definition: ListDefinition::new("partner", ["name"]),
            cells: vec![InsertedCell {
                position: CellPosition::new(0, 1),
                formula: DataFormula::List {
                    id,
                    position: 1,
                    field: "name".to_string(),
                },
            }],
        }
    }

    #[test]
    fn remove_voids_edit_of_same_filter() {
        let (registry, _) = default_registries();
        let removed = Command::RemoveGlobalFilter { id: "f1".to_string() };
        assert_eq!(registry.transform(&edit("f1"), &removed), None);
        assert_eq!(registry.transform(&edit("f2"), &removed), Some(edit("f2")));
    }

    #[test]
    fn colliding_insert_is_renumbered() {
        let (registry, _) = default_registries();
        let transformed = registry.transform(&list_insert(1), &list_insert(1)).unwrap();
        assert_eq!(transformed, list_insert(2));
        assert_eq!(registry.transform(&list_insert(1), &list_insert(5)), Some(list_insert(1)));
    }

    #[test]
    fn colliding_insert_at_last_id_is_dropped() {
        let (registry, _) = default_registries();
        assert_eq!(registry.transform(&list_insert(u32::MAX), &list_insert(u32::MAX)), None);
    }

    #[test]
    fn list_and_pivot_ids_do_not_collide() {
        let (registry, _) = default_registries();
        assert!(!registry.has_rule(CommandKind::InsertPivot, CommandKind::InsertOdooList));
    }

    #[test]
    fn filter_inverses() {
        let (_, inverses) = default_registries();
        let filter = GlobalFilter::new("f1", "Owner", FilterKind::Relation);
        let add = Command::AddGlobalFilter { filter };
        assert_eq!(
            inverses.inverses(&add),
            vec![Command::RemoveGlobalFilter { id: "f1".to_string() }]
        );

        let remove = Command::RemoveGlobalFilter { id: "f1".to_string() };
        assert_eq!(
            inverses.inverses(&remove),
            vec![Command::AddGlobalFilter {
                filter: GlobalFilter::placeholder("f1")
            }]
        );
        assert_eq!(inverses.inverses(&edit("f1")), vec![edit("f1")]);
    }
}
