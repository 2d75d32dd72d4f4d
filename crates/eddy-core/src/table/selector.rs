//! Selector stage that applies a table action per submitted event.

use std::sync::Arc;

use super::{Condition, InMemoryTable};
use crate::chunk::EventChunk;
use crate::event::{AttributeValue, ComplexEventType, StateEvent};
use crate::selector::{ProcessError, QuerySelector};

/// Table operation triggered by each event of a chunk.
#[derive(Debug, Clone, PartialEq)]
pub enum TableAction {
    /// Insert a row.
    Insert {
        /// Row values.
        values: Vec<AttributeValue>,
    },
    /// Delete matching rows.
    Delete {
        /// Rows to delete.
        condition: Condition,
    },
    /// Update matching rows.
    Update {
        /// Rows to update.
        condition: Condition,
        /// `(column, value)` assignments.
        set: Vec<(usize, AttributeValue)>,
    },
    /// Update matching rows or insert when none match.
    UpdateOrInsert {
        /// Rows to update.
        condition: Condition,
        /// `(column, value)` assignments.
        set: Vec<(usize, AttributeValue)>,
        /// Row inserted when nothing matches.
        values: Vec<AttributeValue>,
    },
    /// Replace the chunk with one event per matching row.
    Find {
        /// Rows to return.
        condition: Condition,
    },
}

/// Applies one [`TableAction`] against an [`InMemoryTable`].
///
/// Reset events are accepted and skipped: tables keep no transient state.
/// Timer and expired events are skipped too.
#[derive(Debug)]
pub struct TableSelector {
    table: Arc<InMemoryTable>,
    action: TableAction,
}

impl TableSelector {
    /// Creates a selector over `table`.
    #[must_use]
    pub fn new(table: Arc<InMemoryTable>, action: TableAction) -> Self {
        Self { table, action }
    }

    /// Table the selector writes to.
    #[must_use]
    pub fn table(&self) -> &Arc<InMemoryTable> {
        &self.table
    }

    fn apply(&self, request: &StateEvent) -> Result<Option<Vec<StateEvent>>, ProcessError> {
        let table = &self.table;
        match &self.action {
            TableAction::Insert { values } => {
                table.insert(values.clone())?;
                tracing::trace!(table = table.name(), "inserted row");
            }
            TableAction::Delete { condition } => {
                let deleted = table.delete(condition);
                tracing::trace!(table = table.name(), deleted, "deleted rows");
            }
            TableAction::Update { condition, set } => {
                let updated = table.update(condition, set)?;
                tracing::trace!(table = table.name(), updated, "updated rows");
            }
            TableAction::UpdateOrInsert {
                condition,
                set,
                values,
            } => {
                let affected = table.update_or_insert(condition, set, values.clone())?;
                tracing::trace!(table = table.name(), affected, "upserted rows");
            }
            TableAction::Find { condition } => {
                let found = table
                    .find(condition)
                    .into_iter()
                    .map(|row| {
                        let mut event = StateEvent::new(1, 0);
                        event.set_timestamp(request.timestamp());
                        event.set_output_data(row);
                        event
                    })
                    .collect();
                return Ok(Some(found));
            }
        }
        Ok(None)
    }
}

impl QuerySelector for TableSelector {
    fn process(&self, chunk: &mut EventChunk) -> Result<(), ProcessError> {
        let mut results: Option<Vec<StateEvent>> = None;
        for event in chunk.iter() {
            if event.event_type() != ComplexEventType::Current {
                continue;
            }
            if let Some(found) = self.apply(event)? {
                results.get_or_insert_with(Vec::new).extend(found);
            }
        }
        if let Some(found) = results {
            chunk.clear();
            for event in found {
                chunk.add(event);
            }
        } else if matches!(self.action, TableAction::Find { .. }) {
            chunk.clear();
        }
        Ok(())
    }
}
