//! In-memory table keyed by a primary-key column.
//!
//! A minimal table engine standing behind [`TableSelector`]. Rows are kept in
//! insertion order; the primary key column is unique. Conditions are either
//! "all rows" or equality on a single column.

mod selector;

pub use selector::{TableAction, TableSelector};

use parking_lot::RwLock;

use crate::event::AttributeValue;
use crate::schema::Attribute;

/// Errors from table operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TableError {
    /// Column name not present in the table definition.
    #[error("table '{table}' has no column '{column}'")]
    UnknownColumn {
        /// Table name.
        table: String,
        /// Missing column.
        column: String,
    },

    /// Column index past the table width.
    #[error("column index {index} out of range for table '{table}'")]
    ColumnOutOfRange {
        /// Table name.
        table: String,
        /// Offending index.
        index: usize,
    },

    /// Row width does not match the table definition.
    #[error("table '{table}' expects {expected} values, got {actual}")]
    ArityMismatch {
        /// Table name.
        table: String,
        /// Column count.
        expected: usize,
        /// Supplied value count.
        actual: usize,
    },

    /// Insert would duplicate a primary key.
    #[error("duplicate primary key {key:?} in table '{table}'")]
    DuplicateKey {
        /// Table name.
        table: String,
        /// Conflicting key.
        key: AttributeValue,
    },
}

/// Row predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Matches every row.
    All,
    /// Matches rows whose column equals the value.
    Equals {
        /// Column index.
        column: usize,
        /// Value to compare with.
        value: AttributeValue,
    },
}

impl Condition {
    /// Equality on `column`.
    #[must_use]
    pub fn equals(column: usize, value: impl Into<AttributeValue>) -> Self {
        Self::Equals {
            column,
            value: value.into(),
        }
    }

    fn matches(&self, row: &[AttributeValue]) -> bool {
        match self {
            Self::All => true,
            Self::Equals { column, value } => row.get(*column) == Some(value),
        }
    }
}

/// Thread-safe in-memory table.
#[derive(Debug)]
pub struct InMemoryTable {
    name: String,
    attributes: Vec<Attribute>,
    pk_index: usize,
    rows: RwLock<Vec<Vec<AttributeValue>>>,
}

impl InMemoryTable {
    /// Creates an empty table.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::UnknownColumn`] if `primary_key` is not one of
    /// `attributes`.
    pub fn new(
        name: impl Into<String>,
        attributes: Vec<Attribute>,
        primary_key: &str,
    ) -> Result<Self, TableError> {
        let name = name.into();
        let pk_index = attributes
            .iter()
            .position(|a| a.name() == primary_key)
            .ok_or_else(|| TableError::UnknownColumn {
                table: name.clone(),
                column: primary_key.to_string(),
            })?;
        Ok(Self {
            name,
            attributes,
            pk_index,
            rows: RwLock::new(Vec::new()),
        })
    }

    /// Table name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Column definitions.
    #[must_use]
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Index of a column by name.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::UnknownColumn`] if there is no such column.
    pub fn column_index(&self, column: &str) -> Result<usize, TableError> {
        self.attributes
            .iter()
            .position(|a| a.name() == column)
            .ok_or_else(|| TableError::UnknownColumn {
                table: self.name.clone(),
                column: column.to_string(),
            })
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    /// Returns `true` if the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    /// Inserts a row.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::ArityMismatch`] for a row of the wrong width and
    /// [`TableError::DuplicateKey`] if the primary key is taken.
    pub fn insert(&self, row: Vec<AttributeValue>) -> Result<(), TableError> {
        self.check_arity(&row)?;
        let mut rows = self.rows.write();
        let key = &row[self.pk_index];
        if rows.iter().any(|r| &r[self.pk_index] == key) {
            return Err(TableError::DuplicateKey {
                table: self.name.clone(),
                key: key.clone(),
            });
        }
        rows.push(row);
        Ok(())
    }

    /// Deletes matching rows, returning how many were removed.
    pub fn delete(&self, condition: &Condition) -> usize {
        let mut rows = self.rows.write();
        let before = rows.len();
        rows.retain(|row| !condition.matches(row));
        before - rows.len()
    }

    /// Applies `set` to matching rows, returning how many were updated.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::ColumnOutOfRange`] if `set` names a column past
    /// the table width and [`TableError::DuplicateKey`] if `set` would give
    /// two rows the same primary key. No row is modified in either case.
    pub fn update(
        &self,
        condition: &Condition,
        set: &[(usize, AttributeValue)],
    ) -> Result<usize, TableError> {
        self.check_columns(set)?;
        let mut rows = self.rows.write();
        self.apply_set(&mut rows, condition, set)
    }

    /// Updates matching rows, or inserts `row` when nothing matches.
    ///
    /// Returns the number of rows updated, or 1 after an insert.
    ///
    /// # Errors
    ///
    /// Propagates the errors of [`update`](Self::update) and
    /// [`insert`](Self::insert).
    pub fn update_or_insert(
        &self,
        condition: &Condition,
        set: &[(usize, AttributeValue)],
        row: Vec<AttributeValue>,
    ) -> Result<usize, TableError> {
        self.check_columns(set)?;
        self.check_arity(&row)?;
        let mut rows = self.rows.write();
        let updated = self.apply_set(&mut rows, condition, set)?;
        if updated > 0 {
            return Ok(updated);
        }
        let key = &row[self.pk_index];
        if rows.iter().any(|r| &r[self.pk_index] == key) {
            return Err(TableError::DuplicateKey {
                table: self.name.clone(),
                key: key.clone(),
            });
        }
        rows.push(row);
        Ok(1)
    }

    /// Returns copies of the matching rows in insertion order.
    #[must_use]
    pub fn find(&self, condition: &Condition) -> Vec<Vec<AttributeValue>> {
        self.rows
            .read()
            .iter()
            .filter(|row| condition.matches(row))
            .cloned()
            .collect()
    }

    fn apply_set(
        &self,
        rows: &mut [Vec<AttributeValue>],
        condition: &Condition,
        set: &[(usize, AttributeValue)],
    ) -> Result<usize, TableError> {
        self.check_key_change(rows, condition, set)?;
        let mut updated = 0;
        for row in rows.iter_mut().filter(|row| condition.matches(row)) {
            for (column, value) in set {
                row[*column] = value.clone();
            }
            updated += 1;
        }
        Ok(updated)
    }

    /// A primary-key assignment must leave exactly one row holding the key.
    fn check_key_change(
        &self,
        rows: &[Vec<AttributeValue>],
        condition: &Condition,
        set: &[(usize, AttributeValue)],
    ) -> Result<(), TableError> {
        let Some((_, key)) = set.iter().rev().find(|(column, _)| *column == self.pk_index) else {
            return Ok(());
        };
        let (matched, others): (Vec<_>, Vec<_>) =
            rows.iter().partition(|row| condition.matches(row));
        let conflict = matched.len() > 1
            || (!matched.is_empty() && others.iter().any(|row| &row[self.pk_index] == key));
        if conflict {
            return Err(TableError::DuplicateKey {
                table: self.name.clone(),
                key: key.clone(),
            });
        }
        Ok(())
    }

    fn check_arity(&self, row: &[AttributeValue]) -> Result<(), TableError> {
        if row.len() == self.attributes.len() {
            Ok(())
        } else {
            Err(TableError::ArityMismatch {
                table: self.name.clone(),
                expected: self.attributes.len(),
                actual: row.len(),
            })
        }
    }

    fn check_columns(&self, set: &[(usize, AttributeValue)]) -> Result<(), TableError> {
        match set.iter().find(|(column, _)| *column >= self.attributes.len()) {
            Some((index, _)) => Err(TableError::ColumnOutOfRange {
                table: self.name.clone(),
                index: *index,
            }),
            None => Ok(()),
        }
    }
}
