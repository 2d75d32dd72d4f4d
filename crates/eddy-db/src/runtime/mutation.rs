//! Table mutation store query runtimes.
//!
//! Insert, delete, update and update-or-insert runtimes only differ in the
//! table operation their selector performs. None of them surfaces rows.

use eddy_core::event::Row;
use eddy_core::schema::{Attribute, EventType};

use super::{RuntimeBinding, StoreQueryKind, StoreQueryRuntime};
use crate::error::StoreQueryError;

macro_rules! mutation_runtime {
    ($(#[$meta:meta])* $name:ident => $kind:ident) => {
        $(#[$meta])*
        ///
        /// Always returns an empty sequence.
        #[derive(Debug)]
        pub struct $name {
            binding: RuntimeBinding,
        }

        impl $name {
            pub(crate) fn new(binding: RuntimeBinding) -> Self {
                Self { binding }
            }
        }

        impl StoreQueryRuntime for $name {
            fn query_name(&self) -> &str {
                self.binding.query_name()
            }

            fn kind(&self) -> StoreQueryKind {
                StoreQueryKind::$kind
            }

            fn event_type(&self) -> EventType {
                self.binding.event_type()
            }

            fn execute(&self) -> Result<Vec<Row>, StoreQueryError> {
                self.binding.execute(self.kind(), |_| Vec::new())
            }

            fn reset(&self) -> Result<(), StoreQueryError> {
                self.binding.reset()
            }

            fn store_query_output_attributes(&self) -> Vec<Attribute> {
                self.binding.output_attributes()
            }
        }
    };
}

mutation_runtime! {
    /// Runtime of an `insert into` store query. The selector inserts the
    /// projected row into the table.
    InsertStoreQueryRuntime => Insert
}

mutation_runtime! {
    /// Runtime of a `delete` store query. The selector performs the delete
    /// against the table, using the request event as predicate carrier.
    DeleteStoreQueryRuntime => Delete
}

mutation_runtime! {
    /// Runtime of an `update` store query.
    UpdateStoreQueryRuntime => Update
}

mutation_runtime! {
    /// Runtime of an `update or insert into` store query. The selector
    /// updates the matching table rows, inserting the projected row when
    /// none match.
    UpdateOrInsertStoreQueryRuntime => UpdateOrInsert
}
