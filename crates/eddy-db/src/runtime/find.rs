//! Find (select) store query runtime.

use eddy_core::event::Row;
use eddy_core::schema::{Attribute, EventType};

use super::{RuntimeBinding, StoreQueryKind, StoreQueryRuntime};
use crate::error::StoreQueryError;

/// Runtime of a `from <table> select ...` store query.
///
/// After the selector has processed the request, every event left in the
/// chunk becomes one result row built from its output data.
#[derive(Debug)]
pub struct FindStoreQueryRuntime {
    binding: RuntimeBinding,
}

impl FindStoreQueryRuntime {
    pub(crate) fn new(binding: RuntimeBinding) -> Self {
        Self { binding }
    }
}

impl StoreQueryRuntime for FindStoreQueryRuntime {
    fn query_name(&self) -> &str {
        self.binding.query_name()
    }

    fn kind(&self) -> StoreQueryKind {
        StoreQueryKind::Find
    }

    fn event_type(&self) -> EventType {
        self.binding.event_type()
    }

    fn execute(&self) -> Result<Vec<Row>, StoreQueryError> {
        self.binding
            .execute(self.kind(), |chunk| chunk.iter().map(Row::from).collect())
    }

    fn reset(&self) -> Result<(), StoreQueryError> {
        self.binding.reset()
    }

    fn store_query_output_attributes(&self) -> Vec<Attribute> {
        self.binding.output_attributes()
    }
}
