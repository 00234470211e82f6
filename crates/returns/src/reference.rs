//! Store-scoped return references.

use std::sync::Arc;

use crate::config::ReturnsConfig;
use crate::error::ReturnResult;
use crate::model::Return;
use crate::ports::ReturnTransaction;

#[derive(Debug, Clone)]
pub struct ReturnReferenceGenerator {
    config: Arc<ReturnsConfig>,
}

impl ReturnReferenceGenerator {
    pub fn new(config: Arc<ReturnsConfig>) -> Self {
        Self { config }
    }

    /// Allocate the next reference of the return's store, e.g. `DE-R7`.
    ///
    /// The sequence lives in storage, so two transactions never receive the
    /// same value. Values consumed by rolled back transactions are lost.
    pub fn generate_return_reference(
        &self,
        tx: &mut dyn ReturnTransaction,
        sales_return: &Return,
    ) -> ReturnResult<String> {
        let sequence = tx.next_reference_sequence(&sales_return.store)?;
        Ok(format_reference(
            sales_return.store.as_str(),
            &self.config.reference_prefix,
            sequence,
        ))
    }
}

fn format_reference(store: &str, prefix: &str, sequence: u64) -> String {
    format!("{store}-{prefix}{sequence}")
}
