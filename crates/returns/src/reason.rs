//! Return reason lookups.

use std::sync::Arc;

use crate::error::ReturnResult;
use crate::model::ReturnReason;
use crate::ports::ReturnRepository;
use crate::request::ReturnReasonFilter;

pub struct ReturnReasonReader {
    repository: Arc<dyn ReturnRepository>,
}

impl ReturnReasonReader {
    pub fn new(repository: Arc<dyn ReturnRepository>) -> Self {
        Self { repository }
    }

    pub fn get_return_reasons(&self, filter: &ReturnReasonFilter) -> ReturnResult<Vec<ReturnReason>> {
        let snapshot = self.repository.snapshot()?;
        Ok(snapshot.find_return_reasons(filter)?)
    }
}

impl core::fmt::Debug for ReturnReasonReader {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ReturnReasonReader").finish_non_exhaustive()
    }
}
