//! Scoped transaction handling.

use tracing::warn;

use crate::error::ReturnResult;
use crate::ports::{ReturnRepository, ReturnTransaction};
use crate::response::ReturnResponse;

/// Run `operation` inside one repository transaction.
///
/// A `Success` response commits. A `Failure` response or any error rolls the
/// transaction back; the response or the original error is returned as is.
pub fn handle_transaction<F>(
    repository: &dyn ReturnRepository,
    operation: F,
) -> ReturnResult<ReturnResponse>
where
    F: FnOnce(&mut dyn ReturnTransaction) -> ReturnResult<ReturnResponse>,
{
    let mut tx = repository.begin()?;

    match operation(tx.as_mut()) {
        Ok(response) if response.is_successful() => {
            tx.commit()?;
            Ok(response)
        }
        Ok(response) => {
            warn!(messages = ?response.messages(), "rolling back failed return operation");
            tx.rollback()?;
            Ok(response)
        }
        Err(err) => {
            warn!(error = %err, "rolling back return operation after error");
            if let Err(rollback_err) = tx.rollback() {
                warn!(error = %rollback_err, "rollback failed");
            }
            Err(err)
        }
    }
}
