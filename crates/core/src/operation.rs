//! The begin / step-sequence / commit-or-rollback skeleton behind every
//! composite administrative change.

use std::fmt;

use crate::connection::{Connection, Transaction};
use crate::error::OperationError;

/// Run an ordered list of `(step tag, sql)` pairs inside one
/// transaction. The first failing step rolls the whole transaction back
/// (via the guard's drop) and is named in the returned error, so no
/// step's effect is observable unless every step committed.
///
/// The server transaction here has no savepoints: a caller that wants
/// to retry must restart the whole operation, never just the failed
/// step.
pub fn run_steps<S>(
    conn: &mut dyn Connection,
    steps: Vec<(S, String)>,
) -> Result<(), OperationError<S>>
where
    S: Copy + fmt::Debug,
{
    if steps.is_empty() {
        return Ok(());
    }

    let mut tx = Transaction::begin(conn)
        .map_err(|source| OperationError::Transaction { source })?;
    for (step, sql) in steps {
        if let Err(source) = tx.execute(&sql) {
            drop(tx);
            return Err(OperationError::Step { step, source });
        }
    }
    tx.commit()
        .map_err(|source| OperationError::Transaction { source })
}
