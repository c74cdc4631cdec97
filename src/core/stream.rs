// Paginated row streaming inside a scoped connection.
use std::num::NonZeroUsize;
use std::ops::ControlFlow;

use crate::core::conn::{Connect, Connection};
use crate::core::error::{Error, ErrorKind};
use crate::core::row::{Rows, Value};
use crate::core::scope::with_connection;

/// Runs `sql` and hands its rows to `sink` in batches of at most `batch_size`.
///
/// The last batch may be short; an empty batch is never delivered. Returning
/// `ControlFlow::Break` from `sink` stops the stream. Returns the number of
/// batches delivered.
pub fn stream_in_batches<C, F>(
    connector: &C,
    sql: &str,
    params: &[Value],
    batch_size: NonZeroUsize,
    mut sink: F,
) -> Result<usize, Error>
where
    C: Connect,
    F: FnMut(Rows) -> Result<ControlFlow<()>, Error>,
{
    let size = batch_size.get();
    with_connection(connector, |conn| {
        let mut delivered = 0;
        let mut pending: Option<Rows> = None;
        let mut stopped = false;
        conn.for_each_row(sql, params, &mut |columns, values| {
            let batch = pending.get_or_insert_with(|| Rows::new(columns.to_vec()));
            batch.rows.push(values);
            if batch.rows.len() < size {
                return Ok(ControlFlow::Continue(()));
            }
            let full = pending.take().unwrap_or_default();
            delivered += 1;
            let flow = sink(full)?;
            stopped = flow.is_break();
            Ok(flow)
        })?;
        if !stopped {
            if let Some(rest) = pending.take().filter(|rows| !rows.is_empty()) {
                delivered += 1;
                let _ = sink(rest)?;
            }
        }
        Ok(delivered)
    })
}

/// Mean of the first column of `sql`, streamed one row at a time.
///
/// An empty result averages to `0.0`. NULL cells are skipped; any other
/// non-numeric cell is a query error.
pub fn average_of<C: Connect>(connector: &C, sql: &str) -> Result<f64, Error> {
    let mut total = 0.0;
    let mut count = 0u64;
    with_connection(connector, |conn| {
        conn.for_each_row(sql, &[], &mut |_, values| {
            let Some(cell) = values.first() else {
                return Err(Error::new(ErrorKind::Query)
                    .with_message("query returned no columns")
                    .with_query(sql));
            };
            if cell.is_null() {
                return Ok(ControlFlow::Continue(()));
            }
            let Some(value) = cell.as_f64() else {
                return Err(Error::new(ErrorKind::Query)
                    .with_message("first column is not numeric")
                    .with_query(sql));
            };
            total += value;
            count += 1;
            Ok(ControlFlow::Continue(()))
        })
    })?;
    if count == 0 {
        return Ok(0.0);
    }
    Ok(total / count as f64)
}
