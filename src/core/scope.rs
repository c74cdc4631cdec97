// Scoped acquisition: one connection per call, closed on every exit path.
use crate::core::conn::{Connect, Connection};
use crate::core::error::{Error, ErrorKind};

/// Opens a connection, runs `f` with it, and closes it before returning.
///
/// A failure from `f` is returned after the connection is closed; if the close
/// fails too, the close error is logged and the original error is kept. If `f`
/// panics, the connection is closed while unwinding.
pub fn with_connection<C, T, F>(connector: &C, f: F) -> Result<T, Error>
where
    C: Connect,
    F: FnOnce(&mut C::Connection) -> Result<T, Error>,
{
    let mut guard = ScopeGuard::new(connector.connect()?);
    let Some(conn) = guard.conn.as_mut() else {
        return Err(Error::new(ErrorKind::Internal).with_message("connection released early"));
    };
    let result = f(conn);
    let closed = guard.release();
    match (result, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(close_err)) => Err(close_err),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(close_err)) => {
            tracing::warn!(error = %close_err, "close failed after query error");
            Err(err)
        }
    }
}

struct ScopeGuard<T: Connection> {
    conn: Option<T>,
}

impl<T: Connection> ScopeGuard<T> {
    fn new(conn: T) -> Self {
        Self { conn: Some(conn) }
    }

    fn release(&mut self) -> Result<(), Error> {
        match self.conn.take() {
            Some(conn) => conn.close(),
            None => Ok(()),
        }
    }
}

impl<T: Connection> Drop for ScopeGuard<T> {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            tracing::warn!(error = %err, "close failed while unwinding");
        }
    }
}
