// Query log stage: one line per query, written before the query runs.
use std::io::{self, Write};
use std::sync::Mutex;

use crate::core::error::{Error, ErrorKind};

pub struct QueryLog {
    sink: Mutex<Box<dyn Write + Send>>,
}

impl QueryLog {
    pub fn stdout() -> Self {
        Self::to_writer(io::stdout())
    }

    pub fn to_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            sink: Mutex::new(Box::new(writer)),
        }
    }

    /// Writes `Executing query: <query>` and flushes.
    pub fn record(&self, query: &str) -> Result<(), Error> {
        tracing::info!(query, "executing query");
        let mut sink = self
            .sink
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        writeln!(sink, "Executing query: {query}")
            .and_then(|()| sink.flush())
            .map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to write query log")
                    .with_source(err)
            })
    }
}

impl std::fmt::Debug for QueryLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryLog").finish_non_exhaustive()
    }
}
