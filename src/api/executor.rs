//! Purpose: Compose logging, caching, and connection scoping into one executor.
//! Exports: `QueryExecutor`, `Fetched`.
//! Role: The explicit pipeline callers use instead of stacking wrappers by hand.
//! Invariants: Stage order is fixed: log, then cache, then connection scope, then execute.
//! Invariants: A cache hit never opens a connection.
#![allow(clippy::result_large_err)]

use std::ops::ControlFlow;
use std::sync::Arc;

use crate::core::cache::{FetchSource, QueryCache};
use crate::core::conn::{Connect, Connection};
use crate::core::error::Error;
use crate::core::log::QueryLog;
use crate::core::row::{Row, Rows, Value};
use crate::core::scope::with_connection;

/// Rows from [`QueryExecutor::fetch_all`] and where they came from.
#[derive(Clone, Debug, PartialEq)]
pub struct Fetched {
    pub rows: Arc<Rows>,
    pub source: FetchSource,
}

#[derive(Debug)]
pub struct QueryExecutor<C: Connect> {
    connector: C,
    cache: Option<Arc<QueryCache>>,
    log: Option<Arc<QueryLog>>,
}

impl<C: Connect> QueryExecutor<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            cache: None,
            log: None,
        }
    }

    pub fn with_cache(mut self, cache: Arc<QueryCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_log(mut self, log: Arc<QueryLog>) -> Self {
        self.log = Some(log);
        self
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn cache(&self) -> Option<&Arc<QueryCache>> {
        self.cache.as_ref()
    }

    /// Fetches every row of `query`, serving repeats from the cache when one is set.
    pub fn fetch_all(&self, query: &str) -> Result<Fetched, Error> {
        self.log_stage(query)?;
        let fetch = || with_connection(&self.connector, |conn| conn.query(query, &[]));
        match &self.cache {
            Some(cache) => {
                let (rows, source) = cache.get_or_fetch(query, fetch)?;
                Ok(Fetched { rows, source })
            }
            None => Ok(Fetched {
                rows: Arc::new(fetch()?),
                source: FetchSource::Database,
            }),
        }
    }

    /// First row of a parameterized query, or `None`. Never cached.
    pub fn fetch_one(&self, sql: &str, params: &[Value]) -> Result<Option<Row>, Error> {
        self.log_stage(sql)?;
        with_connection(&self.connector, |conn| {
            let mut found = None;
            conn.for_each_row(sql, params, &mut |columns, values| {
                found = Some(Row {
                    columns: columns.to_vec(),
                    values,
                });
                Ok(ControlFlow::Break(()))
            })?;
            Ok(found)
        })
    }

    /// Runs a statement for its affected-row count. Never cached.
    pub fn execute(&self, sql: &str, params: &[Value]) -> Result<usize, Error> {
        self.log_stage(sql)?;
        with_connection(&self.connector, |conn| conn.execute(sql, params))
    }

    /// Runs `f` with a connection scoped to this call.
    pub fn scoped<T, F>(&self, f: F) -> Result<T, Error>
    where
        F: FnOnce(&mut C::Connection) -> Result<T, Error>,
    {
        with_connection(&self.connector, f)
    }

    fn log_stage(&self, query: &str) -> Result<(), Error> {
        match &self.log {
            Some(log) => log.record(query),
            None => Ok(()),
        }
    }
}
