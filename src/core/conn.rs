// Database boundary: connection traits and the SQLite implementation.
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use rusqlite::types::{ToSql, ToSqlOutput, ValueRef};
use rusqlite::{Batch, Statement};

use crate::core::error::{Error, ErrorKind};
use crate::core::row::{Rows, Value};

/// Per-row visitor used by [`Connection::for_each_row`].
pub type RowVisitor<'a> =
    dyn FnMut(&[String], Vec<Value>) -> Result<ControlFlow<()>, Error> + 'a;

/// Opens connections. Each call must return a fresh, unshared handle.
pub trait Connect {
    type Connection: Connection;

    fn connect(&self) -> Result<Self::Connection, Error>;

    /// Short label for diagnostics (a file path, a DSN without secrets).
    fn describe(&self) -> String;
}

/// An exclusively owned database handle.
pub trait Connection {
    /// Runs `sql` and feeds each row to `visit` until it breaks or rows run out.
    ///
    /// Returns the statement's column names, known even when no row comes back.
    fn for_each_row(
        &mut self,
        sql: &str,
        params: &[Value],
        visit: &mut RowVisitor<'_>,
    ) -> Result<Vec<String>, Error>;

    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<usize, Error>;

    fn close(self) -> Result<(), Error>
    where
        Self: Sized;

    /// Collects every row under the statement's column names.
    fn query(&mut self, sql: &str, params: &[Value]) -> Result<Rows, Error> {
        let mut collected = Vec::new();
        let columns = self.for_each_row(sql, params, &mut |_, values| {
            collected.push(values);
            Ok(ControlFlow::Continue(()))
        })?;
        Ok(Rows {
            columns,
            rows: collected,
        })
    }
}

#[derive(Clone, Debug)]
pub struct SqliteConnector {
    path: PathBuf,
}

impl SqliteConnector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Connect for SqliteConnector {
    type Connection = SqliteConnection;

    fn connect(&self) -> Result<SqliteConnection, Error> {
        let conn = rusqlite::Connection::open(&self.path).map_err(|err| {
            Error::new(ErrorKind::Connect)
                .with_message("failed to open database")
                .with_path(&self.path)
                .with_source(err)
        })?;
        tracing::debug!(path = %self.path.display(), "opened connection");
        Ok(SqliteConnection {
            conn,
            path: self.path.clone(),
        })
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[derive(Debug)]
pub struct SqliteConnection {
    conn: rusqlite::Connection,
    path: PathBuf,
}

impl SqliteConnection {
    /// Prepares `sql`, which must hold exactly one statement.
    ///
    /// Anything other than whitespace or comments after the first statement is
    /// rejected before the first statement runs.
    fn prepare_single(&self, sql: &str) -> Result<Statement<'_>, Error> {
        let mut batch = Batch::new(&self.conn, sql);
        let stmt = match batch.next() {
            Ok(Some(stmt)) => stmt,
            Ok(None) => {
                return Err(Error::new(ErrorKind::Query)
                    .with_message("empty query")
                    .with_query(sql)
                    .with_path(&self.path));
            }
            Err(err) => return Err(self.query_error(sql, err)),
        };
        match batch.next() {
            Ok(None) => Ok(stmt),
            Ok(Some(_)) | Err(_) => Err(Error::new(ErrorKind::Query)
                .with_message("only one statement can run at a time")
                .with_hint("Split the SQL text into separate queries.")
                .with_query(sql)
                .with_path(&self.path)),
        }
    }

    fn query_error(&self, sql: &str, err: rusqlite::Error) -> Error {
        Error::new(ErrorKind::Query)
            .with_message(err.to_string())
            .with_query(sql)
            .with_path(&self.path)
            .with_source(err)
    }
}

impl Connection for SqliteConnection {
    fn for_each_row(
        &mut self,
        sql: &str,
        params: &[Value],
        visit: &mut RowVisitor<'_>,
    ) -> Result<Vec<String>, Error> {
        let mut stmt = self.prepare_single(sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let mut rows = stmt
            .query(rusqlite::params_from_iter(params.iter()))
            .map_err(|err| self.query_error(sql, err))?;
        loop {
            let row = match rows.next() {
                Ok(Some(row)) => row,
                Ok(None) => break,
                Err(err) => return Err(self.query_error(sql, err)),
            };
            let mut values = Vec::with_capacity(columns.len());
            for index in 0..columns.len() {
                let cell = row
                    .get_ref(index)
                    .map_err(|err| self.query_error(sql, err))?;
                values.push(value_from_ref(cell));
            }
            if visit(&columns, values)?.is_break() {
                break;
            }
        }
        Ok(columns)
    }

    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<usize, Error> {
        let mut stmt = self.prepare_single(sql)?;
        stmt.execute(rusqlite::params_from_iter(params.iter()))
            .map_err(|err| self.query_error(sql, err))
    }

    fn close(self) -> Result<(), Error> {
        let path = self.path;
        self.conn.close().map_err(|(_conn, err)| {
            Error::new(ErrorKind::Connect)
                .with_message("failed to close database")
                .with_path(&path)
                .with_source(err)
        })?;
        tracing::debug!(path = %path.display(), "closed connection");
        Ok(())
    }
}

fn value_from_ref(cell: ValueRef<'_>) -> Value {
    match cell {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(value) => Value::Integer(value),
        ValueRef::Real(value) => Value::Real(value),
        ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Blob(bytes.to_vec()),
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let cell = match self {
            Value::Null => ValueRef::Null,
            Value::Integer(value) => ValueRef::Integer(*value),
            Value::Real(value) => ValueRef::Real(*value),
            Value::Text(value) => ValueRef::Text(value.as_bytes()),
            Value::Blob(value) => ValueRef::Blob(value),
        };
        Ok(ToSqlOutput::Borrowed(cell))
    }
}
