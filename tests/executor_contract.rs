// Executor contract tests against a real SQLite file.
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use sqlscope::api::{
    Connect, Connection, Error, ErrorKind, FetchSource, QueryCache, QueryExecutor, QueryLog,
    RowVisitor, SqliteConnection, SqliteConnector, Value, get_user_by_id,
};

/// Wraps the SQLite connector and counts opens, statements, and closes.
struct Tracked {
    inner: SqliteConnector,
    opens: Arc<AtomicUsize>,
    statements: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

struct TrackedConnection {
    inner: SqliteConnection,
    statements: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

impl Tracked {
    fn new(inner: SqliteConnector) -> Self {
        Self {
            inner,
            opens: Arc::default(),
            statements: Arc::default(),
            closes: Arc::default(),
        }
    }
}

impl Connect for Tracked {
    type Connection = TrackedConnection;

    fn connect(&self) -> Result<TrackedConnection, Error> {
        let inner = self.inner.connect()?;
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(TrackedConnection {
            inner,
            statements: Arc::clone(&self.statements),
            closes: Arc::clone(&self.closes),
        })
    }

    fn describe(&self) -> String {
        self.inner.describe()
    }
}

impl Connection for TrackedConnection {
    fn for_each_row(
        &mut self,
        sql: &str,
        params: &[Value],
        visit: &mut RowVisitor<'_>,
    ) -> Result<Vec<String>, Error> {
        self.statements.fetch_add(1, Ordering::SeqCst);
        self.inner.for_each_row(sql, params, visit)
    }

    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<usize, Error> {
        self.statements.fetch_add(1, Ordering::SeqCst);
        self.inner.execute(sql, params)
    }

    fn close(self) -> Result<(), Error> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.inner.close()
    }
}

fn users_db() -> (tempfile::TempDir, SqliteConnector) {
    let temp = tempfile::tempdir().expect("tempdir");
    let connector = SqliteConnector::new(temp.path().join("users.db"));
    let mut conn = connector.connect().expect("connect");
    conn.execute(
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL)",
        &[],
    )
    .expect("create");
    for (id, name) in [(1, "ada"), (2, "alan")] {
        conn.execute(
            "INSERT INTO users (id, name) VALUES (?1, ?2)",
            &[Value::Integer(id), Value::from(name)],
        )
        .expect("insert");
    }
    conn.close().expect("close");
    (temp, connector)
}

#[test]
fn caching_select_all_users_skips_second_round_trip() {
    let (_temp, connector) = users_db();
    let executor =
        QueryExecutor::new(Tracked::new(connector)).with_cache(Arc::new(QueryCache::new()));

    let first = executor.fetch_all("SELECT * FROM users").expect("first");
    let second = executor.fetch_all("SELECT * FROM users").expect("second");

    assert_eq!(first.source, FetchSource::Database);
    assert_eq!(second.source, FetchSource::Cache);
    assert_eq!(first.rows, second.rows);
    assert_eq!(first.rows.len(), 2);
    let tracked = executor.connector();
    assert_eq!(tracked.opens.load(Ordering::SeqCst), 1);
    assert_eq!(tracked.statements.load(Ordering::SeqCst), 1);
    assert_eq!(tracked.closes.load(Ordering::SeqCst), 1);
}

#[test]
fn get_user_by_id_returns_one_row_or_none() {
    let (_temp, connector) = users_db();
    let executor = QueryExecutor::new(Tracked::new(connector));

    let user = get_user_by_id(&executor, 1).expect("query").expect("row");
    assert_eq!(user.get("name"), Some(&Value::from("ada")));

    let missing = get_user_by_id(&executor, 42).expect("query");
    assert!(missing.is_none());
    assert_eq!(executor.connector().closes.load(Ordering::SeqCst), 2);
}

#[test]
fn get_user_by_id_closes_when_table_is_missing() {
    let temp = tempfile::tempdir().expect("tempdir");
    let connector = SqliteConnector::new(temp.path().join("empty.db"));
    let executor = QueryExecutor::new(Tracked::new(connector));

    let err = get_user_by_id(&executor, 1).expect_err("err");
    assert_eq!(err.kind(), ErrorKind::Query);
    assert_eq!(executor.connector().opens.load(Ordering::SeqCst), 1);
    assert_eq!(executor.connector().closes.load(Ordering::SeqCst), 1);
}

#[test]
fn scoped_closure_failure_still_closes() {
    let (_temp, connector) = users_db();
    let executor = QueryExecutor::new(Tracked::new(connector));

    let err = executor
        .scoped(|conn| {
            conn.execute("UPDATE users SET name = 'x' WHERE id = 1", &[])?;
            Err::<(), _>(Error::new(ErrorKind::Internal).with_message("caller bailed"))
        })
        .expect_err("err");
    assert_eq!(err.message(), Some("caller bailed"));
    assert_eq!(executor.connector().closes.load(Ordering::SeqCst), 1);
}

#[test]
fn logging_stage_writes_before_rows() {
    let (temp, connector) = users_db();
    let path = temp.path().join("query.log");
    let file = std::fs::File::create(&path).expect("log file");
    let executor =
        QueryExecutor::new(connector).with_log(Arc::new(QueryLog::to_writer(file)));

    let fetched = executor.fetch_all("SELECT * FROM users").expect("rows");
    assert_eq!(fetched.rows.len(), 2);

    let logged = std::fs::read_to_string(&path).expect("read log");
    assert_eq!(logged, "Executing query: SELECT * FROM users\n");
}

#[test]
fn execute_reports_affected_rows() {
    let (_temp, connector) = users_db();
    let executor = QueryExecutor::new(connector);
    let changed = executor
        .execute("UPDATE users SET name = upper(name)", &[])
        .expect("update");
    assert_eq!(changed, 2);
}

#[test]
fn wrapped_connection_keeps_columns_of_empty_result() {
    let (_temp, connector) = users_db();
    let executor = QueryExecutor::new(Tracked::new(connector));
    let fetched = executor
        .fetch_all("SELECT id, name FROM users WHERE id > 100")
        .expect("rows");
    assert!(fetched.rows.is_empty());
    assert_eq!(fetched.rows.columns, vec!["id", "name"]);
}
