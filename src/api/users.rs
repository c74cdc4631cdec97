//! Purpose: User-table operations built on the executor and streaming core.
//! Exports: `get_user_by_id`, `seed_user_data`, `users_older_than`, `average_age`.
//! Role: The concrete queries the CLI runs against `users` and `user_data`.
//! Invariants: Each operation scopes its own connection; none are cached.
#![allow(clippy::result_large_err)]

use std::io::Read;
use std::num::NonZeroUsize;
use std::ops::ControlFlow;

use crate::api::executor::QueryExecutor;
use crate::core::conn::Connect;
use crate::core::error::Error;
use crate::core::row::{Row, Value};
use crate::core::scope::with_connection;
use crate::core::seed::{create_user_table, seed_users};
use crate::core::stream::{average_of, stream_in_batches};

pub const USER_BY_ID: &str = "SELECT * FROM users WHERE id = ?";
pub const ALL_USER_DATA: &str = "SELECT * FROM user_data";
pub const USER_AGES: &str = "SELECT age FROM user_data";

pub fn get_user_by_id<C: Connect>(
    executor: &QueryExecutor<C>,
    user_id: i64,
) -> Result<Option<Row>, Error> {
    executor.fetch_one(USER_BY_ID, &[Value::Integer(user_id)])
}

/// Creates `user_data` if needed and loads CSV records into it.
pub fn seed_user_data<C: Connect, R: Read>(connector: &C, reader: R) -> Result<usize, Error> {
    with_connection(connector, |conn| {
        create_user_table(conn)?;
        seed_users(conn, reader)
    })
}

/// Streams `user_data` in batches and passes each user with `age > min_age` to `emit`.
pub fn users_older_than<C, F>(
    connector: &C,
    batch_size: NonZeroUsize,
    min_age: i64,
    mut emit: F,
) -> Result<usize, Error>
where
    C: Connect,
    F: FnMut(Row) -> Result<(), Error>,
{
    let mut matched = 0;
    stream_in_batches(connector, ALL_USER_DATA, &[], batch_size, |batch| {
        for user in batch.iter() {
            let older = user
                .get("age")
                .and_then(Value::as_f64)
                .is_some_and(|age| age > min_age as f64);
            if older {
                matched += 1;
                emit(user)?;
            }
        }
        Ok(ControlFlow::Continue(()))
    })?;
    Ok(matched)
}

pub fn average_age<C: Connect>(connector: &C) -> Result<f64, Error> {
    average_of(connector, USER_AGES)
}

#[cfg(test)]
mod tests {
    use super::{average_age, get_user_by_id, seed_user_data, users_older_than};
    use crate::api::executor::QueryExecutor;
    use crate::core::conn::SqliteConnector;
    use crate::core::error::ErrorKind;
    use crate::core::row::Value;
    use std::num::NonZeroUsize;

    const USERS_CSV: &str = "name,email,age\n\
        Ada,ada@example.com,36\n\
        Alan,alan@example.com,22\n\
        Grace,grace@example.com,45\n\
        Linus,linus@example.com,25\n";

    fn seeded() -> (tempfile::TempDir, SqliteConnector) {
        let temp = tempfile::tempdir().expect("tempdir");
        let connector = SqliteConnector::new(temp.path().join("users.db"));
        seed_user_data(&connector, USERS_CSV.as_bytes()).expect("seed");
        (temp, connector)
    }

    #[test]
    fn users_older_than_filters_across_batches() {
        let (_temp, connector) = seeded();
        let mut names = Vec::new();
        let matched = users_older_than(
            &connector,
            NonZeroUsize::new(2).expect("size"),
            25,
            |user| {
                let name = user.get("name").and_then(Value::as_str).unwrap_or_default();
                names.push(name.to_string());
                Ok(())
            },
        )
        .expect("stream");
        names.sort();
        assert_eq!(matched, 2);
        assert_eq!(names, vec!["Ada", "Grace"]);
    }

    #[test]
    fn average_age_of_seeded_users() {
        let (_temp, connector) = seeded();
        let avg = average_age(&connector).expect("avg");
        assert_eq!(avg, 32.0);
    }

    #[test]
    fn get_user_by_id_without_table_is_query_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let executor = QueryExecutor::new(SqliteConnector::new(temp.path().join("users.db")));
        let err = get_user_by_id(&executor, 1).expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Query);
    }
}
