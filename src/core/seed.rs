// CSV seeding for the `user_data` table.
use std::io::Read;

use serde::Deserialize;

use crate::core::conn::Connection;
use crate::core::error::{Error, ErrorKind};
use crate::core::row::Value;

pub const USER_TABLE_DDL: &str = "CREATE TABLE IF NOT EXISTS user_data (
    user_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    email TEXT NOT NULL,
    age INTEGER NOT NULL
)";

const INSERT_USER: &str =
    "INSERT OR REPLACE INTO user_data (user_id, name, email, age) VALUES (?1, ?2, ?3, ?4)";

#[derive(Debug, Deserialize)]
struct UserRecord {
    name: String,
    email: String,
    age: u32,
}

pub fn create_user_table<C: Connection>(conn: &mut C) -> Result<(), Error> {
    conn.execute(USER_TABLE_DDL, &[])?;
    Ok(())
}

/// Inserts every `name,email,age` record from `reader` in one transaction.
///
/// Each row gets a fresh UUID v4 `user_id`. A malformed record rolls the whole
/// batch back. Returns the number of rows inserted.
pub fn seed_users<C: Connection, R: Read>(conn: &mut C, reader: R) -> Result<usize, Error> {
    conn.execute("BEGIN", &[])?;
    let outcome = insert_records(conn, reader).and_then(|count| {
        conn.execute("COMMIT", &[])?;
        Ok(count)
    });
    match outcome {
        Ok(count) => {
            tracing::debug!(count, "seeded user_data");
            Ok(count)
        }
        Err(err) => {
            if let Err(rollback_err) = conn.execute("ROLLBACK", &[]) {
                tracing::warn!(error = %rollback_err, "rollback failed after seed error");
            }
            Err(err)
        }
    }
}

fn insert_records<C: Connection, R: Read>(conn: &mut C, reader: R) -> Result<usize, Error> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut count = 0;
    for result in csv_reader.deserialize() {
        let record: UserRecord = result.map_err(csv_error)?;
        let params = [
            Value::Text(uuid::Uuid::new_v4().to_string()),
            Value::Text(record.name),
            Value::Text(record.email),
            Value::Integer(i64::from(record.age)),
        ];
        conn.execute(INSERT_USER, &params)?;
        count += 1;
    }
    Ok(count)
}

fn csv_error(err: csv::Error) -> Error {
    let message = match err.position() {
        Some(position) => format!("invalid user record on line {}", position.line()),
        None => "invalid user record".to_string(),
    };
    Error::new(ErrorKind::Usage)
        .with_message(message)
        .with_hint("Expected CSV columns: name,email,age (age as a whole number).")
        .with_source(err)
}
