//! Purpose: Define the public Rust API boundary for sqlscope.
//! Exports: The executor pipeline, user operations, and the core types they use.
//! Role: Stable surface for the CLI and library callers.
//! Invariants: Callers own their caches and logs; nothing here is process-global.

mod executor;
mod users;

pub use crate::core::args::QueryArgs;
pub use crate::core::cache::{CacheStats, FetchSource, QueryCache};
pub use crate::core::conn::{Connect, Connection, RowVisitor, SqliteConnection, SqliteConnector};
#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::log::QueryLog;
pub use crate::core::row::{Row, Rows, Value};
pub use crate::core::scope::with_connection;
pub use crate::core::stream::{average_of, stream_in_batches};
pub use executor::{Fetched, QueryExecutor};
pub use users::{
    ALL_USER_DATA, USER_AGES, USER_BY_ID, average_age, get_user_by_id, seed_user_data,
    users_older_than,
};
