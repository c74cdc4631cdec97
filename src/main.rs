//! Purpose: `sqlscope` CLI entry point.
//! Role: Binary crate root; parses args, installs logging, runs commands, emits JSON on stdout.
//! Invariants: Commands emit one JSON value per line on stdout when stdout is not a terminal.
//! Invariants: Errors go to stderr (JSON when stderr is not a terminal).
//! Invariants: Process exit code is derived from `api::to_exit_code`.
#![allow(clippy::result_large_err)]
use std::io::{self, IsTerminal};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::{CommandFactory, Parser, Subcommand, ValueHint, error::ErrorKind as ClapErrorKind};
use clap_complete::aot::Shell;
use serde_json::{Map, Value, json};
use std::error::Error as StdError;
use tracing_subscriber::EnvFilter;

mod command_dispatch;
mod rows_json;

use rows_json::{fetched_json, row_json};
use sqlscope::api::{
    Connect, Error, ErrorKind, FetchSource, QueryArgs, QueryCache, QueryExecutor, QueryLog,
    SqliteConnector, average_age, get_user_by_id, seed_user_data, to_exit_code,
    users_older_than,
};
use sqlscope::config::{resolve_db_path, resolve_log_filter};
use sqlscope::notice::{Notice, notice_json};

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, Error> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    Error::new(ErrorKind::Io)
                        .with_message("failed to write help")
                        .with_source(io_err)
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message(clap_error_summary(&err))
                    .with_hint("Try `sqlscope --help`."));
            }
        },
    };

    init_tracing(resolve_log_filter(cli.log_level));
    let db_path = resolve_db_path(cli.db);

    command_dispatch::dispatch_command(cli.command, db_path)
        .map_err(add_query_hint)
        .map_err(add_io_hint)
}

#[derive(Parser)]
#[command(
    name = "sqlscope",
    version,
    about = "Run SQL with scoped connections and an in-process result cache",
    long_about = None,
    after_help = r#"EXAMPLES
  $ sqlscope seed users.csv
  $ sqlscope query "SELECT * FROM user_data" --cache --repeat 2
  $ sqlscope --db app.db user 1
  $ sqlscope batches --size 50 --min-age 25
  $ sqlscope avg-age"#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        help = "SQLite database file (default: $SQLSCOPE_DB, then ./users.db)",
        value_hint = ValueHint::FilePath
    )]
    db: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        help = "Log filter for stderr diagnostics, e.g. debug (default: $SQLSCOPE_LOG, then warn)"
    )]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(
        about = "Run a query and print its rows",
        after_help = r#"EXAMPLES
  $ sqlscope query "SELECT * FROM users"
  $ sqlscope query --query "SELECT * FROM users" --log-queries
  $ sqlscope query "SELECT * FROM users" --cache --repeat 3"#
    )]
    Query {
        #[arg(help = "SQL text to run")]
        sql: Option<String>,
        #[arg(long = "query", value_name = "SQL", help = "SQL text to run (named form)")]
        named: Option<String>,
        #[arg(long, help = "Serve repeats of the same query text from an in-process cache")]
        cache: bool,
        #[arg(
            long,
            default_value = "1",
            help = "Run the query this many times in one process"
        )]
        repeat: NonZeroUsize,
        #[arg(long, help = "Print `Executing query: <sql>` before each run")]
        log_queries: bool,
    },
    #[command(about = "Fetch one row from `users` by id")]
    User {
        #[arg(help = "User id")]
        id: i64,
    },
    #[command(about = "Create `user_data` and load users from a CSV file (name,email,age)")]
    Seed {
        #[arg(help = "CSV file with a name,email,age header", value_hint = ValueHint::FilePath)]
        csv: PathBuf,
    },
    #[command(about = "Stream `user_data` in batches and print users older than --min-age")]
    Batches {
        #[arg(long, default_value = "50", help = "Rows per batch")]
        size: NonZeroUsize,
        #[arg(long, default_value_t = 25, help = "Print users strictly older than this")]
        min_age: i64,
    },
    #[command(about = "Print the average age in `user_data`")]
    AvgAge,
    #[command(about = "Generate shell completions")]
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
    #[command(about = "Print version info as JSON")]
    Version,
}

fn init_tracing(filter: String) {
    let env_filter = EnvFilter::try_new(&filter).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn emit_json(value: Value) {
    let json = if io::stdout().is_terminal() {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    }
    .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string());
    println!("{json}");
}

fn emit_error(err: &Error) {
    if io::stderr().is_terminal() {
        eprintln!("{}", error_text(err));
        return;
    }

    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn emit_notice(notice: &Notice) {
    if io::stderr().is_terminal() {
        eprintln!("notice: {} (db: {})", notice.message, notice.db);
        return;
    }

    let value = notice_json(notice);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"notice\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn notice_time_now() -> Option<String> {
    use time::format_description::well_known::Rfc3339;
    let duration = SystemTime::now().duration_since(UNIX_EPOCH).ok()?;
    let ts = time::OffsetDateTime::from_unix_timestamp_nanos(duration.as_nanos() as i128).ok()?;
    ts.format(&Rfc3339).ok()
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::NotFound => "not found".to_string(),
        ErrorKind::Connect => "database connection failed".to_string(),
        ErrorKind::Query => "query failed".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
    }
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(query) = err.query() {
        inner.insert("query".to_string(), json!(query));
    }
    if let Some(path) = err.path() {
        inner.insert("path".to_string(), json!(path.display().to_string()));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error) -> String {
    let mut lines = vec![format!("error: {}", error_message(err))];
    if let Some(hint) = err.hint() {
        lines.push(format!("hint: {hint}"));
    }
    if let Some(query) = err.query() {
        lines.push(format!("query: {query}"));
    }
    if let Some(path) = err.path() {
        lines.push(format!("path: {}", path.display()));
    }
    lines.join("\n")
}

fn add_query_hint(err: Error) -> Error {
    if err.kind() != ErrorKind::Query || err.hint().is_some() {
        return err;
    }
    err.with_hint("Check the SQL text and that the tables it reads exist (see `sqlscope seed`).")
}

fn add_io_hint(err: Error) -> Error {
    if err.hint().is_some() {
        return err;
    }
    match err.kind() {
        ErrorKind::Connect => {
            err.with_hint("Could not open the database. Check --db and directory permissions.")
        }
        ErrorKind::Io => err.with_hint("I/O error. Check the path, filesystem, and disk space."),
        _ => err,
    }
}

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        return trimmed.to_string();
    }
    "invalid arguments".to_string()
}

fn display_db(path: &Path) -> String {
    path.display().to_string()
}
