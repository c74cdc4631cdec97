//! Purpose: Hold top-level CLI command dispatch for `sqlscope`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Each command builds its own executor; caches never outlive one process.

use super::*;

pub(super) fn dispatch_command(command: Command, db_path: PathBuf) -> Result<RunOutcome, Error> {
    let connector = SqliteConnector::new(&db_path);
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "sqlscope", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Version => {
            emit_json(json!({
                "name": "sqlscope",
                "version": env!("CARGO_PKG_VERSION"),
            }));
            Ok(RunOutcome::ok())
        }
        Command::Query {
            sql,
            named,
            cache,
            repeat,
            log_queries,
        } => {
            let args = QueryArgs {
                positional: sql,
                named,
            };
            let query = args.resolve()?;
            let mut executor = QueryExecutor::new(connector);
            if cache {
                executor = executor.with_cache(Arc::new(QueryCache::new()));
            }
            if log_queries {
                executor = executor.with_log(Arc::new(QueryLog::stdout()));
            }
            for _ in 0..repeat.get() {
                let fetched = executor.fetch_all(query)?;
                if fetched.source == FetchSource::Cache {
                    emit_cache_notice(&executor);
                }
                emit_json(fetched_json(query, &fetched));
            }
            Ok(RunOutcome::ok())
        }
        Command::User { id } => {
            let executor = QueryExecutor::new(connector);
            let user = get_user_by_id(&executor, id)?;
            let value = user.as_ref().map(row_json).unwrap_or(Value::Null);
            emit_json(json!({ "user": value }));
            Ok(RunOutcome::ok())
        }
        Command::Seed { csv } => {
            let file = std::fs::File::open(&csv).map_err(|err| {
                let kind = match err.kind() {
                    io::ErrorKind::NotFound => ErrorKind::NotFound,
                    _ => ErrorKind::Io,
                };
                Error::new(kind)
                    .with_message("failed to open csv file")
                    .with_path(&csv)
                    .with_source(err)
            })?;
            let seeded = seed_user_data(&connector, io::BufReader::new(file))?;
            emit_json(json!({ "seeded": seeded, "db": display_db(&db_path) }));
            Ok(RunOutcome::ok())
        }
        Command::Batches { size, min_age } => {
            users_older_than(&connector, size, min_age, |user| {
                emit_json(row_json(&user));
                Ok(())
            })?;
            Ok(RunOutcome::ok())
        }
        Command::AvgAge => {
            let average = average_age(&connector)?;
            emit_json(json!({ "average_age": average }));
            Ok(RunOutcome::ok())
        }
    }
}

fn emit_cache_notice(executor: &QueryExecutor<SqliteConnector>) {
    let mut details = Map::new();
    if let Some(cache) = executor.cache() {
        let stats = cache.stats();
        details.insert("hits".to_string(), json!(stats.hits));
        details.insert("misses".to_string(), json!(stats.misses));
        details.insert("entries".to_string(), json!(stats.entries));
    }
    let notice = Notice {
        kind: "cache_hit".to_string(),
        time: notice_time_now().unwrap_or_default(),
        cmd: "query".to_string(),
        db: executor.connector().describe(),
        message: "Using cached result".to_string(),
        details,
    };
    emit_notice(&notice);
}
