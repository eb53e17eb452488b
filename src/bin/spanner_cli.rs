use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use spanner_adapter::prelude::*;
use spanner_adapter::{convert_date, format_now, get_auto_increment};
use tracing::Level;

#[derive(Parser, Debug)]
#[command(author, version, about = "Diagnostics for the Spanner adapter")]
struct Args {
    /// Read options from a JSON file instead of the environment.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    project: Option<String>,
    #[arg(long)]
    instance: Option<String>,
    #[arg(long)]
    database: Option<String>,
    /// Route to an emulator at `host:port`.
    #[arg(long)]
    emulator: Option<String>,
    #[arg(long)]
    max_sessions: Option<usize>,
    #[arg(long, short)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run SQL and print each row as a JSON line.
    Query {
        sql: String,
        /// Apply the MySQL-to-GoogleSQL rewrites first.
        #[arg(long)]
        sanitize: bool,
    },
    /// Print the sanitized form of SQL.
    Sanitize { sql: String },
    /// Wrap every reference to a column in a cast.
    Cast {
        sql: String,
        column: String,
        #[arg(default_value = "INT64")]
        ty: String,
    },
    /// Print a fresh uppercase UUID key.
    Uuid,
    /// Print the current time as a Spanner timestamp.
    Now,
    /// Normalize a date string to a Spanner timestamp.
    ConvertDate { input: String },
}

impl Args {
    fn options(&self) -> Result<SpannerOptions, SpannerDbError> {
        let mut opts = match &self.config {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    SpannerDbError::ConfigError(format!("{}: {e}", path.display()))
                })?;
                SpannerOptions::from_json_str(&raw)?
            }
            None => SpannerOptions::from_env()?,
        };
        if let Some(project) = &self.project {
            opts.project_id.clone_from(project);
        }
        if let Some(instance) = &self.instance {
            opts.instance_id.clone_from(instance);
        }
        if let Some(database) = &self.database {
            opts.database_id.clone_from(database);
        }
        if let Some(host) = &self.emulator {
            opts.use_emulator = true;
            opts.emulator_host.clone_from(host);
        }
        if let Some(max) = self.max_sessions {
            opts.max_sessions = max;
        }
        opts.validate()?;
        Ok(opts)
    }
}

async fn run_query(opts: SpannerOptions, sql: &str) -> Result<(), SpannerDbError> {
    let mut adapter = SpannerAdapter::rest(opts)?;
    let outcome = async {
        let mut result = adapter.query(sql).await?;
        let mut count = 0usize;
        while let Some(row) = result.next().await? {
            println!("{}", row.to_json());
            count += 1;
        }
        tracing::info!(rows = count, "query finished");
        Ok::<(), SpannerDbError>(())
    }
    .await;
    adapter.close_connection().await?;
    outcome
}

fn run(args: Args) -> Result<(), SpannerDbError> {
    match &args.command {
        Command::Query { sql, sanitize } => {
            let opts = args.options()?;
            let sql = if *sanitize {
                sanitize_sql(sql).into_owned()
            } else {
                sql.clone()
            };
            let rt = tokio::runtime::Runtime::new()
                .map_err(|e| SpannerDbError::Other(format!("failed to start runtime: {e}")))?;
            rt.block_on(run_query(opts, &sql))
        }
        Command::Sanitize { sql } => {
            println!("{}", sanitize_sql(sql));
            Ok(())
        }
        Command::Cast { sql, column, ty } => {
            println!("{}", add_cast(sql, column, ty));
            Ok(())
        }
        Command::Uuid => {
            println!("{}", get_auto_increment());
            Ok(())
        }
        Command::Now => {
            println!("{}", format_now());
            Ok(())
        }
        Command::ConvertDate { input } => {
            println!("{}", convert_date(input)?);
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::WARN })
        .init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
