pub mod client;
pub mod config;
pub mod db {
    pub mod models;
}
pub mod models {
    pub mod hass;
}
pub mod schema;
pub mod utils;
pub mod services {
    pub mod dashboard;
    pub mod poller;
    pub mod power;
    pub mod rollup;
    pub mod seed;
    pub mod stats;
    pub mod store;
}

use crate::client::HassClient;
use crate::config::Config;
use diesel::prelude::*;
use diesel::PgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use log::{error, info};
use std::path::{Path, PathBuf};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[derive(Debug, Default)]
pub struct CliOptions {
    env_file: Option<PathBuf>,
    seed_sample_data: bool,
}

fn apply_database_migrations(conn: &mut PgConnection) -> Result<(), String> {
    match conn.run_pending_migrations(MIGRATIONS) {
        Ok(applied) => {
            if applied.is_empty() {
                info!("Database schema is up to date; no migrations were applied");
            } else {
                let names = applied.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", ");
                info!("Applied {} database migration(s): {}", applied.len(), names);
            }
            Ok(())
        }
        Err(e) => Err(format!("Applying database migrations failed: {}", e)),
    }
}

pub fn run(opts: &CliOptions) -> Result<(), String> {
    // 1) Load config
    let cfg = Config::from_env()?;
    info!(
        "Config loaded (hub={}, poll_interval={}s, poll_enabled={}, target_entities={})",
        cfg.hub_base_url,
        cfg.poll_interval.as_secs(),
        cfg.poll_enabled,
        cfg.target_entities.len()
    );

    // 2) Connect DB and apply pending migrations
    let mut conn = PgConnection::establish(&cfg.database_url).map_err(|e| format!("DB connection failed: {}", e))?;
    info!("Connected to database");
    apply_database_migrations(&mut conn)?;

    // 3) Optional sample data for local development
    if opts.seed_sample_data {
        let inserted = services::seed::run(&mut conn)?;
        info!("Seeded {} sample heating interval(s)", inserted);
    }

    // 4) Hub client: constructed once, shared read-only from here on
    let client = HassClient::new(&cfg.hub_base_url, cfg.hub_access_token.clone());

    // 5) Collection loop
    if cfg.poll_enabled {
        services::poller::run_loop(&mut conn, &client, &cfg);
    }

    info!("Collection loop disabled via POLL_ENABLED; exiting");
    Ok(())
}

fn parse_cli() -> Result<CliOptions, String> {
    let mut opts = CliOptions::default();
    let mut args = std::env::args_os();
    args.next(); // skip program name

    while let Some(arg) = args.next() {
        match arg.to_str() {
            Some("--env-file") => {
                let value = args
                    .next()
                    .ok_or_else(|| "`--env-file` requires a path argument".to_string())?;
                opts.env_file = Some(PathBuf::from(value));
            }
            Some(s) if s.starts_with("--env-file=") => {
                let path_str = &s["--env-file=".len()..];
                if path_str.is_empty() {
                    return Err("`--env-file` requires a path argument".to_string());
                }
                opts.env_file = Some(PathBuf::from(path_str));
            }
            Some("--seed-sample-data") => opts.seed_sample_data = true,
            Some(other) => return Err(format!("unrecognised argument: {}", other)),
            None => return Err("argument contains invalid UTF-8".to_string()),
        }
    }

    Ok(opts)
}

fn load_env_file(path: &Path) -> Result<(), String> {
    let contents = std::fs::read_to_string(path).map_err(|e| format!("failed to read {}: {}", path.display(), e))?;

    for (index, line) in contents.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let assignment = trimmed.strip_prefix("export ").map(str::trim_start).unwrap_or(trimmed);
        let Some((key, value)) = assignment.split_once('=') else {
            return Err(format!("{}:{}: missing '=' in assignment", path.display(), index + 1));
        };
        let key = key.trim();
        if key.is_empty() || key.chars().any(|c| c.is_whitespace()) {
            return Err(format!("{}:{}: invalid variable name: {:?}", path.display(), index + 1, key));
        }

        let value = strip_matching_quotes(value.trim());
        // Values already supplied via the process environment win.
        if std::env::var_os(key).is_none() {
            // Updating process-level environment variables is unsafe on some targets.
            unsafe {
                std::env::set_var(key, value);
            }
        }
    }

    Ok(())
}

fn strip_matching_quotes(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'"' || first == b'\'') {
            return &value[1..value.len() - 1];
        }
    }
    value
}

fn main() {
    let opts = match parse_cli() {
        Ok(opts) => opts,
        Err(err) => {
            eprintln!("fatal: {}", err);
            std::process::exit(1);
        }
    };

    // Explicit --env-file must exist; the default ./.env is best-effort.
    let env_file = match &opts.env_file {
        Some(path) => {
            if !path.is_file() {
                eprintln!("fatal: env file not found: {}", path.display());
                std::process::exit(1);
            }
            Some(path.clone())
        }
        None => {
            let default_path = PathBuf::from(".env");
            default_path.is_file().then_some(default_path)
        }
    };
    if let Some(path) = env_file.as_ref() {
        if let Err(err) = load_env_file(path) {
            eprintln!("fatal: {}", err);
            std::process::exit(1);
        }
    }

    // Init logging after environment so RUST_LOG from .env is respected.
    let default_filter = env_logger::Env::default().default_filter_or("info");
    env_logger::Builder::from_env(default_filter)
        .format_timestamp_secs()
        .init();

    if let Some(path) = env_file.as_ref() {
        info!("Environment loaded from {}", path.display());
    }

    info!(
        "thermostat-telemetry {} (git {}) starting",
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_TIME_GIT_HASH")
    );
    if let Err(e) = run(&opts) {
        error!("fatal: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::strip_matching_quotes;

    #[test]
    fn strips_only_matching_outer_quotes() {
        assert_eq!(strip_matching_quotes("\"hello\""), "hello");
        assert_eq!(strip_matching_quotes("'hello'"), "hello");
        assert_eq!(strip_matching_quotes("\"hello'"), "\"hello'");
        assert_eq!(strip_matching_quotes("plain"), "plain");
        assert_eq!(strip_matching_quotes("\""), "\"");
        assert_eq!(strip_matching_quotes(""), "");
    }
}
