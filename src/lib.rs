pub mod analytics;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod render;


use std::path::PathBuf;
use std::process::ExitCode;

use analytics::{BranchScope, SystemClock};
use commands::{auth, progress::ProgressBoard};
use config::Config;
use db::Database;

const USAGE: &str = "usage: branch-sales [--config PATH] <username> <password> [all|<branch-id>]";

pub fn run() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();

    match run_with_args(&args) {
        Ok(report) => {
            print!("{}", report);
            ExitCode::SUCCESS
        }
        Err(notice) => {
            eprintln!("{}", notice);
            ExitCode::FAILURE
        }
    }
}

fn run_with_args(args: &[String]) -> Result<String, String> {
    let (config_path, rest) = match args {
        [flag, path, rest @ ..] if flag == "--config" => (PathBuf::from(path), rest),
        _ => (config::default_config_path(), args),
    };

    let config = Config::load_or_init(&config_path)?;
    logging::init_tracing(&config.log_filter);

    let [username, password, scope @ ..] = rest else {
        return Err(USAGE.to_string());
    };
    let scope = match scope {
        [] => BranchScope::All,
        [value] => BranchScope::parse(value).ok_or_else(|| USAGE.to_string())?,
        _ => return Err(USAGE.to_string()),
    };

    // Initialize database
    let db = Database::new(&config.database_path())?;
    db.initialize()?;

    let session = auth::login(&db, username, password)?;

    let mut board = ProgressBoard::new();
    let view = board.refresh(&db, &session, scope, &SystemClock, config.grid)?;

    Ok(render::render_text(view, &config.currency_symbol))
}
