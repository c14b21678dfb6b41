//! Command-line client for the kbnote core.
//!
//! # Responsibility
//! - Run single RPC calls against the configured database.
//! - Persist the session token between invocations in a session file.

use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kbnote_core::{
    core_version, init_logging, render_markdown, AppConfig, ErrorKind, KnowledgeBase,
    RpcErrorBody, RpcRequest, SessionUpdate,
};
use log::info;
use serde_json::Value;
use thiserror::Error;

/// kbnote - personal knowledge base
#[derive(Parser)]
#[command(name = "kbnote")]
#[command(about = "Notes, tags and links in a local knowledge base")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one operation, e.g. `notes.create` or `search.notes`
    Call(CallCommand),
    /// Print a markdown file rendered to HTML
    Render {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Print the core version
    Version,
}

#[derive(Parser)]
struct CallCommand {
    /// Operation name
    #[arg(value_name = "OP")]
    op: String,

    /// JSON input object
    #[arg(short, long, value_name = "JSON")]
    input: Option<String>,
}

/// Failure returned by the knowledge base, already shaped for output.
#[derive(Debug, Error)]
#[error("{}: {}", .body.code, .body.message)]
struct CallFailed {
    body: RpcErrorBody,
    internal: bool,
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Call(cmd) => handle_call(&cmd),
        Commands::Render { file } => handle_render(&file),
        Commands::Version => {
            println!("kbnote_core version={}", core_version());
            Ok(())
        }
    };

    if let Err(e) = result {
        let exit_code = match e.downcast_ref::<CallFailed>() {
            Some(failed) if !failed.internal => 1,
            _ => 2,
        };
        match e.downcast_ref::<CallFailed>() {
            Some(failed) => match serde_json::to_string_pretty(&failed.body) {
                Ok(json) => eprintln!("{json}"),
                Err(_) => eprintln!("Error: {e}"),
            },
            None => eprintln!("Error: {e:#}"),
        }
        std::process::exit(exit_code);
    }
}

fn handle_call(cmd: &CallCommand) -> Result<()> {
    let config = AppConfig::from_env().context("Failed to load configuration")?;
    if let Some(log_dir) = &config.log_dir {
        init_logging(&config.log_level, log_dir).context("Failed to initialize logging")?;
    }

    let input = match cmd.input.as_deref() {
        Some(raw) => serde_json::from_str::<Value>(raw).context("--input is not valid JSON")?,
        None => Value::Null,
    };

    ensure_parent_directory(&config.db_path)?;
    let kb = KnowledgeBase::open(&config).context("Failed to open database")?;

    let session_file = config.session_file();
    let mut request = RpcRequest::new(cmd.op.clone(), input);
    if let Some(token) = read_session(&session_file)? {
        request = request.with_credential(token);
    }

    let outcome = kb.call(request).map_err(|err| CallFailed {
        body: RpcErrorBody::from(&err),
        internal: err.kind() == ErrorKind::Internal,
    })?;

    match &outcome.session {
        SessionUpdate::Unchanged => {}
        SessionUpdate::Issued(token) => {
            fs::write(&session_file, token).with_context(|| {
                format!("Failed to write session file {}", session_file.display())
            })?;
            info!("event=session_store module=cli status=ok");
        }
        SessionUpdate::Cleared => {
            remove_session(&session_file)?;
            info!("event=session_clear module=cli status=ok");
        }
    }

    println!("{}", serde_json::to_string_pretty(&outcome.payload)?);
    Ok(())
}

fn handle_render(file: &Path) -> Result<()> {
    let source = fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    println!("{}", render_markdown(&source));
    Ok(())
}

fn read_session(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(token) => {
            let token = token.trim();
            Ok((!token.is_empty()).then(|| token.to_string()))
        }
        Err(err) if err.kind() == IoErrorKind::NotFound => Ok(None),
        Err(err) => {
            Err(err).with_context(|| format!("Failed to read session file {}", path.display()))
        }
    }
}

fn remove_session(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == IoErrorKind::NotFound => Ok(()),
        Err(err) => {
            Err(err).with_context(|| format!("Failed to remove session file {}", path.display()))
        }
    }
}

fn ensure_parent_directory(db_path: &Path) -> Result<()> {
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{read_session, remove_session, CallFailed, Cli};
    use clap::CommandFactory;
    use kbnote_core::RpcErrorBody;
    use std::fs;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn call_failure_displays_code_and_message() {
        let failed = CallFailed {
            body: RpcErrorBody {
                code: "NOT_FOUND".to_string(),
                message: "note not found".to_string(),
            },
            internal: false,
        };
        assert_eq!(failed.to_string(), "NOT_FOUND: note not found");
        let wrapped = anyhow::Error::new(failed);
        assert!(wrapped.downcast_ref::<CallFailed>().is_some());
    }

    #[test]
    fn session_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kb.sqlite3.session");

        assert_eq!(read_session(&path).unwrap(), None);
        fs::write(&path, "token-value\n").unwrap();
        assert_eq!(read_session(&path).unwrap().as_deref(), Some("token-value"));

        remove_session(&path).unwrap();
        remove_session(&path).unwrap();
        assert!(!path.exists());
    }
}
