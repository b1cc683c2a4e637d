#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

//! Eseguibile `soficca`: REPL JSON sopra `soficca-core`.
//!
//! Ogni riga è un envelope `{"state": {...}, "context": {...}}` (oppure un
//! batch `{"items": [...]}`); la risposta è il Decision Report in JSON
//! compatto, una riga per input. I log vanno su stderr, così stdout resta
//! pulito per chi consuma i report.

mod config;
mod observer;
mod session;

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use soficca_core::{DecisionEngine, EngineConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::CliConfig;
use crate::session::{Reply, Session};

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Entry-point.
///
/// Avvia il REPL:
/// - legge una riga da stdin,
/// - la valuta con il `DecisionEngine`,
/// - stampa il report.
/// `:contract`, `:stats`, `:reset` sono comandi; `exit` o `quit` per uscire.
fn main() -> Result<()> {
    let cli_config = CliConfig::from_env().context("Invalid CLI configuration")?;
    init_logging(cli_config.log_json);

    let engine_config = EngineConfig::from_env().context("Invalid engine configuration")?;
    info!(
        engine = soficca_core::ENGINE_VERSION,
        schema = soficca_core::REPORT_SCHEMA_VERSION,
        surface_unknown_flags = engine_config.surface_unknown_safety_flags,
        max_batch_items = cli_config.max_batch_items,
        "soficca session started"
    );

    let mut session = Session::new(DecisionEngine::new(engine_config), cli_config);

    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();

    for line in stdin.lock().lines() {
        let line = line.context("Unable to read from stdin")?;

        match session.handle_line(&line) {
            Reply::Nothing => {}
            Reply::Output(out) => {
                writeln!(stdout, "{out}")?;
                stdout.flush()?;
            }
            Reply::Error(msg) => {
                warn!("{msg}");
                eprintln!("error: {msg}");
            }
            Reply::Exit => break,
        }
    }

    let snap = session.tally().snapshot();
    info!(
        total = snap.total,
        decided = snap.decided,
        needs_more_info = snap.needs_more_info,
        conflict = snap.conflict,
        escalated = snap.escalated,
        not_ok = snap.not_ok,
        "soficca session finished"
    );

    Ok(())
}
