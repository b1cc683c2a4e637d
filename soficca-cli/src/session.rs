//! Sessione REPL: una riga in ingresso, una risposta in uscita.
//!
//! Tenuta separata da `main` così che il protocollo sia testabile senza
//! stdin/stdout.

use anyhow::{bail, Context, Result};
use serde_json::{json, Value};
use soficca_core::contract::decision_report_schema;
use soficca_core::{DecisionEngine, Report};
use tracing::{debug, info};

use crate::config::CliConfig;
use crate::observer::StatusTally;

/// Risposta a una riga.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Riga vuota: niente da stampare.
    Nothing,
    /// Output su stdout.
    Output(String),
    /// Messaggio d'errore su stderr; la sessione continua.
    Error(String),
    /// Fine sessione.
    Exit,
}

/// Stato di una sessione interattiva.
#[derive(Debug)]
pub struct Session {
    engine: DecisionEngine,
    config: CliConfig,
    tally: StatusTally,
}

impl Session {
    /// Crea una sessione con il motore e i limiti indicati.
    pub fn new(engine: DecisionEngine, config: CliConfig) -> Self {
        Self {
            engine,
            config,
            tally: StatusTally::new(),
        }
    }

    /// Contatori correnti.
    pub const fn tally(&self) -> &StatusTally {
        &self.tally
    }

    /// Gestisce una riga di input.
    pub fn handle_line(&mut self, raw: &str) -> Reply {
        let line = raw.trim();
        if line.is_empty() {
            return Reply::Nothing;
        }
        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            return Reply::Exit;
        }

        match line {
            ":contract" => Reply::Output(decision_report_schema().to_string()),
            ":stats" => Reply::Output(self.tally.snapshot().to_value().to_string()),
            ":reset" => {
                self.tally.reset();
                info!("session tally reset");
                Reply::Output(json!({"reset": true}).to_string())
            }
            _ => match self.evaluate_line(line) {
                Ok(out) => Reply::Output(out),
                Err(err) => Reply::Error(format!("{err:#}")),
            },
        }
    }

    fn evaluate_line(&mut self, line: &str) -> Result<String> {
        let input: Value = serde_json::from_str(line).context("Input line is not valid JSON")?;

        if let Some(items) = input.get("items").and_then(Value::as_array) {
            if items.len() > self.config.max_batch_items {
                bail!(
                    "Batch of {} items exceeds the limit of {}",
                    items.len(),
                    self.config.max_batch_items
                );
            }
            let reports = self.engine.evaluate_batch(items);
            debug!(items = reports.len(), "batch evaluated");
            for report in &reports {
                self.tally.record(report);
            }
            let results = serde_json::to_value(&reports).context("Unable to serialize reports")?;
            return Ok(json!({ "results": results }).to_string());
        }

        let report: Report = self.engine.evaluate(&input);
        self.tally.record(&report);
        report.to_json().context("Unable to serialize report")
    }
}
