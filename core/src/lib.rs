//! Soficca Core: motore di decisione deterministico e auditabile.
//!
//! Riceve uno stato riportato dall'utente (più un contesto di provenienza
//! opzionale) e restituisce un **Decision Report v0.3**: stato della
//! decisione, percorso raccomandato, esito di sicurezza e una traccia
//! completa di cosa è stato valutato e perché.
//!
//! Stessi input, stessa configurazione, stesse versioni → stesso report,
//! byte per byte. Nessun I/O, nessuna rete, nessun orologio.
//!
//! # Panoramica
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │               DecisionEngine                 │
//! │ ┌──────────────┐   ┌──────────────────────┐  │
//! │ │   envelope   │──►│ state / context      │  │  validazione strutturale
//! │ └──────────────┘   └──────────────────────┘  │
//! │ ┌──────────────┐   ┌──────────────────────┐  │
//! │ │ normalization│   │ safety_policy        │  │  segnali + red flag
//! │ └──────────────┘   └──────────────────────┘  │
//! │ ┌──────────────┐   ┌──────────────────────┐  │
//! │ │    rules     │   │ trace                │  │  regole + audit
//! │ └──────────────┘   └──────────────────────┘  │
//! │ ┌──────────────────────────────────────────┐ │
//! │ │ contract                                 │ │  auto-verifica del report
//! │ └──────────────────────────────────────────┘ │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! # Esempio
//!
//! ```
//! use serde_json::json;
//! use soficca_core::{DecisionEngine, DecisionStatus};
//!
//! let engine = DecisionEngine::default();
//! let report = engine.evaluate(&json!({
//!     "state": {"frequency": "sometimes", "wants_meds": true, "morning_erection": "normal"}
//! }));
//!
//! assert!(report.ok);
//! assert_eq!(report.decision.status, DecisionStatus::Decided);
//! ```

#![deny(missing_docs)]
#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

/// Configurazione del motore (env / YAML).
pub mod config;
/// Validatore di contratto e schema JSON del report.
pub mod contract;
/// Orchestratore con l'ordine di precedenza.
pub mod engine;
/// Validazione strutturale dell'envelope e traduzione della forma legacy.
pub mod envelope;
/// Errori strutturali e guasti interni.
pub mod error;
/// Normalizzazione dello stato in segnali tri-state.
pub mod normalization;
/// Rilevatore di red flag su testo libero.
pub mod red_flags;
/// Tipi del Decision Report.
pub mod report;
/// Tabella di regole cliniche.
pub mod rules;
/// Policy di sicurezza.
pub mod safety_policy;
/// Stato e contesto tipizzati.
pub mod state;
/// Traccia di audit.
pub mod trace;

pub use config::EngineConfig;
pub use engine::{evaluate, evaluate_batch, DecisionEngine};
pub use error::{EngineError, EngineResult, StructuralError};
pub use report::{
    Decision, DecisionStatus, ErrorCode, Report, ReportError, Safety, SafetyAction, SafetyStatus,
    Versions, ENGINE_VERSION, REPORT_SCHEMA_VERSION,
};
pub use rules::DecisionPath;
pub use state::{Context, EvaluationInput, Source, State};
pub use trace::{EvidenceEntry, PolicyTrace, Trace};
