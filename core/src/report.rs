//! Tipi del Decision Report v0.3.
//!
//! Il report è l'unico output del motore: un aggregato costruito da zero a
//! ogni chiamata, serializzabile in JSON con chiavi e enumerazioni stabili.
//!
//! ```text
//! Report
//! ├── ok / errors
//! ├── versions   (engine, ruleset, safety_policy)
//! ├── decision   (status, path, flags, reasons, recommendations, required_fields)
//! ├── safety     (status, action, triggers, user_guidance_required_fields, policy_version)
//! └── trace      (policy_trace, rules_evaluated, rules_triggered, evidence, uncertainty_notes)
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::rules::{self, DecisionPath};
use crate::safety_policy;
use crate::trace::{Trace, TraceBuilder};

/// Versione del motore di orchestrazione.
pub const ENGINE_VERSION: &str = "0.3.0";

/// Versione dello schema del report.
pub const REPORT_SCHEMA_VERSION: &str = "v0.3";

/// Stato finale della decisione.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionStatus {
    /// Una regola (o l'assenza di regole applicabili) ha prodotto un esito terminale.
    Decided,
    /// Mancano campi necessari: vedi `required_fields`.
    NeedsMoreInfo,
    /// L'input contiene evidenze contraddittorie.
    Conflict,
    /// Una policy di sicurezza ha forzato l'escalation.
    Escalated,
}

impl DecisionStatus {
    /// Tutti gli stati ammessi, nell'ordine del contratto.
    pub const ALL: [Self; 4] = [
        Self::Decided,
        Self::NeedsMoreInfo,
        Self::Conflict,
        Self::Escalated,
    ];

    /// Forma serializzata dello stato.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Decided => "DECIDED",
            Self::NeedsMoreInfo => "NEEDS_MORE_INFO",
            Self::Conflict => "CONFLICT",
            Self::Escalated => "ESCALATED",
        }
    }
}

impl std::fmt::Display for DecisionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Esito della valutazione di sicurezza.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SafetyStatus {
    /// Nessuna red flag nota.
    Clear,
    /// Almeno una policy è scattata.
    Triggered,
}

impl SafetyStatus {
    /// Tutti gli stati di sicurezza ammessi.
    pub const ALL: [Self; 2] = [Self::Clear, Self::Triggered];

    /// Forma serializzata.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Clear => "CLEAR",
            Self::Triggered => "TRIGGERED",
        }
    }
}

/// Azione richiesta dalla policy di sicurezza.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SafetyAction {
    /// Nessun override.
    None,
    /// Escalation verso un umano, sopra qualsiasi altro esito.
    OverrideEscalate,
    /// Blocco delle raccomandazioni. Fa parte dell'enumerazione ma nessuna policy v0.3 lo usa.
    OverrideBlockRecs,
}

impl SafetyAction {
    /// Tutte le azioni ammesse.
    pub const ALL: [Self; 3] = [
        Self::None,
        Self::OverrideEscalate,
        Self::OverrideBlockRecs,
    ];

    /// Forma serializzata.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::OverrideEscalate => "OVERRIDE_ESCALATE",
            Self::OverrideBlockRecs => "OVERRIDE_BLOCK_RECS",
        }
    }
}

/// Codici di errore che possono comparire in `Report::errors`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// L'envelope non è un oggetto.
    InvalidType,
    /// Non è stato possibile ricavare un oggetto `state`.
    InvalidState,
    /// `context` presente ma non è un oggetto.
    InvalidContext,
    /// Il report assemblato viola il proprio contratto.
    ContractViolation,
    /// Guasto interno imprevisto.
    UnexpectedError,
}

impl ErrorCode {
    /// Forma serializzata del codice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidType => "INVALID_TYPE",
            Self::InvalidState => "INVALID_STATE",
            Self::InvalidContext => "INVALID_CONTEXT",
            Self::ContractViolation => "CONTRACT_VIOLATION",
            Self::UnexpectedError => "UNEXPECTED_ERROR",
        }
    }
}

/// Singolo errore riportato al chiamante.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportError {
    /// Codice stabile dell'errore.
    pub code: ErrorCode,
    /// Messaggio leggibile.
    pub message: String,
    /// JSON path dell'elemento che ha causato l'errore (`$` se globale).
    pub path: String,
    /// Metadati opzionali (es. lista delle violazioni di contratto).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl ReportError {
    /// Crea un errore con path `$` e senza metadati.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            path: "$".to_string(),
            meta: None,
        }
    }

    /// Imposta il JSON path.
    #[must_use]
    pub fn at(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Allega metadati.
    #[must_use]
    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }
}

/// Versioni dei componenti che hanno prodotto il report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Versions {
    /// Versione del motore.
    pub engine: String,
    /// Versione della tabella di regole.
    pub ruleset: String,
    /// Versione della policy di sicurezza.
    pub safety_policy: String,
}

impl Default for Versions {
    fn default() -> Self {
        Self {
            engine: ENGINE_VERSION.to_string(),
            ruleset: rules::RULESET_VERSION.to_string(),
            safety_policy: safety_policy::SAFETY_POLICY_VERSION.to_string(),
        }
    }
}

/// Decisione raccomandata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Stato della decisione.
    pub status: DecisionStatus,
    /// Percorso raccomandato; `None` viene serializzato come `null`.
    pub path: Option<DecisionPath>,
    /// Flag cliniche prodotte dalle regole.
    pub flags: Vec<String>,
    /// Motivazioni, in ordine di applicazione.
    pub reasons: Vec<String>,
    /// Raccomandazioni, in ordine di applicazione.
    pub recommendations: Vec<String>,
    /// Campi da raccogliere prima di poter decidere.
    pub required_fields: Vec<String>,
}

impl Decision {
    /// Decisione vuota con lo stato indicato.
    #[must_use]
    pub const fn empty(status: DecisionStatus) -> Self {
        Self {
            status,
            path: None,
            flags: Vec::new(),
            reasons: Vec::new(),
            recommendations: Vec::new(),
            required_fields: Vec::new(),
        }
    }

    /// Decisione `NEEDS_MORE_INFO` che chiede i campi indicati.
    #[must_use]
    pub fn needs(fields: &[&str]) -> Self {
        Self {
            required_fields: fields.iter().map(|f| (*f).to_string()).collect(),
            ..Self::empty(DecisionStatus::NeedsMoreInfo)
        }
    }
}

/// Esito della valutazione di sicurezza come appare nel report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Safety {
    /// `CLEAR` o `TRIGGERED`.
    pub status: SafetyStatus,
    /// Azione di override richiesta.
    pub action: SafetyAction,
    /// Codici red flag grezzi che hanno fatto scattare una policy.
    pub triggers: Vec<String>,
    /// Campi da chiedere all'utente per poterlo indirizzare (es. `country`).
    pub user_guidance_required_fields: Vec<String>,
    /// Versione della policy applicata.
    pub policy_version: String,
}

impl Safety {
    /// Esito neutro: nessuna policy scattata.
    #[must_use]
    pub fn clear() -> Self {
        Self {
            status: SafetyStatus::Clear,
            action: SafetyAction::None,
            triggers: Vec::new(),
            user_guidance_required_fields: Vec::new(),
            policy_version: safety_policy::SAFETY_POLICY_VERSION.to_string(),
        }
    }

    /// `true` se una policy ha forzato l'override.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.status == SafetyStatus::Triggered
    }
}

impl Default for Safety {
    fn default() -> Self {
        Self::clear()
    }
}

/// Decision Report v0.3.
///
/// Viene restituito per valore: una volta consegnato al chiamante il motore
/// non ne conserva alcun riferimento.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// `false` se c'è almeno un errore (strutturale, di contratto o interno).
    pub ok: bool,
    /// Errori rilevati.
    pub errors: Vec<ReportError>,
    /// Versioni dei componenti.
    pub versions: Versions,
    /// Decisione.
    pub decision: Decision,
    /// Esito di sicurezza.
    pub safety: Safety,
    /// Traccia di audit.
    pub trace: Trace,
}

impl Report {
    /// Report di rifiuto: input non utilizzabile oppure guasto interno.
    ///
    /// Porta comunque versioni complete e liste `evaluated` piene, così che
    /// l'audit resti possibile anche sul percorso d'errore.
    #[must_use]
    pub fn rejected(error: ReportError) -> Self {
        Self {
            ok: false,
            errors: vec![error],
            versions: Versions::default(),
            decision: Decision::needs(&["state"]),
            safety: Safety::clear(),
            trace: TraceBuilder::with_full_universes().finish(),
        }
    }

    /// Serializza il report in una stringa JSON compatta.
    ///
    /// # Errors
    ///
    /// Propaga l'errore di `serde_json` (non atteso per questi tipi).
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn enums_serialize_in_screaming_case() {
        assert_eq!(
            serde_json::to_value(DecisionStatus::NeedsMoreInfo).unwrap(),
            json!("NEEDS_MORE_INFO")
        );
        assert_eq!(
            serde_json::to_value(SafetyAction::OverrideBlockRecs).unwrap(),
            json!("OVERRIDE_BLOCK_RECS")
        );
        assert_eq!(
            serde_json::to_value(ErrorCode::ContractViolation).unwrap(),
            json!("CONTRACT_VIOLATION")
        );
    }

    #[test]
    fn as_str_matches_serde_form() {
        for status in DecisionStatus::ALL {
            assert_eq!(serde_json::to_value(status).unwrap(), json!(status.as_str()));
        }
        for action in SafetyAction::ALL {
            assert_eq!(serde_json::to_value(action).unwrap(), json!(action.as_str()));
        }
    }

    #[test]
    fn error_meta_is_omitted_when_absent() {
        let err = ReportError::new(ErrorCode::InvalidType, "boom");
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value, json!({"code": "INVALID_TYPE", "message": "boom", "path": "$"}));
    }

    #[test]
    fn rejected_report_is_auditable() {
        let report = Report::rejected(ReportError::new(ErrorCode::InvalidState, "no state"));
        assert!(!report.ok);
        assert_eq!(report.decision.status, DecisionStatus::NeedsMoreInfo);
        assert_eq!(report.decision.required_fields, vec!["state".to_string()]);
        assert_eq!(report.trace.rules_evaluated().len(), 4);
        assert_eq!(report.trace.policy_trace().evaluated.len(), 5);
        assert_eq!(report.versions.engine, ENGINE_VERSION);
    }

    #[test]
    fn absent_path_serializes_as_null() {
        let decision = Decision::empty(DecisionStatus::Decided);
        let value = serde_json::to_value(&decision).unwrap();
        assert_eq!(value["path"], Value::Null);
    }
}
