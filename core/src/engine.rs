//! Orchestratore: precedenze fisse e assemblaggio del report.
//!
//! Ordine di precedenza per ogni chiamata:
//!
//! ```text
//! envelope ──✗──► NEEDS_MORE_INFO(["state"])                 (terminale)
//!    │
//!    ▼  evidenza + segnali + safety (sempre)
//! conflicts? ──► CONFLICT ──(safety TRIGGERED)──► ESCALATED  (terminale)
//!    │
//! safety TRIGGERED? ──► ESCALATED                           (terminale)
//!    │
//! campi mancanti? ──► NEEDS_MORE_INFO                       (terminale)
//!    │
//!    ▼
//! tabella di regole ──► DECIDED
//! ```
//!
//! Dopo l'assemblaggio il report passa dal controllo di contratto
//! (non bloccante) e da un'unica correzione: `DECIDED` con
//! `PATH_MORE_QUESTIONS` e nessun campo richiesto diventa `DECIDED` senza
//! percorso.
//!
//! Ogni chiamata costruisce i propri oggetti: nessuno stato condiviso, nessun
//! lock, invocazioni parallele sicure per costruzione.

use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::contract;
use crate::envelope::parse_envelope;
use crate::error::{EngineError, EngineResult};
use crate::normalization::{normalize, Signals};
use crate::report::{
    Decision, DecisionStatus, ErrorCode, Report, ReportError, Safety, Versions,
};
use crate::rules::{apply_rules, DecisionPath, ALL_RULE_IDS};
use crate::safety_policy::evaluate_safety;
use crate::state::{Context, EvaluationInput, State, EVIDENCE_FIELDS};
use crate::trace::{EvidenceEntry, TraceBuilder};

const CONFLICT_REASON: &str = "Conflicting evidence detected; cannot decide safely.";
const CONFLICT_RECOMMENDATION: &str = "Resolve conflicting inputs, then re-run decision evaluation.";
const CONFLICT_NOTE: &str = "Conflict detected in inputs; decision withheld.";

const ESCALATION_REASON: &str = "Safety policy triggered; escalation required.";
const ESCALATION_RECOMMENDATION: &str = "Escalate to human support / urgent care guidance.";
const SAFETY_OVERRIDE_NOTE: &str = "Safety override: clinical decision suppressed.";

const MISSING_REASON: &str = "Insufficient information to decide safely.";
const MISSING_RECOMMENDATION: &str = "Collect the missing fields, then re-run decision evaluation.";

const UNEXPECTED_MESSAGE: &str = "Unexpected error while evaluating decision state";
const CONTRACT_MESSAGE: &str = "Decision report violates v0.3 contract";

/// Ramo scelto dalla macchina delle precedenze.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Branch {
    /// Evidenze in conflitto, nessuna policy scattata.
    Conflict,
    /// Evidenze in conflitto, ma la safety prevale.
    ConflictOverriddenBySafety,
    /// Policy di sicurezza scattata.
    SafetyOverride,
    /// Mancano i campi elencati.
    MissingFields(Vec<&'static str>),
    /// Si applica la tabella di regole.
    Rules,
}

/// Sceglie il ramo secondo l'ordine di precedenza.
#[must_use]
pub fn select_branch(state: &State, safety: &Safety) -> Branch {
    if !state.conflicts.is_empty() {
        return if safety.is_triggered() {
            Branch::ConflictOverriddenBySafety
        } else {
            Branch::Conflict
        };
    }
    if safety.is_triggered() {
        return Branch::SafetyOverride;
    }
    let missing = required_fields(state);
    if missing.is_empty() {
        Branch::Rules
    } else {
        Branch::MissingFields(missing)
    }
}

/// Campi obbligatori mancanti.
///
/// `frequency` serve sempre; `morning_erection` serve se `wants_meds` è
/// esattamente `true`.
#[must_use]
pub fn required_fields(state: &State) -> Vec<&'static str> {
    let mut required = Vec::new();
    if state.is_absent("frequency") {
        required.push("frequency");
    }
    if state.wants_meds_is_true() && state.is_absent("morning_erection") {
        required.push("morning_erection");
    }
    required
}

/// Motore di decisione deterministico.
#[derive(Debug, Clone, Default)]
pub struct DecisionEngine {
    config: EngineConfig,
}

impl DecisionEngine {
    /// Crea un motore con la configurazione indicata.
    #[must_use]
    pub const fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Configurazione corrente.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Valuta un envelope JSON grezzo. Restituisce sempre un report.
    #[must_use]
    pub fn evaluate(&self, input: &Value) -> Report {
        match parse_envelope(input) {
            Ok(parsed) => self.evaluate_input(&parsed),
            Err(err) => {
                warn!(code = err.code().as_str(), path = err.path(), "input rejected: {err}");
                Report::rejected(ReportError::from(&err))
            }
        }
    }

    /// Valuta un input già in forma canonica. Restituisce sempre un report.
    ///
    /// Un guasto interno diventa un errore `UNEXPECTED_ERROR` nel report,
    /// con versioni e liste `evaluated` complete.
    #[must_use]
    pub fn evaluate_input(&self, input: &EvaluationInput) -> Report {
        match self.try_evaluate(input) {
            Ok(report) => report,
            Err(err) => {
                warn!(kind = err.kind(), "evaluation fault: {err}");
                fault_report(&err)
            }
        }
    }

    /// Valuta più envelope indipendenti, preservando l'ordine.
    ///
    /// L'errore strutturale di un elemento non tocca gli altri.
    #[must_use]
    pub fn evaluate_batch(&self, inputs: &[Value]) -> Vec<Report> {
        inputs.iter().map(|input| self.evaluate(input)).collect()
    }

    fn try_evaluate(&self, input: &EvaluationInput) -> EngineResult<Report> {
        let state = &input.state;
        let mut tb = TraceBuilder::new();

        record_evidence(&mut tb, state, &input.context);
        let signals = normalize(state);

        let assessment = evaluate_safety(state);
        for id in &assessment.policy_trace.evaluated {
            tb.add_policy_evaluated(id);
        }
        for id in &assessment.policy_trace.triggered {
            tb.add_policy_triggered(id);
        }
        for rule in ALL_RULE_IDS {
            tb.add_rule_evaluated(rule.as_str());
        }
        if self.config.surface_unknown_safety_flags && !assessment.unrecognized_flags.is_empty() {
            tb.note_uncertainty(format!(
                "Unrecognized safety flag codes ignored: {}.",
                assessment.unrecognized_flags.join(", ")
            ));
        }

        let safety = assessment.safety;
        let branch = select_branch(state, &safety);
        debug!(?branch, safety = safety.status.as_str(), "precedence resolved");

        let decision = match branch {
            Branch::Conflict => {
                tb.note_uncertainty(CONFLICT_NOTE);
                conflict_decision()
            }
            Branch::ConflictOverriddenBySafety => {
                tb.note_uncertainty(CONFLICT_NOTE);
                escalated_decision(&safety)
            }
            Branch::SafetyOverride => {
                tb.note_uncertainty(SAFETY_OVERRIDE_NOTE);
                escalated_decision(&safety)
            }
            Branch::MissingFields(missing) => {
                tb.note_uncertainty(format!("Missing required fields: {}.", missing.join(", ")));
                Decision {
                    reasons: vec![MISSING_REASON.to_string()],
                    recommendations: vec![MISSING_RECOMMENDATION.to_string()],
                    ..Decision::needs(&missing)
                }
            }
            Branch::Rules => rules_decision(&signals, &mut tb)?,
        };

        let report = Report {
            ok: true,
            errors: Vec::new(),
            versions: Versions::default(),
            decision,
            safety,
            trace: tb.finish(),
        };

        finalize(report)
    }
}

/// Valuta un envelope con la configurazione di default.
#[must_use]
pub fn evaluate(input: &Value) -> Report {
    DecisionEngine::default().evaluate(input)
}

/// Valuta un batch con la configurazione di default.
#[must_use]
pub fn evaluate_batch(inputs: &[Value]) -> Vec<Report> {
    DecisionEngine::default().evaluate_batch(inputs)
}

/// Report per un guasto interno: `UNEXPECTED_ERROR` con la categoria in `meta.type`.
#[must_use]
pub fn fault_report(err: &EngineError) -> Report {
    Report::rejected(
        ReportError::new(ErrorCode::UnexpectedError, UNEXPECTED_MESSAGE)
            .with_meta(json!({ "type": err.kind() })),
    )
}

fn record_evidence(tb: &mut TraceBuilder, state: &State, context: &Context) {
    let contradicted = state.conflict_fields();
    for field in EVIDENCE_FIELDS {
        let raw = state.raw(field);
        tb.add_evidence(
            field,
            EvidenceEntry {
                confidence: raw.is_some().then_some(1.0),
                value: raw.unwrap_or(Value::Null),
                source: context.source,
                recency_days: context.recency_days.clone(),
                contradiction: contradicted.contains(field),
            },
        );
    }
}

fn conflict_decision() -> Decision {
    Decision {
        reasons: vec![CONFLICT_REASON.to_string()],
        recommendations: vec![CONFLICT_RECOMMENDATION.to_string()],
        ..Decision::empty(DecisionStatus::Conflict)
    }
}

fn escalated_decision(safety: &Safety) -> Decision {
    Decision {
        path: Some(DecisionPath::EscalateHuman),
        reasons: vec![ESCALATION_REASON.to_string()],
        recommendations: vec![ESCALATION_RECOMMENDATION.to_string()],
        required_fields: safety.user_guidance_required_fields.clone(),
        ..Decision::empty(DecisionStatus::Escalated)
    }
}

fn rules_decision(signals: &Signals, tb: &mut TraceBuilder) -> EngineResult<Decision> {
    let outcome = apply_rules(signals);
    if outcome.rules_evaluated != ALL_RULE_IDS {
        return Err(EngineError::Invariant(
            "rule engine did not evaluate the full rule universe".to_string(),
        ));
    }
    for rule in &outcome.rules_triggered {
        tb.add_rule_triggered(rule.as_str());
    }

    Ok(Decision {
        status: DecisionStatus::Decided,
        path: Some(outcome.path),
        flags: outcome.flags,
        reasons: outcome.reasons,
        recommendations: outcome.recommendations,
        required_fields: Vec::new(),
    })
}

/// Controllo di contratto (non bloccante) e correzione finale del percorso.
fn finalize(mut report: Report) -> EngineResult<Report> {
    let problems = contract::validate(&report)?;
    if !problems.is_empty() {
        warn!(?problems, "decision report violates its own contract");
        report.ok = false;
        report.errors.push(
            ReportError::new(ErrorCode::ContractViolation, CONTRACT_MESSAGE)
                .with_meta(json!({ "problems": problems })),
        );
    }

    let decision = &mut report.decision;
    if decision.status == DecisionStatus::Decided
        && decision.path == Some(DecisionPath::MoreQuestions)
        && decision.required_fields.is_empty()
    {
        decision.path = None;
    }

    debug!(
        status = report.decision.status.as_str(),
        path = ?report.decision.path,
        ok = report.ok,
        "decision report assembled"
    );
    Ok(report)
}
