//! Tabella di regole deterministica.
//!
//! Le regole vengono valutate dall'alto verso il basso sui segnali
//! normalizzati. Ogni ramo accoda motivazioni e raccomandazioni in un ordine
//! fisso: l'ordine fa parte dell'output e deve restare stabile.

use serde::{Deserialize, Serialize};

use crate::normalization::Signals;

/// Versione della tabella di regole.
pub const RULESET_VERSION: &str = "0.3.0";

const FLAG_PHYSIOLOGY_SIGNAL: &str = "physiology_signal";
const FLAG_NEEDS_EVAL_PARALLEL: &str = "needs_eval_parallel";
const FLAG_PERSISTENT_PATTERN: &str = "persistent_pattern";

const REASON_INTERMITTENT: &str = "Symptoms appear intermittent.";
const REASON_USER_REQUESTED_MEDS: &str = "User requested medication support.";
const REASON_MORNING_REDUCED: &str =
    "Reduced morning erections can be a physiological signal worth evaluating.";
const REASON_PERSISTENT_PARALLEL: &str =
    "Persistent pattern suggests clinician review should occur in parallel.";
const REASON_PERSISTENT: &str = "Symptoms seem consistent rather than intermittent.";

const REC_MEDS_CONSIDERED: &str =
    "Medication support can be considered (with appropriate authorization).";
const REC_MEDS_OPTIONS: &str = "Provide medication pathway options and screening questions.";
const REC_EVAL_PARALLEL_WITH_MEDS: &str =
    "Recommend clinician evaluation in parallel with any medication support.";
const REC_EVAL_PARALLEL: &str = "Recommend clinician evaluation in parallel.";
const REC_EVAL_FIRST: &str = "Recommend clinician evaluation before a medication-first approach.";

/// Percorso raccomandato.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DecisionPath {
    /// Servono altre domande.
    #[serde(rename = "PATH_MORE_QUESTIONS")]
    MoreQuestions,
    /// Valutazione clinica prima di tutto.
    #[serde(rename = "PATH_EVAL_FIRST")]
    EvalFirst,
    /// Il supporto farmacologico è percorribile.
    #[serde(rename = "PATH_MEDS_OK")]
    MedsOk,
    /// Escalation a un umano (solo da override di sicurezza).
    #[serde(rename = "PATH_ESCALATE_HUMAN")]
    EscalateHuman,
}

impl DecisionPath {
    /// Tutti i percorsi ammessi.
    pub const ALL: [Self; 4] = [
        Self::MoreQuestions,
        Self::EvalFirst,
        Self::MedsOk,
        Self::EscalateHuman,
    ];

    /// Forma serializzata.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::MoreQuestions => "PATH_MORE_QUESTIONS",
            Self::EvalFirst => "PATH_EVAL_FIRST",
            Self::MedsOk => "PATH_MEDS_OK",
            Self::EscalateHuman => "PATH_ESCALATE_HUMAN",
        }
    }
}

impl std::fmt::Display for DecisionPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identificativi stabili delle regole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleId {
    /// Pattern intermittente: farmaci percorribili.
    IntermittentMedsOk,
    /// Erezioni mattutine ridotte: valutazione in parallelo.
    MorningReducedEvalParallel,
    /// Pattern persistente: prima la valutazione.
    PersistentEvalFirst,
    /// Pattern persistente con richiesta di farmaci: valutazione in parallelo.
    PersistentMedsRequiresEvalParallel,
}

impl RuleId {
    /// Id versionato usato nella traccia.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::IntermittentMedsOk => "RULE_INTERMITTENT_MEDS_OK_V1",
            Self::MorningReducedEvalParallel => "RULE_MORNING_REDUCED_EVAL_PARALLEL_V1",
            Self::PersistentEvalFirst => "RULE_PERSISTENT_EVAL_FIRST_V1",
            Self::PersistentMedsRequiresEvalParallel => {
                "RULE_PERSISTENT_MEDS_REQUIRES_EVAL_PARALLEL_V1"
            }
        }
    }
}

/// Universo completo delle regole.
pub const ALL_RULE_IDS: [RuleId; 4] = [
    RuleId::IntermittentMedsOk,
    RuleId::MorningReducedEvalParallel,
    RuleId::PersistentEvalFirst,
    RuleId::PersistentMedsRequiresEvalParallel,
];

/// Output della tabella di regole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleOutcome {
    /// Percorso scelto; `MoreQuestions` se nessuna regola è scattata.
    pub path: DecisionPath,
    /// Flag cliniche, senza duplicati.
    pub flags: Vec<String>,
    /// Motivazioni in ordine.
    pub reasons: Vec<String>,
    /// Raccomandazioni in ordine.
    pub recommendations: Vec<String>,
    /// Sempre l'universo completo.
    pub rules_evaluated: Vec<RuleId>,
    /// Regole scattate, in ordine.
    pub rules_triggered: Vec<RuleId>,
}

impl RuleOutcome {
    fn new() -> Self {
        Self {
            path: DecisionPath::MoreQuestions,
            flags: Vec::new(),
            reasons: Vec::new(),
            recommendations: Vec::new(),
            rules_evaluated: ALL_RULE_IDS.to_vec(),
            rules_triggered: Vec::new(),
        }
    }

    fn fire(&mut self, rule: RuleId) {
        self.rules_triggered.push(rule);
    }

    fn flag(&mut self, flag: &str) {
        if !self.has_flag(flag) {
            self.flags.push(flag.to_string());
        }
    }

    fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| f == flag)
    }

    fn reason(&mut self, text: &str) {
        self.reasons.push(text.to_string());
    }

    fn recommend(&mut self, text: &str) {
        self.recommendations.push(text.to_string());
    }
}

/// Applica la tabella di regole ai segnali.
#[must_use]
pub fn apply_rules(signals: &Signals) -> RuleOutcome {
    let mut out = RuleOutcome::new();

    let user_requests_meds = signals.user_requests_meds == Some(true);
    let morning_reduced = signals.morning_erection_reduced == Some(true);

    match signals.intermittent_pattern {
        Some(true) => {
            out.fire(RuleId::IntermittentMedsOk);
            out.path = DecisionPath::MedsOk;
            out.reason(REASON_INTERMITTENT);
            out.recommend(REC_MEDS_CONSIDERED);

            if user_requests_meds {
                out.reason(REASON_USER_REQUESTED_MEDS);
                out.recommend(REC_MEDS_OPTIONS);
            }

            if morning_reduced {
                out.fire(RuleId::MorningReducedEvalParallel);
                out.flag(FLAG_PHYSIOLOGY_SIGNAL);
                out.flag(FLAG_NEEDS_EVAL_PARALLEL);
                out.reason(REASON_MORNING_REDUCED);
                out.recommend(REC_EVAL_PARALLEL_WITH_MEDS);
            }
        }
        Some(false) => {
            if user_requests_meds {
                out.fire(RuleId::PersistentMedsRequiresEvalParallel);
                out.path = DecisionPath::MedsOk;
                out.flag(FLAG_NEEDS_EVAL_PARALLEL);
                out.reason(REASON_USER_REQUESTED_MEDS);
                out.reason(REASON_PERSISTENT_PARALLEL);
                out.recommend(REC_MEDS_OPTIONS);
                out.recommend(REC_EVAL_PARALLEL);
            } else {
                out.fire(RuleId::PersistentEvalFirst);
                out.path = DecisionPath::EvalFirst;
                out.flag(FLAG_PERSISTENT_PATTERN);
                out.reason(REASON_PERSISTENT);
                out.recommend(REC_EVAL_FIRST);
            }

            if morning_reduced && !out.has_flag(FLAG_PHYSIOLOGY_SIGNAL) {
                out.flag(FLAG_PHYSIOLOGY_SIGNAL);
                out.reason(REASON_MORNING_REDUCED);
            }
        }
        // Frequenza sconosciuta o fuori enumerazione: nessuna regola.
        None => {}
    }

    out
}
