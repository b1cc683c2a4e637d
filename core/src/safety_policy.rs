//! Policy di sicurezza: red flag → override.
//!
//! Qui vive la tabella fissa che mappa i cinque codici red flag noti sulle
//! cinque policy corrispondenti. Se anche una sola policy scatta, l'esito è
//! `TRIGGERED` / `OVERRIDE_ESCALATE` e prevale su qualsiasi altra decisione.
//! I codici sconosciuti non fanno mai scattare nulla.

use crate::report::{Safety, SafetyAction, SafetyStatus};
use crate::state::State;
use crate::trace::PolicyTrace;

/// Versione della policy di sicurezza.
pub const SAFETY_POLICY_VERSION: &str = "0.3.0";

/// Identificativi stabili delle policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyId {
    /// Autolesionismo.
    SelfHarm,
    /// Sintomi cardio-respiratori acuti.
    AcuteCardioResp,
    /// Sintomi neurologici.
    Neuro,
    /// Priapismo.
    Priapism,
    /// Dolore severo o sanguinamento.
    SeverePainBleeding,
}

impl PolicyId {
    /// Id versionato usato nella traccia.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SelfHarm => "POLICY_SELF_HARM_V1",
            Self::AcuteCardioResp => "POLICY_ACUTE_CARDIORESP_V1",
            Self::Neuro => "POLICY_NEURO_V1",
            Self::Priapism => "POLICY_PRIAPISM_V1",
            Self::SeverePainBleeding => "POLICY_SEVERE_PAIN_BLEEDING_V1",
        }
    }
}

/// Universo completo delle policy, nell'ordine di valutazione.
pub const ALL_POLICY_IDS: [PolicyId; 5] = [
    PolicyId::SelfHarm,
    PolicyId::AcuteCardioResp,
    PolicyId::Neuro,
    PolicyId::Priapism,
    PolicyId::SeverePainBleeding,
];

/// Codici red flag riconosciuti.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RedFlag {
    /// `RED_FLAG_SELF_HARM`
    SelfHarm,
    /// `RED_FLAG_ACUTE_CARDIORESP`
    AcuteCardioResp,
    /// `RED_FLAG_NEURO`
    Neuro,
    /// `RED_FLAG_PRIAPISM`
    Priapism,
    /// `RED_FLAG_SEVERE_PAIN_BLEEDING`
    SeverePainBleeding,
}

impl RedFlag {
    /// Tutti i codici noti.
    pub const ALL: [Self; 5] = [
        Self::SelfHarm,
        Self::AcuteCardioResp,
        Self::Neuro,
        Self::Priapism,
        Self::SeverePainBleeding,
    ];

    /// Codice grezzo come appare in `safety_flags`.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::SelfHarm => "RED_FLAG_SELF_HARM",
            Self::AcuteCardioResp => "RED_FLAG_ACUTE_CARDIORESP",
            Self::Neuro => "RED_FLAG_NEURO",
            Self::Priapism => "RED_FLAG_PRIAPISM",
            Self::SeverePainBleeding => "RED_FLAG_SEVERE_PAIN_BLEEDING",
        }
    }

    /// Riconosce un codice (match esatto).
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|flag| flag.code() == code)
    }

    /// Policy governata da questo codice.
    #[must_use]
    pub const fn policy(&self) -> PolicyId {
        match self {
            Self::SelfHarm => PolicyId::SelfHarm,
            Self::AcuteCardioResp => PolicyId::AcuteCardioResp,
            Self::Neuro => PolicyId::Neuro,
            Self::Priapism => PolicyId::Priapism,
            Self::SeverePainBleeding => PolicyId::SeverePainBleeding,
        }
    }
}

/// Risultato completo della valutazione di sicurezza.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafetyAssessment {
    /// Esito da inserire nel report.
    pub safety: Safety,
    /// Policy valutate e scattate.
    pub policy_trace: PolicyTrace,
    /// Codici non riconosciuti, distinti, in ordine di apparizione.
    ///
    /// Non fanno scattare nulla; il motore li porta nella traccia solo se
    /// configurato per farlo.
    pub unrecognized_flags: Vec<String>,
}

/// Valuta le red flag dichiarate nello stato.
#[must_use]
pub fn evaluate_safety(state: &State) -> SafetyAssessment {
    let mut triggered: Vec<PolicyId> = Vec::new();
    let mut triggers: Vec<String> = Vec::new();
    let mut unrecognized: Vec<String> = Vec::new();

    for code in state.safety_flag_codes() {
        match RedFlag::from_code(code) {
            Some(flag) => {
                let policy = flag.policy();
                if !triggered.contains(&policy) {
                    triggered.push(policy);
                }
                triggers.push(code.clone());
            }
            None => {
                if !unrecognized.contains(code) {
                    unrecognized.push(code.clone());
                }
            }
        }
    }

    let safety = if triggered.is_empty() {
        Safety::clear()
    } else {
        Safety {
            status: SafetyStatus::Triggered,
            action: SafetyAction::OverrideEscalate,
            triggers,
            user_guidance_required_fields: if state.has_country() {
                Vec::new()
            } else {
                vec!["country".to_string()]
            },
            policy_version: SAFETY_POLICY_VERSION.to_string(),
        }
    };

    SafetyAssessment {
        safety,
        policy_trace: PolicyTrace {
            evaluated: ALL_POLICY_IDS.iter().map(|p| p.as_str().to_string()).collect(),
            triggered: triggered.iter().map(|p| p.as_str().to_string()).collect(),
        },
        unrecognized_flags: unrecognized,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn assess(value: serde_json::Value) -> SafetyAssessment {
        evaluate_safety(&State::from_map(value.as_object().unwrap()))
    }

    #[test]
    fn clear_when_no_flags() {
        let a = assess(json!({}));
        assert_eq!(a.safety, Safety::clear());
        assert_eq!(a.policy_trace.evaluated.len(), 5);
        assert!(a.policy_trace.triggered.is_empty());
    }

    #[test]
    fn known_flag_triggers_escalation() {
        let a = assess(json!({"safety_flags": ["RED_FLAG_SELF_HARM"], "country": "Colombia"}));
        assert_eq!(a.safety.status, SafetyStatus::Triggered);
        assert_eq!(a.safety.action, SafetyAction::OverrideEscalate);
        assert_eq!(a.safety.triggers, vec!["RED_FLAG_SELF_HARM".to_string()]);
        assert!(a.safety.user_guidance_required_fields.is_empty());
        assert_eq!(a.policy_trace.triggered, vec!["POLICY_SELF_HARM_V1".to_string()]);
    }

    #[test]
    fn missing_country_is_requested_for_guidance() {
        let a = assess(json!({"safety_flags": ["RED_FLAG_NEURO"]}));
        assert_eq!(a.safety.user_guidance_required_fields, vec!["country".to_string()]);
    }

    #[test]
    fn triggered_ids_are_distinct_in_first_seen_order() {
        let a = assess(json!({
            "safety_flags": ["RED_FLAG_PRIAPISM", "RED_FLAG_NEURO", "RED_FLAG_PRIAPISM"],
            "country": "CO",
        }));
        assert_eq!(
            a.policy_trace.triggered,
            vec!["POLICY_PRIAPISM_V1".to_string(), "POLICY_NEURO_V1".to_string()]
        );
        // i trigger sono i codici grezzi, ripetizioni comprese
        assert_eq!(a.safety.triggers.len(), 3);
    }

    #[test]
    fn unknown_codes_never_trigger() {
        let a = assess(json!({"safety_flags": ["CHEST_PAIN", "red_flag_neuro", "CHEST_PAIN"]}));
        assert_eq!(a.safety.status, SafetyStatus::Clear);
        assert!(a.safety.triggers.is_empty());
        assert_eq!(
            a.unrecognized_flags,
            vec!["CHEST_PAIN".to_string(), "red_flag_neuro".to_string()]
        );
    }

    #[test]
    fn every_flag_maps_to_a_distinct_policy() {
        let policies: Vec<PolicyId> = RedFlag::ALL.iter().map(RedFlag::policy).collect();
        assert_eq!(policies, ALL_POLICY_IDS.to_vec());
        for flag in RedFlag::ALL {
            assert_eq!(RedFlag::from_code(flag.code()), Some(flag));
        }
    }
}
