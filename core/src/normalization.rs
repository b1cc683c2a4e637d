//! Normalizzazione dello stato in segnali tri-state.
//!
//! Non è NLU: si assume che il chiamante abbia già ridotto il testo libero
//! alle enumerazioni previste. Qualsiasi valore non elencato (o malformato)
//! diventa `None`, cioè "sconosciuto".

use serde_json::Value;

use crate::state::State;

/// Segnali derivati dallo stato. `None` = sconosciuto.
///
/// Si ottengono solo tramite [`normalize`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct Signals {
    /// `sometimes` → intermittente, `always` → persistente.
    pub intermittent_pattern: Option<bool>,
    /// `present` → conservato, `low`/`reduced` → ridotto.
    pub desire_preserved: Option<bool>,
    /// `high` → alto, `low` → basso, `moderate` → sconosciuto.
    pub stress_high: Option<bool>,
    /// `reduced`/`rare` → ridotte, `normal`/`often` → normali.
    pub morning_erection_reduced: Option<bool>,
    /// Richiesta esplicita di farmaci.
    pub user_requests_meds: Option<bool>,
}

/// Mappa lo stato nei cinque segnali.
#[must_use]
pub fn normalize(state: &State) -> Signals {
    Signals {
        intermittent_pattern: enumerated(state.frequency.as_ref(), &["sometimes"], &["always"]),
        desire_preserved: enumerated(state.desire.as_ref(), &["present"], &["low", "reduced"]),
        stress_high: enumerated(state.stress.as_ref(), &["high"], &["low"]),
        morning_erection_reduced: enumerated(
            state.morning_erection.as_ref(),
            &["reduced", "rare"],
            &["normal", "often"],
        ),
        user_requests_meds: loose_bool(state.wants_meds.as_ref()),
    }
}

/// Confronto esatto su stringhe enumerate.
fn enumerated(value: Option<&Value>, truthy: &[&str], falsy: &[&str]) -> Option<bool> {
    let raw = value.and_then(Value::as_str)?;
    if truthy.contains(&raw) {
        Some(true)
    } else if falsy.contains(&raw) {
        Some(false)
    } else {
        None
    }
}

/// Booleano "largo": `true`/`false` JSON oppure stringhe sì/no (case-insensitive).
fn loose_bool(value: Option<&Value>) -> Option<bool> {
    match value? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "yes" | "true" | "1" | "y" => Some(true),
            "no" | "false" | "0" | "n" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn signals(value: Value) -> Signals {
        normalize(&State::from_map(value.as_object().unwrap()))
    }

    #[test]
    fn frequency_mapping() {
        assert_eq!(signals(json!({"frequency": "sometimes"})).intermittent_pattern, Some(true));
        assert_eq!(signals(json!({"frequency": "always"})).intermittent_pattern, Some(false));
        assert_eq!(signals(json!({"frequency": "daily"})).intermittent_pattern, None);
        assert_eq!(signals(json!({"frequency": ""})).intermittent_pattern, None);
        assert_eq!(signals(json!({"frequency": 7})).intermittent_pattern, None);
        assert_eq!(signals(json!({})).intermittent_pattern, None);
    }

    #[test]
    fn desire_and_stress_mapping() {
        assert_eq!(signals(json!({"desire": "present"})).desire_preserved, Some(true));
        assert_eq!(signals(json!({"desire": "reduced"})).desire_preserved, Some(false));
        assert_eq!(signals(json!({"desire": "low"})).desire_preserved, Some(false));
        assert_eq!(signals(json!({"stress": "high"})).stress_high, Some(true));
        assert_eq!(signals(json!({"stress": "low"})).stress_high, Some(false));
        assert_eq!(signals(json!({"stress": "moderate"})).stress_high, None);
    }

    #[test]
    fn morning_erection_mapping() {
        for (raw, expected) in [
            ("reduced", Some(true)),
            ("rare", Some(true)),
            ("normal", Some(false)),
            ("often", Some(false)),
            ("sometimes", None),
        ] {
            assert_eq!(
                signals(json!({ "morning_erection": raw })).morning_erection_reduced,
                expected,
                "morning_erection={raw}"
            );
        }
    }

    #[test]
    fn wants_meds_is_loose() {
        assert_eq!(signals(json!({"wants_meds": true})).user_requests_meds, Some(true));
        assert_eq!(signals(json!({"wants_meds": false})).user_requests_meds, Some(false));
        assert_eq!(signals(json!({"wants_meds": " YES "})).user_requests_meds, Some(true));
        assert_eq!(signals(json!({"wants_meds": "Y"})).user_requests_meds, Some(true));
        assert_eq!(signals(json!({"wants_meds": "0"})).user_requests_meds, Some(false));
        assert_eq!(signals(json!({"wants_meds": "maybe"})).user_requests_meds, None);
        assert_eq!(signals(json!({"wants_meds": 1})).user_requests_meds, None);
        assert_eq!(signals(json!({"wants_meds": null})).user_requests_meds, None);
    }

    #[test]
    fn enumerations_are_case_sensitive() {
        assert_eq!(signals(json!({"frequency": "Sometimes"})).intermittent_pattern, None);
    }
}
