//! Stato riportato dall'utente e contesto di provenienza, in forma tipizzata.
//!
//! I campi riconosciuti sono espliciti; tutto il resto finisce in
//! [`State::extra`] e viene ignorato dal motore. I valori dei campi
//! enumerati restano grezzi (`serde_json::Value`): è il normalizzatore a
//! decidere cosa significano, e l'evidenza deve poter registrare il valore
//! esattamente come è arrivato.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Campi per cui viene sempre registrata un'evidenza, in ordine fisso.
pub const EVIDENCE_FIELDS: [&str; 7] = [
    "frequency",
    "desire",
    "stress",
    "morning_erection",
    "wants_meds",
    "country",
    "safety_flags",
];

/// Provenienza dei dati.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Source {
    /// Dichiarato dall'utente.
    User,
    /// Misurato da un dispositivo.
    Device,
    /// Riportato da un clinico.
    Clinician,
    /// Provenienza non dichiarata o non riconosciuta.
    #[default]
    Unknown,
}

impl Source {
    /// Tutte le provenienze ammesse.
    pub const ALL: [Self; 4] = [Self::User, Self::Device, Self::Clinician, Self::Unknown];

    /// Forma serializzata.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Device => "DEVICE",
            Self::Clinician => "CLINICIAN",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Interpreta un valore grezzo; qualsiasi cosa non riconosciuta è `Unknown`.
    #[must_use]
    pub fn from_value(value: Option<&Value>) -> Self {
        match value.and_then(Value::as_str) {
            Some("USER") => Self::User,
            Some("DEVICE") => Self::Device,
            Some("CLINICIAN") => Self::Clinician,
            _ => Self::Unknown,
        }
    }
}

/// Metadati di provenienza della richiesta.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    /// Provenienza dichiarata.
    pub source: Source,
    /// Età dei dati in giorni, così come è arrivata (anche se non numerica).
    pub recency_days: Option<Value>,
}

impl Context {
    /// Costruisce il contesto da un oggetto JSON; le chiavi mancanti prendono il default.
    #[must_use]
    pub fn from_map(map: &Map<String, Value>) -> Self {
        Self {
            source: Source::from_value(map.get("source")),
            recency_days: map.get("recency_days").filter(|v| !v.is_null()).cloned(),
        }
    }
}

/// Record che segnala evidenze contraddittorie su un campo.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conflict {
    /// Campo in conflitto, se dichiarato.
    pub field: Option<String>,
    /// Resto del record (es. i due valori in contrasto).
    pub details: Map<String, Value>,
}

impl Conflict {
    fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };
        let field = obj
            .get("field")
            .and_then(Value::as_str)
            .filter(|f| !f.is_empty())
            .map(str::to_string);
        let details = obj
            .iter()
            .filter(|(k, _)| k.as_str() != "field")
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Self { field, details }
    }
}

/// Stato riportato dall'utente.
///
/// Per i campi `Option<Value>`: `None` significa chiave assente,
/// `Some(Value::Null)` chiave presente ma nulla.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct State {
    /// Frequenza del sintomo (`sometimes` / `always`).
    pub frequency: Option<Value>,
    /// Desiderio (`present` / `low` / `reduced`).
    pub desire: Option<Value>,
    /// Livello di stress (`high` / `moderate` / `low`).
    pub stress: Option<Value>,
    /// Erezioni mattutine (`normal` / `often` / `reduced` / `rare`).
    pub morning_erection: Option<Value>,
    /// Richiesta di supporto farmacologico (booleano o stringa).
    pub wants_meds: Option<Value>,
    /// Paese dell'utente, usato per l'orientamento in caso di escalation.
    pub country: Option<Value>,
    /// Codici red flag già estratti a monte; le voci non stringa sono scartate.
    pub safety_flags: Option<Vec<String>>,
    /// Valore di `safety_flags` esattamente come è arrivato, per l'evidenza.
    pub safety_flags_raw: Option<Value>,
    /// Record di conflitto.
    pub conflicts: Vec<Conflict>,
    /// Chiavi non riconosciute, conservate ma ignorate.
    pub extra: BTreeMap<String, Value>,
}

impl State {
    /// Costruisce lo stato tipizzato da un oggetto JSON. Non fallisce mai.
    #[must_use]
    pub fn from_map(map: &Map<String, Value>) -> Self {
        let mut state = Self::default();
        for (key, value) in map {
            match key.as_str() {
                "frequency" => state.frequency = Some(value.clone()),
                "desire" => state.desire = Some(value.clone()),
                "stress" => state.stress = Some(value.clone()),
                "morning_erection" => state.morning_erection = Some(value.clone()),
                "wants_meds" => state.wants_meds = Some(value.clone()),
                "country" => state.country = Some(value.clone()),
                "safety_flags" => {
                    let codes = value
                        .as_array()
                        .map(|items| {
                            items
                                .iter()
                                .filter_map(Value::as_str)
                                .map(str::to_string)
                                .collect()
                        })
                        .unwrap_or_default();
                    state.safety_flags = Some(codes);
                    state.safety_flags_raw = Some(value.clone());
                }
                "conflicts" => {
                    // Un valore singolo non vuoto conta come un record.
                    state.conflicts = match value {
                        Value::Array(items) => items.iter().map(Conflict::from_value).collect(),
                        other if is_truthy(other) => vec![Conflict::from_value(other)],
                        _ => Vec::new(),
                    };
                }
                _ => {
                    state.extra.insert(key.clone(), value.clone());
                }
            }
        }
        state
    }

    /// Valore grezzo di un campo riconosciuto, `None` se la chiave è assente.
    #[must_use]
    pub fn raw(&self, field: &str) -> Option<Value> {
        match field {
            "frequency" => self.frequency.clone(),
            "desire" => self.desire.clone(),
            "stress" => self.stress.clone(),
            "morning_erection" => self.morning_erection.clone(),
            "wants_meds" => self.wants_meds.clone(),
            "country" => self.country.clone(),
            "safety_flags" => self.safety_flags_raw.clone(),
            _ => None,
        }
    }

    /// `true` se il campo è assente oppure nullo.
    #[must_use]
    pub fn is_absent(&self, field: &str) -> bool {
        self.raw(field).map_or(true, |v| v.is_null())
    }

    /// Codici red flag dichiarati (vuoto se assenti).
    #[must_use]
    pub fn safety_flag_codes(&self) -> &[String] {
        self.safety_flags.as_deref().unwrap_or_default()
    }

    /// Campi nominati dai record di conflitto.
    #[must_use]
    pub fn conflict_fields(&self) -> BTreeSet<&str> {
        self.conflicts
            .iter()
            .filter_map(|c| c.field.as_deref())
            .collect()
    }

    /// `true` se `wants_meds` è esattamente il booleano `true`.
    #[must_use]
    pub fn wants_meds_is_true(&self) -> bool {
        matches!(self.wants_meds, Some(Value::Bool(true)))
    }

    /// `true` se il paese è stato fornito con un valore significativo.
    #[must_use]
    pub fn has_country(&self) -> bool {
        self.country.as_ref().is_some_and(is_truthy)
    }
}

/// Input canonico del motore: `{state, context}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationInput {
    /// Stato riportato.
    pub state: State,
    /// Contesto di provenienza.
    pub context: Context,
}

/// Un valore "vuoto" (null, false, zero, stringa o collezione vuota) non conta come fornito.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn recognized_fields_are_typed_and_extras_kept_aside() {
        let state = State::from_map(&obj(json!({
            "frequency": "always",
            "wants_meds": true,
            "favourite_colour": "blue",
        })));

        assert_eq!(state.frequency, Some(json!("always")));
        assert!(state.wants_meds_is_true());
        assert_eq!(state.extra.get("favourite_colour"), Some(&json!("blue")));
        assert!(state.desire.is_none());
    }

    #[test]
    fn null_and_missing_are_both_absent() {
        let state = State::from_map(&obj(json!({"frequency": null})));
        assert!(state.is_absent("frequency"));
        assert!(state.is_absent("desire"));
        assert_eq!(state.raw("frequency"), Some(Value::Null));
        assert_eq!(state.raw("desire"), None);
    }

    #[test]
    fn safety_flags_keep_only_strings() {
        let state = State::from_map(&obj(json!({"safety_flags": ["RED_FLAG_NEURO", 3, null]})));
        assert_eq!(state.safety_flag_codes(), ["RED_FLAG_NEURO".to_string()]);
    }

    #[test]
    fn raw_safety_flags_are_kept_for_evidence() {
        let state = State::from_map(&obj(json!({"safety_flags": ["RED_FLAG_NEURO_TYPO", 7]})));
        assert_eq!(state.raw("safety_flags"), Some(json!(["RED_FLAG_NEURO_TYPO", 7])));
        assert_eq!(state.safety_flag_codes(), ["RED_FLAG_NEURO_TYPO".to_string()]);

        let state = State::from_map(&obj(json!({"safety_flags": null})));
        assert_eq!(state.raw("safety_flags"), Some(Value::Null));
        assert!(state.safety_flag_codes().is_empty());

        assert_eq!(State::default().raw("safety_flags"), None);
    }

    #[test]
    fn single_conflict_object_counts_as_one_record() {
        let state = State::from_map(&obj(json!({
            "conflicts": {"field": "frequency", "a": "always", "b": "sometimes"}
        })));
        assert_eq!(state.conflicts.len(), 1);
        assert_eq!(state.conflict_fields().into_iter().collect::<Vec<_>>(), vec!["frequency"]);

        let state = State::from_map(&obj(json!({"conflicts": "frequency disagrees"})));
        assert_eq!(state.conflicts.len(), 1);
        assert!(state.conflict_fields().is_empty());

        for empty in [json!(null), json!(""), json!({}), json!(false)] {
            let state = State::from_map(&obj(json!({ "conflicts": empty })));
            assert!(state.conflicts.is_empty(), "conflicts={empty}");
        }
    }

    #[test]
    fn non_numeric_recency_is_kept_as_received() {
        let ctx = Context::from_map(&obj(json!({"recency_days": "yesterday"})));
        assert_eq!(ctx.recency_days, Some(json!("yesterday")));
        assert_eq!(Context::from_map(&obj(json!({"recency_days": null}))).recency_days, None);
    }

    #[test]
    fn conflicts_collect_named_fields() {
        let state = State::from_map(&obj(json!({
            "conflicts": [
                {"field": "frequency", "a": "always", "b": "sometimes"},
                {"field": ""},
                "garbage",
            ]
        })));

        assert_eq!(state.conflicts.len(), 3);
        assert_eq!(state.conflict_fields().into_iter().collect::<Vec<_>>(), vec!["frequency"]);
        assert_eq!(state.conflicts[0].details.get("a"), Some(&json!("always")));
    }

    #[test]
    fn country_truthiness() {
        for (value, expected) in [
            (json!("CO"), true),
            (json!(""), false),
            (json!(null), false),
            (json!(0), false),
            (json!(["CO"]), true),
        ] {
            let state = State::from_map(&obj(json!({ "country": value })));
            assert_eq!(state.has_country(), expected, "country={value}");
        }
        assert!(!State::default().has_country());
    }

    #[test]
    fn context_defaults_and_unknown_source() {
        let ctx = Context::from_map(&obj(json!({"source": "ROBOT", "recency_days": 2})));
        assert_eq!(ctx.source, Source::Unknown);
        assert_eq!(ctx.recency_days, Some(json!(2)));

        let ctx = Context::from_map(&Map::new());
        assert_eq!(ctx, Context::default());

        let ctx = Context::from_map(&obj(json!({"source": "CLINICIAN"})));
        assert_eq!(ctx.source, Source::Clinician);
    }
}
