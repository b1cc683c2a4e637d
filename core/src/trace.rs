//! Traccia di audit della valutazione.
//!
//! Il [`TraceBuilder`] è un accumulatore append-only: ogni id viene inserito
//! una sola volta (vince la prima posizione), l'evidenza ha una scrittura per
//! campo e le note di incertezza restano in ordine di inserimento.
//! [`TraceBuilder::finish`] consuma il builder e restituisce una [`Trace`]
//! immutabile: dopo la chiusura non esiste più nulla su cui scrivere.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::rules::ALL_RULE_IDS;
use crate::safety_policy::ALL_POLICY_IDS;
use crate::state::Source;

/// Policy valutate e scattate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyTrace {
    /// Universo completo delle policy valutate.
    pub evaluated: Vec<String>,
    /// Policy scattate, in ordine di prima apparizione.
    pub triggered: Vec<String>,
}

/// Evidenza registrata per un campo dello stato.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceEntry {
    /// Valore grezzo considerato (`null` se assente).
    pub value: Value,
    /// Provenienza dichiarata nel contesto.
    pub source: Source,
    /// Età del dato in giorni, come dichiarata nel contesto.
    pub recency_days: Option<Value>,
    /// Confidenza in `[0, 1]`, `None` se sconosciuta.
    pub confidence: Option<f64>,
    /// `true` se un record di conflitto nomina questo campo.
    pub contradiction: bool,
}

/// Snapshot immutabile della traccia di audit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    policy_trace: PolicyTrace,
    rules_evaluated: Vec<String>,
    rules_triggered: Vec<String>,
    evidence: BTreeMap<String, EvidenceEntry>,
    uncertainty_notes: Vec<String>,
}

impl Trace {
    /// Policy valutate e scattate.
    #[must_use]
    pub const fn policy_trace(&self) -> &PolicyTrace {
        &self.policy_trace
    }

    /// Regole valutate (sempre l'universo completo).
    #[must_use]
    pub fn rules_evaluated(&self) -> &[String] {
        &self.rules_evaluated
    }

    /// Regole effettivamente scattate.
    #[must_use]
    pub fn rules_triggered(&self) -> &[String] {
        &self.rules_triggered
    }

    /// Evidenza per campo.
    #[must_use]
    pub const fn evidence(&self) -> &BTreeMap<String, EvidenceEntry> {
        &self.evidence
    }

    /// Note di incertezza, in ordine.
    #[must_use]
    pub fn uncertainty_notes(&self) -> &[String] {
        &self.uncertainty_notes
    }

    /// `true` se almeno una nota contiene `needle` (case-insensitive).
    #[must_use]
    pub fn notes_mention(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.uncertainty_notes
            .iter()
            .any(|n| n.to_lowercase().contains(&needle))
    }
}

/// Accumulatore della traccia, consumato da [`TraceBuilder::finish`].
#[derive(Debug, Default)]
pub struct TraceBuilder {
    rules_evaluated: Vec<String>,
    rules_triggered: Vec<String>,
    policy_evaluated: Vec<String>,
    policy_triggered: Vec<String>,
    evidence: BTreeMap<String, EvidenceEntry>,
    uncertainty_notes: Vec<String>,
}

impl TraceBuilder {
    /// Builder vuoto.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder con gli universi di regole e policy già registrati come valutati.
    #[must_use]
    pub fn with_full_universes() -> Self {
        let mut tb = Self::new();
        for id in ALL_RULE_IDS {
            tb.add_rule_evaluated(id.as_str());
        }
        for id in ALL_POLICY_IDS {
            tb.add_policy_evaluated(id.as_str());
        }
        tb
    }

    /// Registra una regola valutata.
    pub fn add_rule_evaluated(&mut self, rule_id: &str) {
        push_unique(&mut self.rules_evaluated, rule_id);
    }

    /// Registra una regola scattata.
    pub fn add_rule_triggered(&mut self, rule_id: &str) {
        push_unique(&mut self.rules_triggered, rule_id);
    }

    /// Registra una policy valutata.
    pub fn add_policy_evaluated(&mut self, policy_id: &str) {
        push_unique(&mut self.policy_evaluated, policy_id);
    }

    /// Registra una policy scattata.
    pub fn add_policy_triggered(&mut self, policy_id: &str) {
        push_unique(&mut self.policy_triggered, policy_id);
    }

    /// Registra l'evidenza di un campo. Una seconda scrittura sullo stesso
    /// campo viene ignorata.
    pub fn add_evidence(&mut self, field: &str, entry: EvidenceEntry) {
        self.evidence.entry(field.to_string()).or_insert(entry);
    }

    /// Aggiunge una nota di incertezza.
    pub fn note_uncertainty(&mut self, note: impl Into<String>) {
        self.uncertainty_notes.push(note.into());
    }

    /// Chiude il builder.
    ///
    /// Se per qualche motivo le liste `evaluated` sono vuote vengono riempite
    /// con gli universi completi: la traccia chiusa è sempre completa.
    #[must_use]
    pub fn finish(self) -> Trace {
        let mut rules_evaluated = self.rules_evaluated;
        if rules_evaluated.is_empty() {
            rules_evaluated = ALL_RULE_IDS.iter().map(|id| id.as_str().to_string()).collect();
        }
        let mut policy_evaluated = self.policy_evaluated;
        if policy_evaluated.is_empty() {
            policy_evaluated = ALL_POLICY_IDS
                .iter()
                .map(|id| id.as_str().to_string())
                .collect();
        }

        Trace {
            policy_trace: PolicyTrace {
                evaluated: policy_evaluated,
                triggered: self.policy_triggered,
            },
            rules_evaluated,
            rules_triggered: self.rules_triggered,
            evidence: self.evidence,
            uncertainty_notes: self.uncertainty_notes,
        }
    }
}

fn push_unique(list: &mut Vec<String>, id: &str) {
    if !list.iter().any(|existing| existing == id) {
        list.push(id.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(value: Value) -> EvidenceEntry {
        EvidenceEntry {
            value,
            source: Source::User,
            recency_days: None,
            confidence: Some(1.0),
            contradiction: false,
        }
    }

    #[test]
    fn ids_are_deduplicated_first_position_wins() {
        let mut tb = TraceBuilder::new();
        tb.add_rule_triggered("B");
        tb.add_rule_triggered("A");
        tb.add_rule_triggered("B");
        tb.add_policy_triggered("P");
        tb.add_policy_triggered("P");

        let trace = tb.finish();
        assert_eq!(trace.rules_triggered(), ["B".to_string(), "A".to_string()]);
        assert_eq!(trace.policy_trace().triggered, vec!["P".to_string()]);
    }

    #[test]
    fn finish_fills_empty_universes() {
        let trace = TraceBuilder::new().finish();
        assert_eq!(trace.rules_evaluated().len(), ALL_RULE_IDS.len());
        assert_eq!(trace.policy_trace().evaluated.len(), ALL_POLICY_IDS.len());
    }

    #[test]
    fn evidence_first_write_wins() {
        let mut tb = TraceBuilder::new();
        tb.add_evidence("frequency", entry(Value::from("always")));
        tb.add_evidence("frequency", entry(Value::from("sometimes")));

        let trace = tb.finish();
        assert_eq!(trace.evidence()["frequency"].value, Value::from("always"));
    }

    #[test]
    fn notes_keep_order_and_match_case_insensitively() {
        let mut tb = TraceBuilder::new();
        tb.note_uncertainty("first");
        tb.note_uncertainty("Conflict detected");

        let trace = tb.finish();
        assert_eq!(trace.uncertainty_notes()[0], "first");
        assert!(trace.notes_mention("conflict"));
        assert!(!trace.notes_mention("missing"));
    }

    #[test]
    fn serialized_shape_matches_contract() {
        let trace = TraceBuilder::with_full_universes().finish();
        let value = serde_json::to_value(&trace).unwrap();
        let mut keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec![
                "evidence",
                "policy_trace",
                "rules_evaluated",
                "rules_triggered",
                "uncertainty_notes"
            ]
        );
    }
}
