//! Contatore in memoria dei report prodotti nella sessione.
//!
//! Nessuna persistenza: si azzera con `:reset` o alla fine del processo.

use serde_json::{json, Value};
use soficca_core::{DecisionStatus, Report};

/// Snapshot immutabile dei contatori.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TallySnapshot {
    /// Report prodotti in totale.
    pub total: u64,
    /// Report `DECIDED`.
    pub decided: u64,
    /// Report `NEEDS_MORE_INFO`.
    pub needs_more_info: u64,
    /// Report `CONFLICT`.
    pub conflict: u64,
    /// Report `ESCALATED`.
    pub escalated: u64,
    /// Report con `ok == false`.
    pub not_ok: u64,
}

impl TallySnapshot {
    /// Forma JSON stampata da `:stats`.
    pub fn to_value(self) -> Value {
        json!({
            "total": self.total,
            "DECIDED": self.decided,
            "NEEDS_MORE_INFO": self.needs_more_info,
            "CONFLICT": self.conflict,
            "ESCALATED": self.escalated,
            "not_ok": self.not_ok,
        })
    }
}

/// Conta i report per stato della decisione.
#[derive(Debug, Default)]
pub struct StatusTally {
    counts: TallySnapshot,
}

impl StatusTally {
    /// Contatori azzerati.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra un report.
    pub fn record(&mut self, report: &Report) {
        let c = &mut self.counts;
        c.total = c.total.saturating_add(1);

        let slot = match report.decision.status {
            DecisionStatus::Decided => &mut c.decided,
            DecisionStatus::NeedsMoreInfo => &mut c.needs_more_info,
            DecisionStatus::Conflict => &mut c.conflict,
            DecisionStatus::Escalated => &mut c.escalated,
        };
        *slot = slot.saturating_add(1);

        if !report.ok {
            c.not_ok = c.not_ok.saturating_add(1);
        }
    }

    /// Stato corrente dei contatori.
    pub const fn snapshot(&self) -> TallySnapshot {
        self.counts
    }

    /// Azzera tutto.
    pub fn reset(&mut self) {
        self.counts = TallySnapshot::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use soficca_core::evaluate;

    #[test]
    fn counts_by_status_and_failures() {
        let mut tally = StatusTally::new();
        tally.record(&evaluate(&json!({"state": {"frequency": "always"}})));
        tally.record(&evaluate(&json!({"state": {}})));
        tally.record(&evaluate(&json!("nope")));
        tally.record(&evaluate(&json!({"state": {"safety_flags": ["RED_FLAG_NEURO"]}})));

        let snap = tally.snapshot();
        assert_eq!(snap.total, 4);
        assert_eq!(snap.decided, 1);
        assert_eq!(snap.needs_more_info, 2);
        assert_eq!(snap.escalated, 1);
        assert_eq!(snap.conflict, 0);
        assert_eq!(snap.not_ok, 1);
    }

    #[test]
    fn reset_clears_counts() {
        let mut tally = StatusTally::new();
        tally.record(&evaluate(&json!({"state": {"conflicts": [{}]}})));
        assert_eq!(tally.snapshot().conflict, 1);

        tally.reset();
        assert_eq!(tally.snapshot(), TallySnapshot::default());
    }

    #[test]
    fn snapshot_json_uses_status_names() {
        let value = TallySnapshot {
            total: 2,
            decided: 2,
            ..TallySnapshot::default()
        }
        .to_value();
        assert_eq!(value["DECIDED"], json!(2));
        assert_eq!(value["ESCALATED"], json!(0));
        assert_eq!(value["total"], json!(2));
    }
}
