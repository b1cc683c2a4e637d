//! Contratto del Decision Report v0.3.
//!
//! [`validate_report`] controlla la forma *serializzata* del report: le
//! chiavi e le enumerazioni sono quelle che vede il consumatore, non quelle
//! che il sistema di tipi garantisce a monte. Restituisce la lista delle
//! violazioni (vuota = valido). Il motore la usa come auto-controllo
//! non bloccante.
//!
//! [`decision_report_schema`] espone lo JSON Schema del contratto per gli
//! adapter che vogliono pubblicarlo.

use serde_json::{json, Map, Value};

use crate::error::EngineResult;
use crate::report::{DecisionStatus, Report, SafetyAction, SafetyStatus, REPORT_SCHEMA_VERSION};
use crate::rules::DecisionPath;
use crate::state::Source;

const TOP_LEVEL_KEYS: [&str; 6] = ["ok", "errors", "versions", "decision", "safety", "trace"];
const VERSION_KEYS: [&str; 3] = ["engine", "ruleset", "safety_policy"];
const DECISION_KEYS: [&str; 6] = [
    "status",
    "path",
    "flags",
    "reasons",
    "recommendations",
    "required_fields",
];
const SAFETY_KEYS: [&str; 5] = [
    "status",
    "action",
    "triggers",
    "user_guidance_required_fields",
    "policy_version",
];
const TRACE_KEYS: [&str; 5] = [
    "policy_trace",
    "rules_evaluated",
    "rules_triggered",
    "evidence",
    "uncertainty_notes",
];
const POLICY_TRACE_KEYS: [&str; 2] = ["evaluated", "triggered"];
const EVIDENCE_KEYS: [&str; 5] = ["value", "source", "recency_days", "confidence", "contradiction"];
const ERROR_KEYS: [&str; 4] = ["code", "message", "path", "meta"];

/// Valida un report tipizzato passando dalla sua forma JSON.
///
/// # Errors
///
/// Fallisce solo se il report non è serializzabile.
pub fn validate(report: &Report) -> EngineResult<Vec<String>> {
    let value = serde_json::to_value(report)?;
    Ok(validate_report(&value))
}

/// Controlla un report serializzato contro il contratto v0.3.
#[must_use]
pub fn validate_report(report: &Value) -> Vec<String> {
    let mut problems = Vec::new();

    let Some(root) = report.as_object() else {
        return vec!["report must be an object".to_string()];
    };

    for key in TOP_LEVEL_KEYS {
        if !root.contains_key(key) {
            problems.push(format!("missing field: {key}"));
        }
    }
    unexpected_keys(root, &TOP_LEVEL_KEYS, "report", &mut problems);

    if root.get("ok").is_some_and(|v| !v.is_boolean()) {
        problems.push("ok must be boolean".to_string());
    }

    let empty = Map::new();
    let safety = object_or_empty(root.get("safety"), &empty);
    let decision = object_or_empty(root.get("decision"), &empty);
    let trace = object_or_empty(root.get("trace"), &empty);
    let versions = object_or_empty(root.get("versions"), &empty);

    check_errors(root.get("errors"), &mut problems);

    // safety
    if !in_enum(safety.get("status"), &SafetyStatus::ALL.map(|s| s.as_str())) {
        problems.push("safety.status invalid or missing".to_string());
    }
    if !in_enum(safety.get("action"), &SafetyAction::ALL.map(|a| a.as_str())) {
        problems.push("safety.action invalid or missing".to_string());
    }
    string_list(safety.get("triggers"), "safety.triggers", &mut problems);
    string_list(
        safety.get("user_guidance_required_fields"),
        "safety.user_guidance_required_fields",
        &mut problems,
    );
    if !safety.get("policy_version").is_some_and(Value::is_string) {
        problems.push("safety.policy_version must be string".to_string());
    }
    unexpected_keys(safety, &SAFETY_KEYS, "safety", &mut problems);

    // decision
    if !in_enum(decision.get("status"), &DecisionStatus::ALL.map(|s| s.as_str())) {
        problems.push("decision.status invalid or missing".to_string());
    }
    match decision.get("path") {
        None | Some(Value::Null) => {}
        Some(path) if in_enum(Some(path), &DecisionPath::ALL.map(|p| p.as_str())) => {}
        Some(_) => problems.push("decision.path invalid".to_string()),
    }
    for key in ["flags", "reasons", "recommendations", "required_fields"] {
        string_list(decision.get(key), &format!("decision.{key}"), &mut problems);
    }
    unexpected_keys(decision, &DECISION_KEYS, "decision", &mut problems);

    // versions
    for key in VERSION_KEYS {
        if !versions
            .get(key)
            .and_then(Value::as_str)
            .is_some_and(|v| !v.is_empty())
        {
            problems.push(format!("versions.{key} must be non-empty string"));
        }
    }
    unexpected_keys(versions, &VERSION_KEYS, "versions", &mut problems);

    // trace
    let policy_trace = object_or_empty(trace.get("policy_trace"), &empty);
    string_list(policy_trace.get("evaluated"), "trace.policy_trace.evaluated", &mut problems);
    string_list(policy_trace.get("triggered"), "trace.policy_trace.triggered", &mut problems);
    unexpected_keys(policy_trace, &POLICY_TRACE_KEYS, "trace.policy_trace", &mut problems);
    string_list(trace.get("rules_evaluated"), "trace.rules_evaluated", &mut problems);
    string_list(trace.get("rules_triggered"), "trace.rules_triggered", &mut problems);
    match trace.get("evidence") {
        Some(Value::Object(evidence)) => check_evidence(evidence, &mut problems),
        _ => problems.push("trace.evidence must be object".to_string()),
    }
    string_list(trace.get("uncertainty_notes"), "trace.uncertainty_notes", &mut problems);
    unexpected_keys(trace, &TRACE_KEYS, "trace", &mut problems);

    // invarianti incrociate
    let status = decision.get("status").and_then(Value::as_str);
    let path = decision.get("path").and_then(Value::as_str);

    if safety.get("status").and_then(Value::as_str) == Some(SafetyStatus::Triggered.as_str()) {
        if status != Some(DecisionStatus::Escalated.as_str()) {
            problems.push("If safety.TRIGGERED, decision.status must be ESCALATED".to_string());
        }
        if path != Some(DecisionPath::EscalateHuman.as_str()) {
            problems.push("If safety.TRIGGERED, decision.path must be PATH_ESCALATE_HUMAN".to_string());
        }
    }

    if status == Some(DecisionStatus::Escalated.as_str())
        && path != Some(DecisionPath::EscalateHuman.as_str())
    {
        problems.push("If decision.ESCALATED, decision.path must be PATH_ESCALATE_HUMAN".to_string());
    }

    let required_len = decision
        .get("required_fields")
        .and_then(Value::as_array)
        .map(Vec::len);

    if status == Some(DecisionStatus::NeedsMoreInfo.as_str()) && required_len.unwrap_or(0) == 0 {
        problems.push(
            "If decision.NEEDS_MORE_INFO, decision.required_fields must be non-empty list"
                .to_string(),
        );
    }

    if status == Some(DecisionStatus::Decided.as_str()) && required_len.unwrap_or(0) > 0 {
        problems.push("If decision.DECIDED, decision.required_fields must be empty".to_string());
    }

    if status == Some(DecisionStatus::Conflict.as_str()) {
        let mentions_conflict = trace
            .get("uncertainty_notes")
            .and_then(Value::as_array)
            .is_some_and(|notes| {
                notes.iter().any(|n| {
                    n.as_str()
                        .is_some_and(|s| s.to_lowercase().contains("conflict"))
                })
            });
        if !mentions_conflict {
            problems.push(
                "If decision.CONFLICT, trace.uncertainty_notes must mention conflict".to_string(),
            );
        }
    }

    problems
}

fn object_or_empty<'a>(
    value: Option<&'a Value>,
    empty: &'a Map<String, Value>,
) -> &'a Map<String, Value> {
    value.and_then(Value::as_object).unwrap_or(empty)
}

fn in_enum(value: Option<&Value>, allowed: &[&str]) -> bool {
    value
        .and_then(Value::as_str)
        .is_some_and(|v| allowed.contains(&v))
}

fn string_list(value: Option<&Value>, name: &str, problems: &mut Vec<String>) {
    match value.and_then(Value::as_array) {
        Some(items) if items.iter().all(Value::is_string) => {}
        Some(_) => problems.push(format!("{name} must contain only strings")),
        None => problems.push(format!("{name} must be list")),
    }
}

fn unexpected_keys(
    object: &Map<String, Value>,
    allowed: &[&str],
    name: &str,
    problems: &mut Vec<String>,
) {
    for key in object.keys() {
        if !allowed.contains(&key.as_str()) {
            problems.push(format!("{name} has unexpected field: {key}"));
        }
    }
}

fn check_errors(value: Option<&Value>, problems: &mut Vec<String>) {
    let Some(errors) = value else {
        return;
    };
    let Some(errors) = errors.as_array() else {
        problems.push("errors must be list".to_string());
        return;
    };
    for (i, err) in errors.iter().enumerate() {
        let Some(err) = err.as_object() else {
            problems.push(format!("errors[{i}] must be object"));
            continue;
        };
        for key in ["code", "message", "path"] {
            if !err.get(key).is_some_and(Value::is_string) {
                problems.push(format!("errors[{i}].{key} must be string"));
            }
        }
        unexpected_keys(err, &ERROR_KEYS, &format!("errors[{i}]"), problems);
    }
}

fn check_evidence(evidence: &Map<String, Value>, problems: &mut Vec<String>) {
    let sources = Source::ALL.map(|s| s.as_str());
    for (field, entry) in evidence {
        let Some(entry) = entry.as_object() else {
            problems.push(format!("trace.evidence.{field} must be object"));
            continue;
        };
        for key in EVIDENCE_KEYS {
            if !entry.contains_key(key) {
                problems.push(format!("trace.evidence.{field} missing field: {key}"));
            }
        }
        if entry.contains_key("source") && !in_enum(entry.get("source"), &sources) {
            problems.push(format!("trace.evidence.{field}.source invalid"));
        }
        match entry.get("recency_days") {
            None | Some(Value::Null | Value::Number(_)) => {}
            Some(_) => problems.push(format!("trace.evidence.{field}.recency_days must be number or null")),
        }
        match entry.get("confidence") {
            None | Some(Value::Null) => {}
            Some(Value::Number(n)) if n.as_f64().is_some_and(|c| (0.0..=1.0).contains(&c)) => {}
            Some(_) => problems.push(format!("trace.evidence.{field}.confidence must be in [0, 1] or null")),
        }
        if entry.get("contradiction").is_some_and(|v| !v.is_boolean()) {
            problems.push(format!("trace.evidence.{field}.contradiction must be boolean"));
        }
        unexpected_keys(entry, &EVIDENCE_KEYS, &format!("trace.evidence.{field}"), problems);
    }
}

/// JSON Schema (draft 2020-12) del Decision Report v0.3.
#[must_use]
pub fn decision_report_schema() -> Value {
    let string_array = json!({"type": "array", "items": {"type": "string"}});

    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "$id": "https://soficca.ai/schemas/decision_report_v0_3.json",
        "title": format!("Soficca Decision Report {REPORT_SCHEMA_VERSION}"),
        "type": "object",
        "additionalProperties": false,
        "required": TOP_LEVEL_KEYS,
        "properties": {
            "ok": {"type": "boolean"},
            "errors": {
                "type": "array",
                "items": {
                    "type": "object",
                    "additionalProperties": false,
                    "required": ["code", "message", "path"],
                    "properties": {
                        "code": {"type": "string"},
                        "message": {"type": "string"},
                        "path": {"type": "string"},
                        "meta": {"type": "object"},
                    },
                },
            },
            "versions": {
                "type": "object",
                "additionalProperties": false,
                "required": VERSION_KEYS,
                "properties": {
                    "engine": {"type": "string"},
                    "ruleset": {"type": "string"},
                    "safety_policy": {"type": "string"},
                },
            },
            "decision": {
                "type": "object",
                "additionalProperties": false,
                "required": ["status", "path", "flags", "reasons", "recommendations"],
                "properties": {
                    "status": {"type": "string", "enum": DecisionStatus::ALL.map(|s| s.as_str())},
                    "path": {
                        "type": ["string", "null"],
                        "enum": path_enum(),
                    },
                    "flags": string_array,
                    "reasons": string_array,
                    "recommendations": string_array,
                    "required_fields": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "If NEEDS_MORE_INFO, fields required to progress.",
                    },
                },
            },
            "safety": {
                "type": "object",
                "additionalProperties": false,
                "required": SAFETY_KEYS,
                "properties": {
                    "status": {"type": "string", "enum": SafetyStatus::ALL.map(|s| s.as_str())},
                    "action": {"type": "string", "enum": SafetyAction::ALL.map(|a| a.as_str())},
                    "triggers": string_array,
                    "user_guidance_required_fields": string_array,
                    "policy_version": {"type": "string"},
                },
            },
            "trace": {
                "type": "object",
                "additionalProperties": false,
                "required": TRACE_KEYS,
                "properties": {
                    "policy_trace": {
                        "type": "object",
                        "additionalProperties": false,
                        "required": POLICY_TRACE_KEYS,
                        "properties": {
                            "evaluated": string_array,
                            "triggered": string_array,
                        },
                    },
                    "rules_evaluated": string_array,
                    "rules_triggered": string_array,
                    "evidence": {
                        "type": "object",
                        "additionalProperties": {
                            "type": "object",
                            "additionalProperties": false,
                            "required": EVIDENCE_KEYS,
                            "properties": {
                                "value": {},
                                "source": {"type": "string", "enum": Source::ALL.map(|s| s.as_str())},
                                "recency_days": {"type": ["number", "null"]},
                                "confidence": {"type": ["number", "null"], "minimum": 0, "maximum": 1},
                                "contradiction": {"type": "boolean"},
                            },
                        },
                    },
                    "uncertainty_notes": string_array,
                },
            },
        },
    })
}

fn path_enum() -> Value {
    let mut paths: Vec<Value> = DecisionPath::ALL.iter().map(|p| Value::from(p.as_str())).collect();
    paths.push(Value::Null);
    Value::Array(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{ErrorCode, ReportError};

    fn valid_report() -> Value {
        serde_json::to_value(Report::rejected(ReportError::new(ErrorCode::InvalidState, "x"))).unwrap()
    }

    #[test]
    fn rejected_report_satisfies_contract() {
        assert_eq!(validate_report(&valid_report()), Vec::<String>::new());
    }

    #[test]
    fn non_object_report() {
        assert_eq!(validate_report(&json!([])), vec!["report must be an object".to_string()]);
    }

    #[test]
    fn missing_top_level_keys_are_reported() {
        let mut report = valid_report();
        report.as_object_mut().unwrap().remove("versions");
        let problems = validate_report(&report);
        assert!(problems.contains(&"missing field: versions".to_string()));
        assert!(problems.contains(&"versions.engine must be non-empty string".to_string()));
    }

    #[test]
    fn closed_objects_reject_extra_keys() {
        let mut report = valid_report();
        report["decision"]["confidence"] = json!(0.5);
        report["debug"] = json!(true);
        let problems = validate_report(&report);
        assert!(problems.contains(&"decision has unexpected field: confidence".to_string()));
        assert!(problems.contains(&"report has unexpected field: debug".to_string()));
    }

    #[test]
    fn triggered_safety_requires_escalation() {
        let mut report = valid_report();
        report["safety"]["status"] = json!("TRIGGERED");
        report["safety"]["action"] = json!("OVERRIDE_ESCALATE");
        let problems = validate_report(&report);
        assert!(problems.contains(&"If safety.TRIGGERED, decision.status must be ESCALATED".to_string()));
        assert!(problems.contains(
            &"If safety.TRIGGERED, decision.path must be PATH_ESCALATE_HUMAN".to_string()
        ));
    }

    #[test]
    fn needs_more_info_requires_fields() {
        let mut report = valid_report();
        report["decision"]["required_fields"] = json!([]);
        assert_eq!(
            validate_report(&report),
            vec!["If decision.NEEDS_MORE_INFO, decision.required_fields must be non-empty list".to_string()]
        );
    }

    #[test]
    fn conflict_requires_a_conflict_note() {
        let mut report = valid_report();
        report["decision"]["status"] = json!("CONFLICT");
        report["decision"]["required_fields"] = json!([]);
        assert_eq!(
            validate_report(&report),
            vec!["If decision.CONFLICT, trace.uncertainty_notes must mention conflict".to_string()]
        );

        report["trace"]["uncertainty_notes"] = json!(["CONFLICT in frequency"]);
        assert!(validate_report(&report).is_empty());
    }

    #[test]
    fn escalated_requires_escalation_path() {
        let mut report = valid_report();
        report["decision"]["status"] = json!("ESCALATED");
        report["decision"]["path"] = json!("PATH_MEDS_OK");
        assert_eq!(
            validate_report(&report),
            vec!["If decision.ESCALATED, decision.path must be PATH_ESCALATE_HUMAN".to_string()]
        );
    }

    #[test]
    fn unknown_enumerations_are_flagged() {
        let mut report = valid_report();
        report["decision"]["status"] = json!("MAYBE");
        report["decision"]["path"] = json!("PATH_NOWHERE");
        report["safety"]["action"] = json!("PANIC");
        let problems = validate_report(&report);
        assert!(problems.contains(&"decision.status invalid or missing".to_string()));
        assert!(problems.contains(&"decision.path invalid".to_string()));
        assert!(problems.contains(&"safety.action invalid or missing".to_string()));
    }

    #[test]
    fn evidence_entries_are_checked() {
        let mut report = valid_report();
        report["trace"]["evidence"] = json!({
            "frequency": {
                "value": "always",
                "source": "ROBOT",
                "recency_days": "yesterday",
                "confidence": 1.5,
                "contradiction": false,
            },
            "desire": {"value": null},
        });
        let problems = validate_report(&report);
        assert!(problems.contains(&"trace.evidence.frequency.source invalid".to_string()));
        assert!(problems.contains(
            &"trace.evidence.frequency.recency_days must be number or null".to_string()
        ));
        assert!(problems.contains(
            &"trace.evidence.frequency.confidence must be in [0, 1] or null".to_string()
        ));
        assert!(problems.contains(&"trace.evidence.desire missing field: source".to_string()));
    }

    #[test]
    fn schema_lists_all_enumerations() {
        let schema = decision_report_schema();
        assert_eq!(schema["required"], json!(TOP_LEVEL_KEYS));
        assert_eq!(
            schema["properties"]["decision"]["properties"]["status"]["enum"],
            json!(["DECIDED", "NEEDS_MORE_INFO", "CONFLICT", "ESCALATED"])
        );
        assert_eq!(
            schema["properties"]["decision"]["properties"]["path"]["enum"]
                .as_array()
                .unwrap()
                .len(),
            5
        );
        assert_eq!(schema["title"], json!("Soficca Decision Report v0.3"));
    }
}
