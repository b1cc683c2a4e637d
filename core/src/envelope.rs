//! Validazione strutturale dell'envelope in ingresso.
//!
//! Forma canonica: `{"state": {...}, "context": {...}}`, con `context`
//! opzionale. La vecchia forma `{"context": {"chat_state": {"slots": ...}}}`
//! viene tradotta da [`translate_legacy`] prima che il motore veda
//! qualsiasi cosa: il core lavora solo su [`EvaluationInput`].

use serde_json::{Map, Value};

use crate::error::StructuralError;
use crate::state::{is_truthy, Context, EvaluationInput, State};

/// Valida l'envelope e produce l'input canonico.
///
/// # Errors
///
/// - [`StructuralError::InvalidType`] se l'envelope non è un oggetto;
/// - [`StructuralError::InvalidState`] se non si ricava un oggetto `state`;
/// - [`StructuralError::InvalidContext`] se `context` c'è ma non è un oggetto.
pub fn parse_envelope(input: &Value) -> Result<EvaluationInput, StructuralError> {
    let envelope = input.as_object().ok_or(StructuralError::InvalidType)?;

    let mut state = envelope.get("state").filter(|v| !v.is_null()).cloned();
    let mut context = envelope.get("context").filter(|v| !v.is_null()).cloned();

    if state.is_none() {
        if let Some(ctx) = context.as_ref().and_then(Value::as_object) {
            state = translate_legacy(ctx).map(Value::Object);
        }
    }

    let state = match state {
        Some(Value::Object(map)) => map,
        _ => return Err(StructuralError::InvalidState),
    };

    let context = match context.take() {
        None => Map::new(),
        Some(Value::Object(map)) => map,
        Some(_) => return Err(StructuralError::InvalidContext),
    };

    Ok(EvaluationInput {
        state: State::from_map(&state),
        context: Context::from_map(&context),
    })
}

/// Ricava uno stato dalla vecchia forma `context.chat_state`.
///
/// Best-effort: `slots` diventa lo stato, `safety_flags` e `conflicts`
/// vengono copiati sopra se presenti e non vuoti. Restituisce `None` se
/// `chat_state` manca o non è un oggetto.
#[must_use]
pub fn translate_legacy(context: &Map<String, Value>) -> Option<Map<String, Value>> {
    let chat_state = context.get("chat_state")?.as_object()?;

    let mut state = chat_state
        .get("slots")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    for key in ["safety_flags", "conflicts"] {
        if let Some(value) = chat_state.get(key).filter(|v| is_truthy(v)) {
            state.insert(key.to_string(), value.clone());
        }
    }

    Some(state)
}
