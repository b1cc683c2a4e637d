//! Rilevatore conservativo di red flag su testo libero.
//!
//! Non sta sul percorso di decisione: è un pre-processore opzionale che un
//! adapter può usare per popolare `safety_flags` prima di chiamare il
//! motore. Lavora per parole chiave, non capisce negazioni né contesto.

use std::sync::OnceLock;

use regex::Regex;
use tracing::warn;

use crate::safety_policy::RedFlag;

const PATTERNS: [(RedFlag, &str); 5] = [
    (
        RedFlag::SelfHarm,
        r"\b(suicide|kill myself|end my life|self harm|hurt myself)\b",
    ),
    (
        RedFlag::AcuteCardioResp,
        r"\b(chest pain|pressure in chest|can't breathe|shortness of breath|fainting|passed out)\b",
    ),
    (
        RedFlag::Neuro,
        r"\b(face droop|slurred speech|one side weak|sudden weakness|stroke)\b",
    ),
    (
        RedFlag::Priapism,
        r"\b(erection.*(4 hours|four hours)|priapism)\b",
    ),
    (
        RedFlag::SeverePainBleeding,
        r"\b(severe pain|unbearable pain|bleeding a lot|heavy bleeding)\b",
    ),
];

fn compiled() -> &'static [(RedFlag, Regex)] {
    static COMPILED: OnceLock<Vec<(RedFlag, Regex)>> = OnceLock::new();
    COMPILED.get_or_init(|| {
        PATTERNS
            .iter()
            .filter_map(|(flag, pattern)| match Regex::new(pattern) {
                Ok(re) => Some((*flag, re)),
                Err(err) => {
                    // Un pattern invalido è un bug nostro: saltiamo la regola, niente panic.
                    warn!(flag = flag.code(), %err, "red flag pattern failed to compile");
                    None
                }
            })
            .collect()
    })
}

/// Restituisce le red flag trovate nel testo, nell'ordine della tabella.
#[must_use]
pub fn detect_red_flags(user_text: &str) -> Vec<RedFlag> {
    let text = user_text.trim().to_lowercase();
    if text.is_empty() {
        return Vec::new();
    }

    compiled()
        .iter()
        .filter(|(_, re)| re.is_match(&text))
        .map(|(flag, _)| *flag)
        .collect()
}

/// Come [`detect_red_flags`], ma restituisce i codici pronti per `safety_flags`.
#[must_use]
pub fn detect_red_flag_codes(user_text: &str) -> Vec<String> {
    detect_red_flags(user_text)
        .iter()
        .map(|flag| flag.code().to_string())
        .collect()
}
