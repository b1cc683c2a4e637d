//! Gerarchia degli errori del motore.
//!
//! - [`StructuralError`]: l'envelope in ingresso non è utilizzabile.
//!   Terminale, non ritentabile, diventa un report `NEEDS_MORE_INFO`.
//! - [`EngineError`]: guasto interno imprevisto. Non esce mai da
//!   [`crate::engine::DecisionEngine::evaluate`]: viene convertito in un
//!   errore `UNEXPECTED_ERROR` dentro il report.

use thiserror::Error;

use crate::report::{ErrorCode, ReportError};

/// Envelope in ingresso non valido.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructuralError {
    /// L'input non è un oggetto JSON.
    #[error("Input data must be a JSON object")]
    InvalidType,

    /// Non si riesce a ricavare un oggetto `state`.
    #[error("Input must include a 'state' object")]
    InvalidState,

    /// `context` presente ma non è un oggetto.
    #[error("If provided, context must be an object")]
    InvalidContext,
}

impl StructuralError {
    /// Codice di errore del report.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidType => ErrorCode::InvalidType,
            Self::InvalidState => ErrorCode::InvalidState,
            Self::InvalidContext => ErrorCode::InvalidContext,
        }
    }

    /// JSON path dell'elemento colpevole.
    #[must_use]
    pub const fn path(&self) -> &'static str {
        match self {
            Self::InvalidType => "$",
            Self::InvalidState => "$.state",
            Self::InvalidContext => "$.context",
        }
    }
}

impl From<&StructuralError> for ReportError {
    fn from(err: &StructuralError) -> Self {
        Self::new(err.code(), err.to_string()).at(err.path())
    }
}

/// Guasto interno durante la valutazione.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Il report non è serializzabile (necessario al controllo di contratto).
    #[error("report serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Un'invariante interna del motore non regge.
    #[error("internal invariant broken: {0}")]
    Invariant(String),
}

impl EngineError {
    /// Categoria stabile del guasto, copiata nei metadati dell'errore.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Serialization(_) => "Serialization",
            Self::Invariant(_) => "Invariant",
        }
    }
}

/// Risultato interno del motore.
pub type EngineResult<T> = Result<T, EngineError>;
