use thiserror::Error;

/// Hard translation failures. Each variant names the method being lowered;
/// the orchestrator decides whether a failure skips that method or stops the
/// run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslateError {
    #[error("malformed string literal {literal:?} in {method}: missing quote delimiters")]
    MalformedStringLiteral { method: String, literal: String },

    #[error("no recognizer matched the run starting at offset {offset:#06x} in {method}")]
    UnsupportedRun { method: String, offset: u32 },

    #[error(
        "object initialization with {count} targets at offset {offset:#06x} in {method}; exactly one is supported"
    )]
    MultiTargetInitialize {
        method: String,
        offset: u32,
        count: usize,
    },

    #[error("no override of {callee} is reachable from {receiver} in {method}")]
    MissingOverride {
        method: String,
        callee: String,
        receiver: String,
    },

    #[error("malformed array-initializer token {token:?} in {method}")]
    MalformedToken { method: String, token: String },

    #[error("unsupported construct at offset {offset:#06x} in {method}: {detail}")]
    Unsupported {
        method: String,
        offset: u32,
        detail: String,
    },
}

impl TranslateError {
    /// The documentation signature of the method the failure occurred in.
    pub fn method(&self) -> &str {
        match self {
            TranslateError::MalformedStringLiteral { method, .. }
            | TranslateError::UnsupportedRun { method, .. }
            | TranslateError::MultiTargetInitialize { method, .. }
            | TranslateError::MissingOverride { method, .. }
            | TranslateError::MalformedToken { method, .. }
            | TranslateError::Unsupported { method, .. } => method,
        }
    }
}
