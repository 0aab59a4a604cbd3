//! Error types for template rendering and calculation checking.

/// Errors raised while parsing a template.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("unclosed tag at byte {0}")]
    UnclosedTag(usize),

    #[error("empty tag at byte {0}")]
    EmptyTag(usize),

    #[error("section '{0}' is never closed")]
    UnclosedSection(String),

    #[error("closing tag '{found}' does not match open section '{expected}'")]
    MismatchedClose { expected: String, found: String },

    #[error("closing tag '{0}' has no open section")]
    UnexpectedClose(String),

    #[error("unsupported tag '{0}'")]
    Unsupported(String),
}

/// Reasons a calculation is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormulaError {
    #[error("calculation must start with '='")]
    MissingEquals,

    #[error("calculation is empty")]
    Empty,

    #[error("unknown idnumber [[{0}]]")]
    UnknownReference(String),

    #[error("calculation refers to its own item [[{0}]]")]
    SelfReference(String),

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("{name}() takes {expected} argument(s), got {found}")]
    Arity {
        name: String,
        expected: &'static str,
        found: usize,
    },

    #[error("syntax error at position {position}: {message}")]
    Syntax { position: usize, message: String },
}

impl FormulaError {
    pub(crate) fn syntax(position: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            position,
            message: message.into(),
        }
    }
}
