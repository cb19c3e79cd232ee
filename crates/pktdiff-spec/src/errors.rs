use miette::Diagnostic;
use pktdiff_smt::parser::SmtLibParseError;
use thiserror::Error;

/// Errors from parsing a branch-condition tree.
///
/// Malformed tree text is fatal for that program's test generation: the
/// caller aborts path enumeration rather than retrying.
#[derive(Debug, Error, Diagnostic)]
pub enum TreeError {
    #[error("Malformed branch tree: {message}")]
    #[diagnostic(code(pktdiff::tree::malformed))]
    Malformed {
        message: String,
        #[label("here")]
        span: miette::SourceSpan,
        #[source_code]
        src: miette::NamedSource<String>,
    },
}

impl TreeError {
    pub fn malformed(
        message: impl Into<String>,
        start: usize,
        end: usize,
        source: &str,
    ) -> Self {
        TreeError::Malformed {
            message: message.into(),
            span: (start, end.saturating_sub(start).max(1)).into(),
            src: miette::NamedSource::new("branch-tree", source.to_owned()),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            TreeError::Malformed { message, .. } => message,
        }
    }
}

/// Errors from decoding or validating a condition artifact.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("condition artifact is not valid JSON")]
    Decode(#[from] serde_json::Error),

    #[error("condition entry #{index} has an empty id")]
    EmptyConditionId { index: usize },

    #[error("duplicate condition id '{0}'")]
    DuplicateConditionId(String),

    #[error("condition '{condition}' carries an unparseable formula")]
    InvalidFormula {
        condition: String,
        #[source]
        source: SmtLibParseError,
    },

    #[error("variable entry #{index} is empty")]
    EmptyVariableName { index: usize },

    #[error("duplicate variable '{0}'")]
    DuplicateVariable(String),

    #[error("branch tree text is malformed")]
    Tree(#[from] TreeError),

    #[error("branch tree references condition '{0}' with no formula entry")]
    UnknownCondition(String),
}
