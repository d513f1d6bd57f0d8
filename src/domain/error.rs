//! Domain error types.

/// A parse error with position information for condition ladder parsing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("parse error at position {position}: {message}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    /// Format the error with a caret pointing at the error position in the input.
    pub fn display_with_context(&self, input: &str) -> String {
        let caret = " ".repeat(self.position) + "^";
        format!("{input}\n{caret}\n{err}", err = self)
    }
}

/// Top-level error type for ladderquant.
#[derive(Debug, thiserror::Error)]
pub enum LadderError {
    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    ConditionParse(#[from] ParseError),

    #[error("unknown condition key: {key}")]
    UnknownCondition { key: String },

    #[error("no data for {code}")]
    NoData { code: String },

    #[error("task store error: {reason}")]
    TaskStore { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&LadderError> for std::process::ExitCode {
    fn from(err: &LadderError) -> Self {
        let code: u8 = match err {
            LadderError::Io(_) | LadderError::DataSource { .. } => 1,
            LadderError::ConfigParse { .. }
            | LadderError::ConfigMissing { .. }
            | LadderError::ConfigInvalid { .. } => 2,
            LadderError::TaskStore { .. } => 3,
            LadderError::ConditionParse(_) | LadderError::UnknownCondition { .. } => 4,
            LadderError::NoData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
