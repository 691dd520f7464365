use thiserror::Error;

use crate::query::Rule;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApidexError {
    #[error("Load error: {0}")]
    Load(String),
    #[error("{message}")]
    Query { message: String, line: Option<usize>, col: Option<usize> },
    #[error("Channel error: {0}")]
    Channel(String),
    #[error("Render error: {0}")]
    Render(String),
    #[error("A filter is already in flight")]
    Busy,
    #[error("Config error: {0}")]
    Config(String),
}

impl ApidexError {
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query { message: message.into(), line: None, col: None }
    }
    pub fn is_query(&self) -> bool {
        matches!(self, Self::Query { .. })
    }
}

pub type Result<T> = std::result::Result<T, ApidexError>;

// Helper conversions
impl From<serde_json::Error> for ApidexError {
    fn from(e: serde_json::Error) -> Self { Self::Load(e.to_string()) }
}
impl From<std::io::Error> for ApidexError {
    fn from(e: std::io::Error) -> Self { Self::Load(e.to_string()) }
}
impl From<config::ConfigError> for ApidexError {
    fn from(e: config::ConfigError) -> Self { Self::Config(e.to_string()) }
}
impl From<pest::error::Error<Rule>> for ApidexError {
    fn from(e: pest::error::Error<Rule>) -> Self {
        let (line, col) = match e.line_col {
            pest::error::LineColLocation::Pos((l, c)) => (l, c),
            pest::error::LineColLocation::Span((l, c), _) => (l, c),
        };
        Self::Query {
            message: format!("Syntax error at column {col}: {}", e.variant.message()),
            line: Some(line),
            col: Some(col),
        }
    }
}
