use std::fmt;

/// Pipeline-side error type.
///
/// Gate blocks are deliberately *not* represented here: a blocked trade is a
/// legitimate `NO_TRADE` outcome and travels inside the [`DecisionRecord`]
/// instead. Only genuine input/configuration defects surface as errors.
///
/// [`DecisionRecord`]: crate::decision::DecisionRecord
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Missing or zero market inputs, broken candle series, thin regime
    /// window, or no actionable level. Resolves to a `NO_TRADE` record.
    DataIntegrity(String),
    /// Invalid threshold/capital configuration. Fatal — the pipeline must
    /// not start with a config that fails validation.
    Configuration(String),
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DataIntegrity(msg) => write!(f, "data_integrity: {msg}"),
            Self::Configuration(msg) => write!(f, "configuration: {msg}"),
        }
    }
}

impl std::error::Error for CoreError {}

impl From<serde_yaml::Error> for CoreError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Configuration(format!("invalid YAML: {e}"))
    }
}

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        Self::Configuration(e.to_string())
    }
}
