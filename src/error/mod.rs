use thiserror::Error;

/// Reasons an indicator operation did nothing.
///
/// None of these are shown to the user. The event boundary logs them and
/// waits for the next trigger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndicatorError {
    #[error("no embedded diff summaries found on the page")]
    DataUnavailable,
    #[error("toolbar anchor not present on the page")]
    AnchorMissing,
    #[error("unknown file reference: {0}")]
    UnknownFileReference(String),
}

pub type Result<T> = std::result::Result<T, IndicatorError>;
