use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Missing fundamentals: {0}")]
    MissingFundamentals(String),

    #[error("No price data available for {0}")]
    EmptySeries(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Timed out after {0}s waiting for {1}")]
    Timeout(u64, String),
}
