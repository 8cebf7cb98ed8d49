use core_types::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] CoreError),

    #[error("Calculation error: arithmetic overflow in metric '{0}'")]
    Overflow(&'static str),
}
