use crate::series::PointFailure;

/// Failure at the boundary of an upstream provider.
#[derive(thiserror::Error, Debug)]
pub enum UpstreamError {
    #[error("error sending request: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("upstream responded {status}: {message}")]
    Status { status: u16, message: String },
    #[error("malformed upstream payload: {0}")]
    Malformed(String),
    #[error("upstream call timed out after {0} seconds")]
    Timeout(u64),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum GridError {
    #[error("grid size must be at least 1")]
    Empty,
    #[error("grid size must be odd, got {0}")]
    EvenSize(usize),
    #[error("grid step must be a positive number of degrees, got {0}")]
    InvalidStep(f64),
}

#[derive(thiserror::Error, Debug)]
pub enum SamplerError {
    #[error("invalid grid: {0}")]
    Grid(#[from] GridError),
    #[error("all {} grid points failed upstream", failures.len())]
    TotalFailure { failures: Vec<PointFailure> },
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("invalid date '{value}', expected YYYYMMDD")]
pub struct DateError {
    pub value: String,
}

impl DateError {
    pub fn new(value: &str) -> Self {
        Self {
            value: value.to_string(),
        }
    }
}
