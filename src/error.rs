use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeployLensError {
    #[error("{0}")]
    NotFound(String),

    #[error("No usable job data for job #{job_number} after {attempts} project slug(s)")]
    FetchFailed { job_number: u64, attempts: usize },

    #[error("CircleCI API returned status {status} for {url}")]
    Api { status: u16, url: String },

    #[error("Status endpoint reported: {0}")]
    Remote(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DeployLensError {
    /// True when the pipeline has not (yet) registered a workflow or jobs.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, DeployLensError>;
