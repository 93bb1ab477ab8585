use thiserror::Error;

#[derive(Debug, Error)]
pub enum MsError {
    #[error("No .planning/ directory found")]
    PlanningNotFound,

    #[error("Phase directory not found for {0}")]
    PhaseDirNotFound(String),

    #[error("UAT file not found: {0}")]
    UatNotFound(String),

    #[error("Test {0} not found")]
    TestNotFound(String),

    #[error("Batch {0} not found")]
    BatchNotFound(String),

    #[error("Invalid JSON input: {0}")]
    InvalidPayload(String),

    #[error("invalid field '{key}': {reason}")]
    InvalidField { key: String, reason: &'static str },

    #[error("unknown artifact type: {0}")]
    InvalidArtifactType(String),

    #[error("Start phase ({start}) cannot exceed end phase ({end})")]
    InvalidRange { start: u32, end: u32 },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MsError>;
