use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Profile incomplete; missing: {missing:?}")]
    ProfileIncomplete { missing: Vec<String> },

    #[error("Weights must sum to 1.0 +/- 0.01 (got {sum})")]
    InvalidWeights { sum: f64 },

    #[error("Invalid status transition: {0}")]
    InvalidStatus(String),

    #[error("Batch limit exceeded: {got} > {max}")]
    BatchLimitExceeded { got: usize, max: usize },

    #[error("Profile not found: {0}")]
    ProfileNotFound(i64),

    #[error("College not found: {0}")]
    CollegeNotFound(i64),

    #[error("Task not found: {0}")]
    TaskNotFound(i64),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Dependency cycle through tasks: {task_ids:?}")]
    DependencyCycle { task_ids: Vec<i64> },

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Conflicting override on {entity_type} {entity_id} field {field}")]
    ConflictingOverride {
        entity_type: String,
        entity_id: i64,
        field: String,
    },

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Operation timed out after {0} ms")]
    Timeout(u64),

    #[error("Cache corruption on key {0}; purging")]
    CacheCorruption(String),
}

impl DomainError {
    /// Stable machine-readable kind for the boundary layer.
    pub fn kind(&self) -> &'static str {
        match self {
            DomainError::InvalidArgument(_) => "INVALID_ARGUMENT",
            DomainError::ProfileIncomplete { .. } => "PROFILE_INCOMPLETE",
            DomainError::InvalidWeights { .. } => "INVALID_WEIGHTS",
            DomainError::InvalidStatus(_) => "INVALID_STATUS",
            DomainError::BatchLimitExceeded { .. } => "BATCH_LIMIT_EXCEEDED",
            DomainError::ProfileNotFound(_) => "PROFILE_NOT_FOUND",
            DomainError::CollegeNotFound(_) => "COLLEGE_NOT_FOUND",
            DomainError::TaskNotFound(_) => "TASK_NOT_FOUND",
            DomainError::NotFound(_) => "NOT_FOUND",
            DomainError::DependencyCycle { .. } => "DEPENDENCY_CYCLE",
            DomainError::AlreadyExists(_) => "ALREADY_EXISTS",
            DomainError::ConflictingOverride { .. } => "CONFLICTING_OVERRIDE",
            DomainError::RateLimited(_) => "RATE_LIMITED",
            DomainError::Timeout(_) => "TIMEOUT",
            DomainError::CacheCorruption(_) => "CACHE_CORRUPTION",
        }
    }
}
