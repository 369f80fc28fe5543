use domain::{DomainError, RelayError, RepositoryError, UserId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),
    #[error("repository error: {0:?}")]
    Repository(RepositoryError),
    #[error("relay error: {0}")]
    Relay(#[from] RelayError),
    #[error("profile enrichment failed for {user_id}: {reason}")]
    Enrichment { user_id: UserId, reason: String },
    #[error("user profile not found: {0}")]
    ProfileNotFound(UserId),
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl ApplicationError {
    /// 创建基础设施错误
    pub fn infrastructure(message: impl Into<String>) -> Self {
        ApplicationError::Infrastructure(message.into())
    }

    /// 是否属于“资源不存在”类错误
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ApplicationError::ProfileNotFound(_)
                | ApplicationError::Repository(RepositoryError::NotFound)
                | ApplicationError::Domain(DomainError::ResourceNotFound { .. })
        )
    }
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        ApplicationError::Repository(value)
    }
}
