//! 用户Repository接口定义

use async_trait::async_trait;

use crate::entities::user::UserProfile;
use crate::errors::RepositoryError;
use crate::value_objects::UserId;

/// 用户Repository接口
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// 根据ID查找用户资料
    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserProfile>, RepositoryError>;

    /// 列出所有用户
    async fn list(&self) -> Result<Vec<UserProfile>, RepositoryError>;
}
