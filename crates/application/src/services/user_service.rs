use std::sync::Arc;

use domain::UserRepository;

use crate::{dto::UserListItem, error::ApplicationError};

pub struct UserServiceDependencies {
    pub users: Arc<dyn UserRepository>,
}

pub struct UserService {
    deps: UserServiceDependencies,
}

impl UserService {
    pub fn new(deps: UserServiceDependencies) -> Self {
        Self { deps }
    }

    pub async fn list_users(&self) -> Result<Vec<UserListItem>, ApplicationError> {
        let users = self.deps.users.list().await?;
        Ok(users.into_iter().map(UserListItem::from).collect())
    }
}
