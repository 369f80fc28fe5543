//! 用户实体
//!
//! 中继只读取用户资料（手机号、全名）用于消息富化，不做缓存。

use serde::{Deserialize, Serialize};

use crate::value_objects::UserId;

/// 用户资料
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// 用户ID
    pub id: UserId,
    /// 手机号
    pub phone: String,
    /// 全名
    pub fullname: String,
}

impl UserProfile {
    pub fn new(id: impl Into<String>, phone: impl Into<String>, fullname: impl Into<String>) -> Self {
        Self {
            id: UserId::new(id),
            phone: phone.into(),
            fullname: fullname.into(),
        }
    }
}
