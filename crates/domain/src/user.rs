use crate::value_objects::{UserId, Username};

/// 身份服务返回的用户资料。
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: Username,
    pub avatar: Option<String>,
}

impl User {
    pub fn new(id: UserId, username: Username, avatar: Option<String>) -> Self {
        Self {
            id,
            username,
            avatar: avatar.filter(|value| !value.is_empty()),
        }
    }
}
