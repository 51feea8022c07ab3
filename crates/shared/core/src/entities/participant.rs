use serde::{Deserialize, Serialize};

use crate::values::UserId;

/// Platform role of an authenticated user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Admin,
}

/// Side a user plays in a deal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Participant {
    Seller,
    Buyer,
}

impl Participant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Participant::Seller => "seller",
            Participant::Buyer => "buyer",
        }
    }
}

/// Authenticated user acting on a deal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub user_id: UserId,
    pub username: String,
    pub roles: Vec<Role>,
}

impl Actor {
    pub fn new(user_id: UserId, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
            roles: vec![Role::User],
        }
    }

    pub fn admin(user_id: UserId, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
            roles: vec![Role::User, Role::Admin],
        }
    }

    pub fn is_admin(&self) -> bool {
        self.roles.contains(&Role::Admin)
    }
}
