/// Cached user identity
use serde::{Deserialize, Serialize};

/// Profile returned by `GET auth/me`. Missing fields fall back to defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub is_superuser: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<String>,
}

impl UserProfile {
    /// Stand-in used when sign-in succeeds but the profile fetch does not
    pub fn minimal(email: &str) -> Self {
        Self {
            id: 0,
            email: email.to_string(),
            is_active: true,
            ..Self::default()
        }
    }

    /// Apply the fields present in `update`
    pub fn merge(&mut self, update: UserUpdate) {
        if let Some(email) = update.email {
            self.email = email;
        }
        if let Some(first_name) = update.first_name {
            self.first_name = first_name;
        }
        if let Some(last_name) = update.last_name {
            self.last_name = last_name;
        }
        if let Some(is_active) = update.is_active {
            self.is_active = is_active;
        }
        if let Some(is_superuser) = update.is_superuser {
            self.is_superuser = is_superuser;
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        match role {
            Role::Admin | Role::Superuser => self.is_superuser,
            Role::User => self.is_active,
        }
    }
}

/// Partial profile update, e.g. after the profile page saves
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_active: Option<bool>,
    pub is_superuser: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Superuser,
    User,
}
