use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{enums::user_roles::UserRole, principal::Principal};

pub const MAX_USER_NAME_LEN: usize = 64;
pub const MAX_DESCRIPTION_LEN: usize = 500;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_name: String,
    pub description: String,
}

impl UserProfile {
    pub fn validate(&self) -> Result<(), String> {
        if self.user_name.trim().is_empty() {
            return Err("user name is required".to_string());
        }
        if self.user_name.chars().count() > MAX_USER_NAME_LEN {
            return Err(format!(
                "user name must be at most {MAX_USER_NAME_LEN} characters"
            ));
        }
        if self.description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(format!(
                "description must be at most {MAX_DESCRIPTION_LEN} characters"
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignRoleRequest {
    pub principal: Principal,
    pub role: UserRole,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallerRoleResponse {
    pub principal: Principal,
    pub role: UserRole,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IsAdminResponse {
    pub is_admin: bool,
}
