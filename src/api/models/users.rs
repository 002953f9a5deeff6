use crate::api::models::common::{require_non_empty, Validate};
use crate::core::error::{Result, UserManageError};
use crate::db::models::{Role, User, UserWithRole};
use serde::{Deserialize, Serialize};
use std::fmt;

// Account API models
//
// Keys are snake_case; the capitalised names sent by the original web client
// are accepted as aliases.

/// Request body for creating an account
#[derive(Deserialize)]
pub struct CreateUserRequest {
    #[serde(default, alias = "Username")]
    pub username: String,
    #[serde(default, alias = "Password")]
    pub password: String,
    #[serde(default, alias = "FirstName")]
    pub first_name: String,
    #[serde(default, alias = "LastName")]
    pub last_name: String,
}

impl Validate for CreateUserRequest {
    fn validate(&self) -> Result<()> {
        require_non_empty("username", &self.username)?;
        require_non_empty("password", &self.password)?;
        require_non_empty("first_name", &self.first_name)?;
        require_non_empty("last_name", &self.last_name)
    }
}

impl fmt::Debug for CreateUserRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreateUserRequest")
            .field("username", &self.username)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .finish_non_exhaustive()
    }
}

/// Request body for updating an account; absent fields are left unchanged
#[derive(Deserialize, Default)]
pub struct UpdateUserRequest {
    #[serde(default, alias = "Username")]
    pub username: Option<String>,
    #[serde(default, alias = "Password")]
    pub password: Option<String>,
    #[serde(default, alias = "FirstName")]
    pub first_name: Option<String>,
    #[serde(default, alias = "LastName")]
    pub last_name: Option<String>,
}

impl Validate for UpdateUserRequest {
    fn validate(&self) -> Result<()> {
        let fields = [
            ("username", &self.username),
            ("password", &self.password),
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
        ];

        if fields.iter().all(|(_, value)| value.is_none()) {
            return Err(UserManageError::ValidationError(
                "At least one field must be provided".to_string(),
            ));
        }

        for (name, value) in fields {
            if let Some(value) = value {
                require_non_empty(name, value)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for UpdateUserRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateUserRequest")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .finish()
    }
}

/// Account as exposed over the API (never includes the password hash)
#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            role: None,
        }
    }
}

impl From<UserWithRole> for UserResponse {
    fn from(user: UserWithRole) -> Self {
        Self {
            role: Some(user.role),
            ..Self::from(user.user)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_requires_every_field() {
        let req: CreateUserRequest = serde_json::from_str(
            r#"{"Username":"alice","Password":"pw","FirstName":"Alice","LastName":"Liddell"}"#,
        )
        .unwrap();
        assert!(req.validate().is_ok());

        let missing: CreateUserRequest =
            serde_json::from_str(r#"{"username":"alice","password":"pw","first_name":"Alice"}"#)
                .unwrap();
        assert!(matches!(missing.validate(), Err(UserManageError::ValidationError(_))));
    }

    #[test]
    fn test_update_request_rules() {
        assert!(UpdateUserRequest::default().validate().is_err());

        let empty_name = UpdateUserRequest {
            username: Some(String::new()),
            ..Default::default()
        };
        assert!(empty_name.validate().is_err());

        let rename = UpdateUserRequest {
            first_name: Some("Alicia".into()),
            ..Default::default()
        };
        assert!(rename.validate().is_ok());
    }

    #[test]
    fn test_user_response_has_no_password() {
        let user = User {
            id: "u1".into(),
            username: "alice".into(),
            password_hash: "$2b$08$secret".into(),
            first_name: "Alice".into(),
            last_name: "Liddell".into(),
            created_at: String::new(),
        };

        let json = serde_json::to_value(UserResponse::from(UserWithRole {
            user,
            role: Role::User,
        }))
        .unwrap();

        assert_eq!(json["role"], "user");
        assert!(json.get("password").is_none());
        assert!(json.get("password_hash").is_none());
    }
}
