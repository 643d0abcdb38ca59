use serde::{Deserialize, Serialize};

use crate::accounts::repo_types::Role;

use super::services::AuthSession;

/// Request body for registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub age: i32,
    pub password: String,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response returned after register or login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub account_id: i64,
    pub email: String,
    pub name: String,
    pub role: Role,
}

impl From<AuthSession> for AuthResponse {
    fn from(session: AuthSession) -> Self {
        Self {
            token: session.token,
            account_id: session.account.id,
            email: session.account.email,
            name: session.account.name,
            role: session.account.role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::repo_types::Account;
    use time::OffsetDateTime;

    #[test]
    fn auth_response_exposes_role_but_never_the_hash() {
        let session = AuthSession {
            token: "header.payload.signature".into(),
            account: Account {
                id: 1,
                name: "Ada".into(),
                email: "ada@example.com".into(),
                age: 30,
                password_hash: "$argon2id$v=19$hidden".into(),
                role: Role::User,
                created_at: OffsetDateTime::now_utc(),
                updated_at: OffsetDateTime::now_utc(),
            },
        };
        let json = serde_json::to_string(&AuthResponse::from(session)).unwrap();
        assert!(json.contains("\"role\":\"USER\""));
        assert!(json.contains("header.payload.signature"));
        assert!(!json.contains("argon2"));
    }
}
