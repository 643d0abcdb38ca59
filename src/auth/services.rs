use sqlx::PgPool;
use tracing::{info, warn};

use crate::accounts::repo_types::{Account, Role};
use crate::accounts::services::{map_unique_violation, validate_age, validate_email, validate_name};
use crate::error::ApiError;

use super::jwt::JwtKeys;
use super::password::{hash_password, verify_password};

const MIN_PASSWORD_LEN: usize = 8;

/// A freshly issued token together with the account it authenticates.
#[derive(Debug)]
pub struct AuthSession {
    pub token: String,
    pub account: Account,
}

/// Registration: duplicate check, hash, insert and token issuance run as one
/// unit. A failure at any point after the check leaves no half-written row.
pub async fn register(
    db: &PgPool,
    keys: &JwtKeys,
    name: &str,
    email: &str,
    age: i32,
    password: &str,
) -> Result<AuthSession, ApiError> {
    validate_name(name)?;
    validate_email(email)?;
    validate_age(age)?;
    if password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::invalid_data(
            "password",
            format!("must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }

    let hash = hash_password(password).map_err(ApiError::Internal)?;

    let mut tx = db.begin().await?;
    if Account::find_by_email(&mut *tx, email).await?.is_some() {
        return Err(ApiError::DuplicateEmail(email.to_string()));
    }
    let account = Account::insert(&mut *tx, name, email, age, &hash, Role::User)
        .await
        .map_err(|e| map_unique_violation(e, email))?;
    let token = keys
        .sign(&account.email, account.role)
        .map_err(ApiError::Internal)?;
    tx.commit().await?;

    info!(account_id = account.id, "account registered");
    Ok(AuthSession { token, account })
}

/// Login. Unknown email and wrong password are deliberately indistinguishable
/// to the caller so the endpoint cannot be used to enumerate accounts.
pub async fn login(
    db: &PgPool,
    keys: &JwtKeys,
    email: &str,
    password: &str,
) -> Result<AuthSession, ApiError> {
    let Some(account) = Account::find_by_email(db, email).await? else {
        warn!("login with unknown email");
        return Err(ApiError::InvalidCredentials);
    };

    // A parse failure here means the account has no usable credential
    // (e.g. it was created directly, without a password). Same outcome
    // as a mismatch.
    let ok = verify_password(password, &account.password_hash).unwrap_or(false);
    if !ok {
        warn!(account_id = account.id, "login with invalid password");
        return Err(ApiError::InvalidCredentials);
    }

    let token = keys
        .sign(&account.email, account.role)
        .map_err(ApiError::Internal)?;

    info!(account_id = account.id, "login succeeded");
    Ok(AuthSession { token, account })
}

/// Re-hydrates the acting identity for an already-verified token subject.
/// A token can outlive its account; the rejection stays generic.
pub async fn load_by_subject(db: &PgPool, email: &str) -> Result<Account, ApiError> {
    match Account::find_by_email(db, email).await? {
        Some(account) => Ok(account),
        None => {
            warn!("token subject no longer exists");
            Err(ApiError::AccessDenied)
        }
    }
}
