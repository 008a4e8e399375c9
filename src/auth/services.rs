use lazy_static::lazy_static;
use regex::Regex;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::{
    auth::{
        dto::{LoginRequest, RegisterRequest},
        password::{hash_password, verify_dummy, verify_password},
        repo::UserStore,
        repo_types::{NewUser, User},
        session::Session,
    },
    config::DemoConfig,
    error::ApiError,
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Compares digests so the comparison time does not depend on how much of the code matched.
fn codes_match(given: &str, expected: &str) -> bool {
    Sha256::digest(given.as_bytes()) == Sha256::digest(expected.as_bytes())
}

/// Store-backed login: credentials first, then the admin-code or payment gate.
/// Unknown user and wrong password fail identically.
pub async fn login_with_store(
    store: &dyn UserStore,
    admin_code: Option<&str>,
    req: &LoginRequest,
) -> Result<Session, ApiError> {
    let username = req.username.trim();
    if username.is_empty() || req.password.is_empty() {
        return Err(ApiError::validation("username and password are required"));
    }

    let user = match store.find_by_username(username).await? {
        Some(u) => u,
        None => {
            verify_dummy(&req.password);
            warn!(%username, "login unknown username");
            return Err(ApiError::InvalidCredentials);
        }
    };

    if !verify_password(&req.password, &user.password_hash)? {
        warn!(%username, user_id = %user.id, "login invalid password");
        return Err(ApiError::InvalidCredentials);
    }

    if user.is_admin {
        let granted = match (req.admin_code.as_deref(), admin_code) {
            (Some(given), Some(expected)) => codes_match(given, expected),
            _ => false,
        };
        if !granted {
            warn!(%username, "admin login without valid admin code");
            return Err(ApiError::AdminCodeRequired);
        }
    } else if !user.paid {
        info!(%username, "login blocked until payment completes");
        return Err(ApiError::PaymentRequired);
    }

    info!(user_id = %user.id, %username, is_admin = user.is_admin, "user logged in");
    Ok(Session {
        username: user.username,
        is_admin: user.is_admin,
    })
}

/// Fixed-credential login used when the deployment runs without a user store.
pub fn login_with_demo(demo: &DemoConfig, req: &LoginRequest) -> Result<Session, ApiError> {
    let username = req.username.trim();
    if username.is_empty() || req.password.is_empty() {
        return Err(ApiError::validation("username and password are required"));
    }
    if codes_match(username, &demo.username) && codes_match(&req.password, &demo.password) {
        info!(%username, "demo user logged in");
        Ok(Session {
            username: demo.username.clone(),
            is_admin: false,
        })
    } else {
        warn!(%username, "demo login rejected");
        Err(ApiError::InvalidCredentials)
    }
}

/// Validates, hashes and inserts. The insert itself enforces uniqueness.
pub async fn register_user(store: &dyn UserStore, req: RegisterRequest) -> Result<User, ApiError> {
    let username = req.username.trim().to_string();
    let email = normalize_email(&req.email);

    if username.is_empty() || email.is_empty() || req.password.is_empty() {
        return Err(ApiError::validation("username, email and password are required"));
    }
    if !is_valid_email(&email) {
        warn!(%email, "invalid email");
        return Err(ApiError::validation("Invalid email"));
    }

    if req.is_admin {
        warn!(%username, %email, "self-registration requested admin flag");
    }

    let password_hash = hash_password(&req.password)?;
    let user = store
        .create(NewUser {
            username,
            email,
            password_hash,
            is_admin: req.is_admin,
        })
        .await
        .map_err(|e| {
            warn!(error = %e, "register failed");
            ApiError::from(e)
        })?;

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok(user)
}

/// Payment-completion effect: flips `paid` for the matching email. Safe to repeat.
pub async fn complete_payment(store: &dyn UserStore, email: &str) -> Result<bool, ApiError> {
    let email = normalize_email(email);
    if email.is_empty() {
        return Ok(false);
    }
    let matched = store.mark_paid(&email).await?;
    if matched {
        info!(%email, "payment completed, user marked paid");
    } else {
        warn!(%email, "payment completed for unknown email");
    }
    Ok(matched)
}
