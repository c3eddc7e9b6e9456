//! Identity and session management: registration, credential checks, and
//! opaque bearer tokens. Only token digests ever touch the database.

use crate::database::models::UserRecord;
use crate::database::repositories::{TokenRepository, UserRepository};
use crate::database::Database;
use crate::error::{FieldErrors, RippleError};
use crate::utils::now_utc_iso;
use anyhow::{anyhow, Result};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use rand::distr::Alphanumeric;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::OnceLock;

const TOKEN_LENGTH: usize = 40;
const MIN_PASSWORD_LENGTH: usize = 8;

/// Ownership rule shared by every mutating endpoint: anonymous actors never
/// pass, authenticated actors pass only for their own resources.
pub fn can_mutate(actor: Option<&UserRecord>, resource_owner_id: i64) -> bool {
    match actor {
        Some(user) => user.id == resource_owner_id,
        None => false,
    }
}

pub(crate) fn email_pattern() -> &'static Regex {
    static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
    EMAIL_RE.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email pattern"))
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub password_confirmation: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// The user shape returned to its owner; never exposes the password hash.
#[derive(Debug, Clone, Serialize)]
pub struct AuthUserView {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub username: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub email_verified_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl AuthUserView {
    pub fn from_record(record: UserRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            email: record.email,
            username: record.username,
            bio: record.bio,
            avatar: record.avatar,
            email_verified_at: record.email_verified_at,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[derive(Clone)]
pub struct AuthService {
    database: Database,
}

impl AuthService {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    pub fn register(&self, input: RegisterInput) -> Result<(AuthUserView, String), RippleError> {
        let mut errors = FieldErrors::new();
        let name = input.name.trim();
        if name.is_empty() {
            errors.push("name", "The name field is required.");
        } else if name.chars().count() > 255 {
            errors.push("name", "The name may not be greater than 255 characters.");
        }
        let email = input.email.trim().to_string();
        if email.is_empty() {
            errors.push("email", "The email field is required.");
        } else if !email_pattern().is_match(&email) {
            errors.push("email", "The email must be a valid email address.");
        }
        if input.password.chars().count() < MIN_PASSWORD_LENGTH {
            errors.push("password", "The password must be at least 8 characters.");
        }
        if let Some(confirmation) = &input.password_confirmation {
            if confirmation != &input.password {
                errors.push("password", "The password confirmation does not match.");
            }
        }
        if !errors.contains("email")
            && self
                .database
                .with_repositories(|repos| repos.users().email_exists(&email, None))?
        {
            errors.push("email", "The email has already been taken.");
        }
        errors.into_result()?;

        let now = now_utc_iso();
        let record = UserRecord {
            id: 0,
            name: name.to_string(),
            email,
            username: None,
            bio: None,
            avatar: None,
            password_hash: hash_password(&input.password)?,
            email_verified_at: None,
            created_at: now.clone(),
            updated_at: now,
        };

        let user = self.database.with_repositories(|repos| {
            let id = repos.users().create(&record)?;
            repos
                .users()
                .get(id)?
                .ok_or_else(|| anyhow!("registration lost newly inserted user"))
        })?;

        let token = self.issue_token(user.id)?;
        Ok((AuthUserView::from_record(user), token))
    }

    pub fn login(&self, input: LoginInput) -> Result<(AuthUserView, String), RippleError> {
        let email = input.email.trim().to_string();
        let user = self
            .database
            .with_repositories(|repos| repos.users().get_by_email(&email))?;

        let user = match user {
            Some(user) if verify_password(&input.password, &user.password_hash) => user,
            _ => {
                return Err(FieldErrors::single(
                    "email",
                    "These credentials do not match our records.",
                ))
            }
        };

        let token = self.issue_token(user.id)?;
        Ok((AuthUserView::from_record(user), token))
    }

    /// Mints a fresh opaque token for the user. Multiple tokens may be live
    /// at once; each logout revokes exactly one.
    pub fn issue_token(&self, user_id: i64) -> Result<String, RippleError> {
        let token: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LENGTH)
            .map(char::from)
            .collect();
        let digest = token_digest(&token);
        self.database
            .with_repositories(|repos| repos.tokens().insert(user_id, &digest, &now_utc_iso()))?;
        Ok(token)
    }

    /// Absence or invalidity of a token yields an anonymous context, never
    /// an error; endpoints that require auth reject the `None` themselves.
    pub fn resolve_token(&self, token: &str) -> Result<Option<UserRecord>, RippleError> {
        let digest = token_digest(token);
        Ok(self
            .database
            .with_repositories(|repos| repos.tokens().find_user(&digest))?)
    }

    pub fn revoke(&self, token: &str) -> Result<(), RippleError> {
        let digest = token_digest(token);
        self.database
            .with_repositories(|repos| repos.tokens().revoke(&digest))?;
        Ok(())
    }
}

fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Argon2id in PHC string format, fresh salt per hash.
pub(crate) fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| anyhow!("failed to hash password: {err}"))?;
    Ok(hash.to_string())
}

/// An unparseable stored hash counts as a mismatch, never an error.
pub(crate) fn verify_password(password: &str, stored: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn setup_service() -> AuthService {
        let conn = Connection::open_in_memory().expect("in-memory db");
        let db = Database::from_connection(conn, true);
        db.ensure_migrations().expect("migrations");
        AuthService::new(db)
    }

    fn register_input(email: &str) -> RegisterInput {
        RegisterInput {
            name: "Alice".into(),
            email: email.into(),
            password: "password123".into(),
            password_confirmation: Some("password123".into()),
        }
    }

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
        assert!(!verify_password("correct horse", "not-a-hash"));
    }

    #[test]
    fn hashes_are_salted_per_password() {
        let first = hash_password("same password").unwrap();
        let second = hash_password("same password").unwrap();
        assert_ne!(first, second);
        assert!(verify_password("same password", &first));
        assert!(verify_password("same password", &second));
    }

    #[test]
    fn register_then_login_and_resolve() {
        let service = setup_service();
        let (user, token) = service.register(register_input("a@example.com")).unwrap();
        assert_eq!(user.email, "a@example.com");

        let resolved = service.resolve_token(&token).unwrap().unwrap();
        assert_eq!(resolved.id, user.id);

        let (_, login_token) = service
            .login(LoginInput {
                email: "a@example.com".into(),
                password: "password123".into(),
            })
            .unwrap();
        assert_ne!(token, login_token);
    }

    #[test]
    fn register_rejects_duplicate_email() {
        let service = setup_service();
        service.register(register_input("dup@example.com")).unwrap();
        let err = service
            .register(register_input("dup@example.com"))
            .unwrap_err();
        assert!(matches!(err, RippleError::Validation(_)));
    }

    #[test]
    fn register_rejects_invalid_fields() {
        let service = setup_service();
        let err = service
            .register(RegisterInput {
                name: "".into(),
                email: "not-an-email".into(),
                password: "123".into(),
                password_confirmation: None,
            })
            .unwrap_err();
        let RippleError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert!(errors.contains("name"));
        assert!(errors.contains("email"));
        assert!(errors.contains("password"));
    }

    #[test]
    fn login_with_bad_password_fails_validation() {
        let service = setup_service();
        service.register(register_input("b@example.com")).unwrap();
        let err = service
            .login(LoginInput {
                email: "b@example.com".into(),
                password: "wrongpassword".into(),
            })
            .unwrap_err();
        assert!(matches!(err, RippleError::Validation(_)));
    }

    #[test]
    fn revoked_token_no_longer_resolves() {
        let service = setup_service();
        let (_, token) = service.register(register_input("c@example.com")).unwrap();
        service.revoke(&token).unwrap();
        assert!(service.resolve_token(&token).unwrap().is_none());
    }

    #[test]
    fn invalid_token_resolves_to_anonymous() {
        let service = setup_service();
        assert!(service.resolve_token("garbage").unwrap().is_none());
    }

    #[test]
    fn can_mutate_requires_matching_owner() {
        let service = setup_service();
        let (user, _) = service.register(register_input("d@example.com")).unwrap();
        let record = service
            .resolve_token(&service.issue_token(user.id).unwrap())
            .unwrap()
            .unwrap();
        assert!(can_mutate(Some(&record), user.id));
        assert!(!can_mutate(Some(&record), user.id + 1));
        assert!(!can_mutate(None, user.id));
    }
}
