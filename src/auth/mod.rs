pub mod password;
pub mod session;

use rusqlite::Connection;
use thiserror::Error;

use crate::db::models::{is_unique_violation, User};
use crate::db::users;

/// Outcomes of registration and login that are reported to the visitor.
/// The `Display` text is the flash message.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("You've already signed up with that email, log in instead!")]
    DuplicateEmail,

    #[error("User does not exist.")]
    UserNotFound,

    #[error("Password incorrect.")]
    InvalidPassword,

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Password hashing error: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

/// Create an account. Fails with `DuplicateEmail` without touching the
/// users table when the address is taken.
pub fn register(
    conn: &Connection,
    name: &str,
    email: &str,
    plaintext: &str,
    cost: u32,
) -> Result<User, AuthError> {
    if users::find_by_email(conn, email)?.is_some() {
        return Err(AuthError::DuplicateEmail);
    }

    let hashed = password::hash(plaintext, cost)?;
    match users::insert(conn, email, &hashed, name) {
        Ok(user) => Ok(user),
        // Lost a race with a concurrent registration
        Err(e) if is_unique_violation(&e) => Err(AuthError::DuplicateEmail),
        Err(e) => Err(e.into()),
    }
}

/// Check credentials, distinguishing an unknown email from a bad password.
pub fn authenticate(conn: &Connection, email: &str, plaintext: &str) -> Result<User, AuthError> {
    let user = users::find_by_email(conn, email)?.ok_or(AuthError::UserNotFound)?;
    if password::verify(plaintext, &user.password_hash) {
        Ok(user)
    } else {
        Err(AuthError::InvalidPassword)
    }
}
