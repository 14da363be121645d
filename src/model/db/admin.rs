use std::ops::{Deref, DerefMut};

use mongodb::error::Error as DbError;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::model::mongodb::{is_duplicate_key_error, Coll, Id};

/// Username of the admin account bootstrapped at startup.
pub const DEFAULT_ADMIN_USERNAME: &str = "admin";

/// Core admin user data.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminCore {
    pub username: String,
    pub password_hash: String,
}

impl AdminCore {
    /// Create an admin with a freshly salted hash of the given password.
    pub fn new(username: String, password: &str) -> Self {
        // 16 bytes of salt is the recommended amount for argon2.
        let mut salt = [0_u8; 16];
        rand::thread_rng().fill(&mut salt);
        let password_hash =
            argon2::hash_encoded(password.as_bytes(), &salt, &argon2::Config::default())
                .expect("hashing with the default config does not fail");
        Self {
            username,
            password_hash,
        }
    }

    /// Check whether the given password is correct.
    ///
    /// Argon2 verification is salted and constant-time; the password is never
    /// compared directly.
    pub fn verify_password<T: AsRef<[u8]>>(&self, password: T) -> bool {
        // Unwrap safe because every stored hash was produced by
        // `AdminCore::new`, so it is always well-formed.
        argon2::verify_encoded(&self.password_hash, password.as_ref()).unwrap()
    }
}

/// An admin without an ID.
pub type NewAdmin = AdminCore;

/// An admin user from the database, with its unique ID.
#[derive(Debug, Serialize, Deserialize)]
pub struct Admin {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub admin: AdminCore,
}

impl Deref for Admin {
    type Target = AdminCore;

    fn deref(&self) -> &Self::Target {
        &self.admin
    }
}

impl DerefMut for Admin {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.admin
    }
}

/// Ensure at least one admin exists, so the dashboard is never locked out.
///
/// This operation is idempotent, and safe to run from multiple server
/// processes at once.
pub async fn ensure_admin_exists(
    admins: &Coll<NewAdmin>,
    default_password: &str,
) -> Result<(), DbError> {
    if admins.count_documents(None, None).await? > 0 {
        return Ok(());
    }

    let admin = AdminCore::new(DEFAULT_ADMIN_USERNAME.to_string(), default_password);
    let result = admins.insert_one(admin, None).await;
    if is_duplicate_key_error(result.as_ref().map(|_| ())) {
        // Another process bootstrapped the default admin concurrently.
        return Ok(());
    }
    result?;
    info!("Created default admin '{DEFAULT_ADMIN_USERNAME}'");
    Ok(())
}

#[cfg(test)]
mod tests {
    use mongodb::bson::doc;

    use super::*;

    #[test]
    fn password_verification_roundtrip() {
        let admin = AdminCore::new("returning-officer".to_string(), "correct horse battery");

        assert!(admin.verify_password("correct horse battery"));
        assert!(!admin.verify_password("incorrect horse battery"));
        assert!(!admin.verify_password(""));
    }

    #[test]
    fn hashes_are_salted() {
        let first = AdminCore::new("a".to_string(), "hunter2hunter2");
        let second = AdminCore::new("b".to_string(), "hunter2hunter2");

        // Same password, different salt, different hash.
        assert_ne!(first.password_hash, second.password_hash);
    }

    #[backend_test]
    async fn bootstrap_is_idempotent(admins: Coll<NewAdmin>) {
        // Startup already bootstrapped the default admin.
        assert_eq!(admins.count_documents(None, None).await.unwrap(), 1);

        // Re-running changes nothing, even with a different password.
        ensure_admin_exists(&admins, "campusvote-dev-password")
            .await
            .unwrap();
        ensure_admin_exists(&admins, "a-different-password")
            .await
            .unwrap();
        assert_eq!(admins.count_documents(None, None).await.unwrap(), 1);

        let admin = admins
            .find_one(doc! { "username": DEFAULT_ADMIN_USERNAME }, None)
            .await
            .unwrap()
            .unwrap();
        assert!(admin.verify_password("campusvote-dev-password"));
    }
}
