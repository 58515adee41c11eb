// 🔑 Credential hashing - Argon2id, PHC string format
//
// Stored format: $argon2id$v=19$m=...,t=...,p=...$<salt>$<hash>
// Plaintext passwords never reach the users table.

use crate::error::{BankError, Result};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params};
use std::sync::OnceLock;

static DUMMY_HASH: OnceLock<String> = OnceLock::new();

#[cfg(test)]
thread_local! {
    static VERIFICATIONS: std::cell::Cell<usize> = const { std::cell::Cell::new(0) };
}

/// Number of `verify_password` calls made on this thread
#[cfg(test)]
pub(crate) fn verifications() -> usize {
    VERIFICATIONS.with(|count| count.get())
}

/// Hash a password with a fresh random salt
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| BankError::Credential(e.to_string()))
}

/// Check a password against a stored hash. Malformed hashes never match.
///
/// Hashes with a cost above the defaults are rejected instead of computed.
pub fn verify_password(password: &str, stored: &str) -> bool {
    #[cfg(test)]
    VERIFICATIONS.with(|count| count.set(count.get() + 1));

    let Ok(parsed) = PasswordHash::new(stored) else {
        return false;
    };
    if parsed.algorithm != Algorithm::Argon2id.ident() {
        return false;
    }
    let Ok(params) = Params::try_from(&parsed) else {
        return false;
    };
    if params.m_cost() > Params::DEFAULT_M_COST
        || params.t_cost() > Params::DEFAULT_T_COST
        || params.p_cost() > Params::DEFAULT_P_COST
    {
        return false;
    }

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Verify against `stored`, or against a fixed dummy hash when there is no
/// such user, so both outcomes cost one full hash computation.
pub fn verify_or_dummy(password: &str, stored: Option<&str>) -> bool {
    match stored {
        Some(stored) => verify_password(password, stored),
        None => {
            let dummy = DUMMY_HASH.get_or_init(|| {
                hash_password("no such account").unwrap_or_default()
            });
            verify_password(password, dummy);
            false
        }
    }
}
