use bcrypt::{hash, verify, DEFAULT_COST};

pub const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("{0}")]
    Policy(String),
    #[error("Password hashing failed: {0}")]
    Hash(String),
}

/// Enforced before hashing on registration and password change
pub fn validate_policy(password: &str) -> Result<(), PasswordError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(PasswordError::Policy(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    if password.len() > 128 {
        return Err(PasswordError::Policy(
            "Password must be at most 128 characters".to_string(),
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(PasswordError::Policy(
            "Password must contain at least one digit".to_string(),
        ));
    }
    if !password.chars().any(|c| c.is_alphabetic()) {
        return Err(PasswordError::Policy(
            "Password must contain at least one letter".to_string(),
        ));
    }
    Ok(())
}

pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    hash(password, DEFAULT_COST).map_err(|e| PasswordError::Hash(e.to_string()))
}

/// Constant-time comparison via bcrypt. A malformed stored hash counts as
/// a mismatch, not an error the caller could leak to the client.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    verify(password, stored_hash).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify() {
        let hashed = hash_password("correct horse 1").unwrap();
        assert!(verify_password("correct horse 1", &hashed));
        assert!(!verify_password("wrong horse 1", &hashed));
    }

    #[test]
    fn malformed_hash_is_a_mismatch() {
        assert!(!verify_password("anything1", "not-a-bcrypt-hash"));
    }

    #[test]
    fn policy_rejects_short_and_single_class() {
        assert!(validate_policy("ab1").is_err());
        assert!(validate_policy("onlyletters").is_err());
        assert!(validate_policy("12345678901").is_err());
        assert!(validate_policy("letters4ndd1g1ts").is_ok());
    }
}
