//! RFC 6238 TOTP over HMAC-SHA256.
//!
//! Secrets are 20 random bytes, stored and exchanged as standard base64.
//! Authenticator apps must honor the `algorithm=SHA256` otpauth parameter.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const TIME_STEP_SECS: u64 = 30;
pub const CODE_DIGITS: u32 = 6;
/// Accepted clock skew, in time steps, on either side of now
pub const VERIFY_WINDOW: i64 = 1;

#[derive(Debug, thiserror::Error)]
pub enum TotpError {
    #[error("Malformed TOTP secret")]
    MalformedSecret,
}

/// Fresh base64 secret for enrollment
pub fn generate_secret() -> String {
    let mut bytes = [0u8; 20];
    rand::thread_rng().fill_bytes(&mut bytes);
    STANDARD.encode(bytes)
}

/// otpauth:// provisioning URL shown once at enrollment
pub fn otpauth_url(issuer: &str, account: &str, secret: &str) -> String {
    format!(
        "otpauth://totp/{}:{}?secret={}&issuer={}&algorithm=SHA256&digits={}&period={}",
        issuer, account, secret, issuer, CODE_DIGITS, TIME_STEP_SECS
    )
}

fn hotp(key: &[u8], counter: u64) -> Result<u32, TotpError> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| TotpError::MalformedSecret)?;
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    // Dynamic truncation per RFC 4226 §5.3
    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let bin = ((u32::from(digest[offset]) & 0x7f) << 24)
        | (u32::from(digest[offset + 1]) << 16)
        | (u32::from(digest[offset + 2]) << 8)
        | u32::from(digest[offset + 3]);
    Ok(bin % 10u32.pow(CODE_DIGITS))
}

/// Code for an explicit unix timestamp
pub fn code_at(secret: &str, unix_secs: u64) -> Result<String, TotpError> {
    let key = STANDARD
        .decode(secret)
        .map_err(|_| TotpError::MalformedSecret)?;
    if key.is_empty() {
        return Err(TotpError::MalformedSecret);
    }
    let counter = unix_secs / TIME_STEP_SECS;
    let code = hotp(&key, counter)?;
    Ok(format!("{:0width$}", code, width = CODE_DIGITS as usize))
}

/// Verify a submitted code at a given time, tolerating ±VERIFY_WINDOW steps
pub fn verify_at(secret: &str, code: &str, unix_secs: u64) -> Result<bool, TotpError> {
    if code.len() != CODE_DIGITS as usize || !code.chars().all(|c| c.is_ascii_digit()) {
        return Ok(false);
    }
    for skew in -VERIFY_WINDOW..=VERIFY_WINDOW {
        let t = unix_secs as i64 + skew * TIME_STEP_SECS as i64;
        if t < 0 {
            continue;
        }
        if code_at(secret, t as u64)? == code {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Verify against the current system clock
pub fn verify_now(secret: &str, code: &str) -> Result<bool, TotpError> {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    verify_at(secret, code, now)
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: u64 = 1_700_000_000;

    #[test]
    fn generated_code_verifies_at_same_time() {
        let secret = generate_secret();
        let code = code_at(&secret, T).unwrap();
        assert_eq!(code.len(), 6);
        assert!(verify_at(&secret, &code, T).unwrap());
    }

    #[test]
    fn adjacent_time_step_accepted() {
        let secret = generate_secret();
        let previous = code_at(&secret, T - TIME_STEP_SECS).unwrap();
        assert!(verify_at(&secret, &previous, T).unwrap());
        let two_back = code_at(&secret, T - 2 * TIME_STEP_SECS).unwrap();
        // Outside the ±1 window unless codes collide across steps
        if two_back != code_at(&secret, T).unwrap()
            && two_back != code_at(&secret, T - TIME_STEP_SECS).unwrap()
            && two_back != code_at(&secret, T + TIME_STEP_SECS).unwrap()
        {
            assert!(!verify_at(&secret, &two_back, T).unwrap());
        }
    }

    #[test]
    fn wrong_code_rejected() {
        let secret = generate_secret();
        let code = code_at(&secret, T).unwrap();
        let wrong = if code == "000000" { "000001" } else { "000000" };
        assert!(!verify_at(&secret, wrong, T).unwrap());
        assert!(!verify_at(&secret, "12345", T).unwrap());
        assert!(!verify_at(&secret, "abcdef", T).unwrap());
    }

    #[test]
    fn secrets_are_unique() {
        assert_ne!(generate_secret(), generate_secret());
    }

    #[test]
    fn malformed_secret_errors() {
        assert!(matches!(
            code_at("%%%not-base64%%%", T),
            Err(TotpError::MalformedSecret)
        ));
    }

    #[test]
    fn otpauth_url_carries_algorithm() {
        let url = otpauth_url("Atlas", "dev@atlas.test", "c2VjcmV0");
        assert!(url.starts_with("otpauth://totp/Atlas:dev@atlas.test"));
        assert!(url.contains("algorithm=SHA256"));
        assert!(url.contains("period=30"));
    }
}
