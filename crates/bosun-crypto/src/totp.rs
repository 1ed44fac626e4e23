//! TOTP second factor with deterministic per-user secrets.
//!
//! The secret for a user is derived from `(user_id, username)` keyed by the
//! configured auth salt, so the same user gets the same secret across
//! restarts and previously issued enrolment QR codes keep working.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use totp_rs::{Algorithm, TOTP};
use zeroize::Zeroizing;

use crate::error::{CryptoError, CryptoResult};

type HmacSha256 = Hmac<Sha256>;

/// Issuer name shown by authenticator apps.
const ISSUER: &str = "bosun";

/// Derived secret length in bytes (160 bits, the RFC 4226 recommendation).
const SECRET_LEN: usize = 20;

/// Derives, provisions and verifies per-user TOTP secrets.
pub struct TotpAuthenticator {
    salt: Zeroizing<Vec<u8>>,
}

impl TotpAuthenticator {
    /// Build an authenticator over the configured auth salt.
    #[must_use]
    pub fn new(salt: &str) -> Self {
        Self {
            salt: Zeroizing::new(salt.as_bytes().to_vec()),
        }
    }

    /// Deterministically derive the 20-byte secret for a user.
    fn derive_secret(&self, user_id: u64, username: &str) -> Zeroizing<Vec<u8>> {
        let mut mac = HmacSha256::new_from_slice(&self.salt)
            .unwrap_or_else(|_| unreachable!("HMAC accepts any key length"));
        mac.update(&user_id.to_be_bytes());
        mac.update(b":");
        mac.update(username.as_bytes());
        let tag = mac.finalize().into_bytes();
        Zeroizing::new(tag[..SECRET_LEN].to_vec())
    }

    /// Construct the RFC 6238 generator for a user: SHA-1, 6 digits,
    /// 30-second step, ±1 window tolerance.
    fn generator(&self, user_id: u64, username: &str) -> CryptoResult<TOTP> {
        let secret = self.derive_secret(user_id, username);
        let account = if username.is_empty() {
            user_id.to_string()
        } else {
            username.to_owned()
        };
        TOTP::new(
            Algorithm::SHA1,
            6,
            1,
            30,
            secret.to_vec(),
            Some(ISSUER.to_owned()),
            account,
        )
        .map_err(|e| CryptoError::TotpSetup(e.to_string()))
    }

    /// Verify a submitted code for a user.
    ///
    /// Anything that is not exactly six ASCII digits is rejected without
    /// touching the clock.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::TotpSetup`] when the generator cannot be
    /// built and [`CryptoError::Clock`] when the system time is unusable.
    pub fn verify(&self, user_id: u64, username: &str, code: &str) -> CryptoResult<bool> {
        if code.len() != 6 || !code.chars().all(|c| c.is_ascii_digit()) {
            return Ok(false);
        }
        let totp = self.generator(user_id, username)?;
        totp.check_current(code).map_err(|_| CryptoError::Clock)
    }

    /// The `otpauth://` provisioning URI for a user.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::TotpSetup`] when the generator cannot be built.
    pub fn provisioning_url(&self, user_id: u64, username: &str) -> CryptoResult<String> {
        Ok(self.generator(user_id, username)?.get_url())
    }

    /// A PNG image of the enrolment QR code for a user.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::QrGeneration`] when rendering fails.
    pub fn qr_png(&self, user_id: u64, username: &str) -> CryptoResult<Vec<u8>> {
        self.generator(user_id, username)?
            .get_qr_png()
            .map_err(CryptoError::QrGeneration)
    }

    /// The current code for a user. Test helper; never exposed to chat.
    #[cfg(test)]
    fn current_code(&self, user_id: u64, username: &str) -> CryptoResult<String> {
        self.generator(user_id, username)?
            .generate_current()
            .map_err(|_| CryptoError::Clock)
    }
}

impl std::fmt::Debug for TotpAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TotpAuthenticator").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secrets_are_deterministic_per_user() {
        let auth = TotpAuthenticator::new("salt");
        assert_eq!(
            auth.derive_secret(42, "alice").to_vec(),
            auth.derive_secret(42, "alice").to_vec()
        );
    }

    #[test]
    fn secrets_differ_across_users_and_salts() {
        let auth = TotpAuthenticator::new("salt");
        let other_salt = TotpAuthenticator::new("other");

        assert_ne!(
            auth.derive_secret(42, "alice").to_vec(),
            auth.derive_secret(43, "alice").to_vec()
        );
        assert_ne!(
            auth.derive_secret(42, "alice").to_vec(),
            auth.derive_secret(42, "bob").to_vec()
        );
        assert_ne!(
            auth.derive_secret(42, "alice").to_vec(),
            other_salt.derive_secret(42, "alice").to_vec()
        );
    }

    #[test]
    fn current_code_verifies() {
        let auth = TotpAuthenticator::new("salt");
        let code = auth.current_code(42, "alice").unwrap();
        assert!(auth.verify(42, "alice", &code).unwrap());
    }

    #[test]
    fn wrong_code_rejected() {
        let auth = TotpAuthenticator::new("salt");
        let code = auth.current_code(42, "alice").unwrap();
        // A code for a different user must not verify.
        assert!(!auth.verify(43, "alice", &code).unwrap());
    }

    #[test]
    fn malformed_codes_rejected_cheaply() {
        let auth = TotpAuthenticator::new("salt");
        for bad in ["", "12345", "1234567", "12a456", "/13782"] {
            assert!(!auth.verify(42, "alice", bad).unwrap(), "{bad:?}");
        }
    }

    #[test]
    fn provisioning_url_names_issuer_and_account() {
        let auth = TotpAuthenticator::new("salt");
        let url = auth.provisioning_url(42, "alice").unwrap();
        assert!(url.starts_with("otpauth://totp/"));
        assert!(url.contains("bosun"));
        assert!(url.contains("alice"));
    }

    #[test]
    fn empty_username_falls_back_to_id() {
        let auth = TotpAuthenticator::new("salt");
        let url = auth.provisioning_url(42, "").unwrap();
        assert!(url.contains("42"));
    }
}
