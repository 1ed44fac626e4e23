//! Signed, replay-protected callback payloads.
//!
//! Telegram limits `callback_data` to 64 bytes, so the wire format is a
//! compact binary layout rather than JSON:
//!
//! ```text
//! [action_len u8][action bytes]
//! [created_at u32 BE][user_id u32 BE][nonce 4 bytes]
//! [param_count u8] { [key_len u8][key][val_len u8][val] } ...
//! ```
//!
//! The body is URL-safe base64 without padding; the signature is the first
//! 12 bytes (96 bits) of HMAC-SHA-256 over the base64 body, appended after a
//! literal `.`. Validation runs in a fixed order: structure, signature
//! (constant time), TTL, nonce, user binding, character classes.

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::{CryptoError, CryptoResult};

type HmacSha256 = Hmac<Sha256>;

/// Platform limit on `callback_data`, in bytes.
pub const CALLBACK_MAX_LEN: usize = 64;

/// How long an issued payload stays valid.
const PAYLOAD_TTL_SECS: u32 = 5 * 60;

/// Signature length kept from the HMAC output, in bytes.
const SIGNATURE_LEN: usize = 12;

/// Consumed-nonce set is trimmed once it grows past this.
const NONCE_CAPACITY: usize = 10_000;

/// Bounds on the payload fields.
const MAX_ACTION_LEN: usize = 15;
const MAX_PARAMS: usize = 5;
const MAX_KEY_LEN: usize = 10;
const MAX_VALUE_LEN: usize = 20;

/// A decoded (or to-be-encoded) callback payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackPayload {
    /// Handler action name, e.g. `get_full`.
    pub action: String,
    /// Up to five short key/value parameters, in wire order.
    pub params: Vec<(String, String)>,
    /// The user the payload is bound to, if any.
    pub user_id: Option<u32>,
    /// Unix timestamp of issuance (seconds).
    pub created_at: u32,
    /// Single-use random value.
    pub nonce: u32,
}

impl CallbackPayload {
    /// Build a payload for `action`, stamped now with a fresh nonce.
    #[must_use]
    pub fn new(action: &str, params: &[(&str, &str)], user_id: Option<u32>) -> Self {
        Self {
            action: action.to_owned(),
            params: params
                .iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                .collect(),
            user_id,
            created_at: unix_now(),
            nonce: rand::random(),
        }
    }

    /// Look up a parameter by key.
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Encoder/validator for callback payloads.
///
/// Owns the signing key and the consumed-nonce set. One codec instance is
/// shared by the whole runtime.
pub struct CallbackCodec {
    key: [u8; 32],
    consumed: Mutex<NonceSet>,
}

/// FIFO-evicting set of consumed nonces.
struct NonceSet {
    seen: HashSet<u32>,
    order: VecDeque<u32>,
}

impl NonceSet {
    fn new() -> Self {
        Self {
            seen: HashSet::new(),
            order: VecDeque::new(),
        }
    }

    /// Record `nonce`; returns `false` when it was already present.
    fn consume(&mut self, nonce: u32) -> bool {
        if !self.seen.insert(nonce) {
            return false;
        }
        self.order.push_back(nonce);
        while self.order.len() > NONCE_CAPACITY {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        true
    }
}

impl CallbackCodec {
    /// Create a codec with the given 32-byte signing key.
    #[must_use]
    pub fn new(key: [u8; 32]) -> Self {
        Self {
            key,
            consumed: Mutex::new(NonceSet::new()),
        }
    }

    /// Derive a codec key from arbitrary secret material.
    #[must_use]
    pub fn from_secret(secret: &[u8]) -> Self {
        let mut hasher = <Sha256 as sha2::Digest>::new();
        sha2::Digest::update(&mut hasher, b"bosun-callback-key");
        sha2::Digest::update(&mut hasher, secret);
        let digest = sha2::Digest::finalize(hasher);
        let mut key = [0u8; 32];
        key.copy_from_slice(&digest);
        Self::new(key)
    }

    /// Encode and sign a payload.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::BadCharacterSet`] when a field violates its
    /// whitelist or bound, and [`CryptoError::Oversize`] when the encoded
    /// form would exceed [`CALLBACK_MAX_LEN`].
    pub fn encode(&self, payload: &CallbackPayload) -> CryptoResult<String> {
        validate_fields(payload)?;

        let body = encode_body(payload);
        let body_b64 = URL_SAFE_NO_PAD.encode(&body);
        let sig_b64 = URL_SAFE_NO_PAD.encode(&self.sign(body_b64.as_bytes()));

        let encoded = format!("{body_b64}.{sig_b64}");
        if encoded.len() > CALLBACK_MAX_LEN {
            return Err(CryptoError::Oversize {
                len: encoded.len(),
                limit: CALLBACK_MAX_LEN,
            });
        }
        Ok(encoded)
    }

    /// Validate an encoded payload and consume its nonce.
    ///
    /// `expected_user` is the caller pressing the button; when the payload
    /// is user-bound the two must match.
    ///
    /// # Errors
    ///
    /// Returns the first failing check as a typed [`CryptoError`]; callers
    /// surface all of them to the user as a single generic refusal.
    pub fn decode(&self, encoded: &str, expected_user: Option<u32>) -> CryptoResult<CallbackPayload> {
        self.decode_at(encoded, expected_user, unix_now())
    }

    /// Whether `data` has the shape of a signed payload at all.
    ///
    /// A cheap structural probe used by dispatch to distinguish signed
    /// payloads from readable prefix callbacks; it does not verify anything.
    #[must_use]
    pub fn looks_signed(data: &str) -> bool {
        match data.rsplit_once('.') {
            Some((body, sig)) => !body.is_empty() && sig.len() == signature_b64_len(),
            None => false,
        }
    }

    fn decode_at(
        &self,
        encoded: &str,
        expected_user: Option<u32>,
        now: u32,
    ) -> CryptoResult<CallbackPayload> {
        // 1. Structure.
        let (body_b64, sig_b64) = encoded.rsplit_once('.').ok_or(CryptoError::BadFormat)?;
        let sig = URL_SAFE_NO_PAD
            .decode(sig_b64)
            .map_err(|_| CryptoError::BadFormat)?;
        if sig.len() != SIGNATURE_LEN {
            return Err(CryptoError::BadFormat);
        }

        // 2. Signature, compared in constant time.
        let expected = self.sign(body_b64.as_bytes());
        if expected.ct_eq(sig.as_slice()).unwrap_u8() != 1 {
            return Err(CryptoError::BadSignature);
        }

        let body = URL_SAFE_NO_PAD
            .decode(body_b64)
            .map_err(|_| CryptoError::BadFormat)?;
        let payload = decode_body(&body)?;

        // 3. TTL.
        if now > payload.created_at.saturating_add(PAYLOAD_TTL_SECS) {
            return Err(CryptoError::Expired);
        }

        // 4. Nonce is single-use.
        {
            let mut consumed = self
                .consumed
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            if !consumed.consume(payload.nonce) {
                return Err(CryptoError::NonceConsumed);
            }
        }

        // 5. User binding.
        if let Some(bound) = payload.user_id {
            if expected_user != Some(bound) {
                return Err(CryptoError::UserMismatch);
            }
        }

        // 6. Character classes.
        validate_fields(&payload)?;

        Ok(payload)
    }

    fn sign(&self, body: &[u8]) -> [u8; SIGNATURE_LEN] {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .unwrap_or_else(|_| unreachable!("HMAC accepts any key length"));
        mac.update(body);
        let tag = mac.finalize().into_bytes();
        let mut sig = [0u8; SIGNATURE_LEN];
        sig.copy_from_slice(&tag[..SIGNATURE_LEN]);
        sig
    }
}

impl std::fmt::Debug for CallbackCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackCodec").finish_non_exhaustive()
    }
}

/// Base64 length of the truncated signature.
const fn signature_b64_len() -> usize {
    // 12 bytes -> 16 base64 chars, no padding.
    SIGNATURE_LEN / 3 * 4
}

fn unix_now() -> u32 {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    u32::try_from(secs).unwrap_or(u32::MAX)
}

fn encode_body(payload: &CallbackPayload) -> Vec<u8> {
    let mut body = Vec::with_capacity(32);
    body.push(payload.action.len() as u8);
    body.extend_from_slice(payload.action.as_bytes());
    body.extend_from_slice(&payload.created_at.to_be_bytes());
    body.extend_from_slice(&payload.user_id.unwrap_or(0).to_be_bytes());
    body.extend_from_slice(&payload.nonce.to_be_bytes());
    body.push(payload.params.len() as u8);
    for (key, value) in &payload.params {
        body.push(key.len() as u8);
        body.extend_from_slice(key.as_bytes());
        body.push(value.len() as u8);
        body.extend_from_slice(value.as_bytes());
    }
    body
}

fn decode_body(body: &[u8]) -> CryptoResult<CallbackPayload> {
    let mut cursor = Cursor { body, pos: 0 };

    let action_len = cursor.take_u8()? as usize;
    let action = cursor.take_str(action_len)?;
    let created_at = cursor.take_u32()?;
    let user_raw = cursor.take_u32()?;
    let nonce_bytes = cursor.take(4)?;
    let nonce = u32::from_be_bytes([
        nonce_bytes[0],
        nonce_bytes[1],
        nonce_bytes[2],
        nonce_bytes[3],
    ]);
    let param_count = cursor.take_u8()? as usize;
    if param_count > MAX_PARAMS {
        return Err(CryptoError::BadFormat);
    }

    let mut params = Vec::with_capacity(param_count);
    for _ in 0..param_count {
        let key_len = cursor.take_u8()? as usize;
        let key = cursor.take_str(key_len)?;
        let value_len = cursor.take_u8()? as usize;
        let value = cursor.take_str(value_len)?;
        params.push((key, value));
    }

    if !cursor.exhausted() {
        return Err(CryptoError::BadFormat);
    }

    Ok(CallbackPayload {
        action,
        params,
        user_id: (user_raw != 0).then_some(user_raw),
        created_at,
        nonce,
    })
}

struct Cursor<'a> {
    body: &'a [u8],
    pos: usize,
}

impl Cursor<'_> {
    fn take(&mut self, n: usize) -> CryptoResult<&[u8]> {
        let end = self.pos.checked_add(n).ok_or(CryptoError::BadFormat)?;
        let slice = self.body.get(self.pos..end).ok_or(CryptoError::BadFormat)?;
        self.pos = end;
        Ok(slice)
    }

    fn take_u8(&mut self) -> CryptoResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn take_u32(&mut self) -> CryptoResult<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn take_str(&mut self, n: usize) -> CryptoResult<String> {
        let bytes = self.take(n)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| CryptoError::BadFormat)
    }

    fn exhausted(&self) -> bool {
        self.pos == self.body.len()
    }
}

fn validate_fields(payload: &CallbackPayload) -> CryptoResult<()> {
    if payload.action.is_empty() || payload.action.len() > MAX_ACTION_LEN {
        return Err(CryptoError::BadCharacterSet { field: "action" });
    }
    let mut chars = payload.action.chars();
    let leading_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '_');
    if !leading_ok || !chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_') {
        return Err(CryptoError::BadCharacterSet { field: "action" });
    }

    if payload.params.len() > MAX_PARAMS {
        return Err(CryptoError::BadCharacterSet { field: "params" });
    }
    for (key, value) in &payload.params {
        if key.is_empty()
            || key.len() > MAX_KEY_LEN
            || !key
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        {
            return Err(CryptoError::BadCharacterSet { field: "param key" });
        }
        if value.len() > MAX_VALUE_LEN
            || !value
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'))
        {
            return Err(CryptoError::BadCharacterSet { field: "param value" });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> CallbackCodec {
        CallbackCodec::new([7u8; 32])
    }

    #[test]
    fn roundtrip_within_limit() {
        let codec = codec();
        let payload = CallbackPayload::new("get_full", &[("c", "nginx")], Some(42));

        let encoded = codec.encode(&payload).unwrap();
        assert!(encoded.len() <= CALLBACK_MAX_LEN, "len = {}", encoded.len());

        let decoded = codec.decode(&encoded, Some(42)).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn replay_fails_with_consumed_nonce() {
        let codec = codec();
        let payload = CallbackPayload::new("get_full", &[("c", "nginx")], Some(42));
        let encoded = codec.encode(&payload).unwrap();

        codec.decode(&encoded, Some(42)).unwrap();
        assert_eq!(
            codec.decode(&encoded, Some(42)),
            Err(CryptoError::NonceConsumed)
        );
    }

    #[test]
    fn tampered_signature_rejected() {
        let codec = codec();
        let payload = CallbackPayload::new("get_full", &[("c", "nginx")], Some(42));
        let encoded = codec.encode(&payload).unwrap();

        // Flip one character of the signature.
        let mut bytes = encoded.into_bytes();
        let last = bytes.len() - 1;
        bytes[last] = if bytes[last] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).unwrap();

        assert!(matches!(
            codec.decode(&tampered, Some(42)),
            Err(CryptoError::BadSignature | CryptoError::BadFormat)
        ));
    }

    #[test]
    fn tampered_body_rejected() {
        let codec = codec();
        let payload = CallbackPayload::new("stop", &[("c", "redis")], Some(7));
        let encoded = codec.encode(&payload).unwrap();

        let mut bytes = encoded.into_bytes();
        bytes[0] = if bytes[0] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).unwrap();

        assert!(codec.decode(&tampered, Some(7)).is_err());
    }

    #[test]
    fn expired_payload_rejected() {
        let codec = codec();
        let mut payload = CallbackPayload::new("start", &[], Some(1));
        payload.created_at = unix_now().saturating_sub(PAYLOAD_TTL_SECS + 60);
        let encoded = codec.encode(&payload).unwrap();

        assert_eq!(codec.decode(&encoded, Some(1)), Err(CryptoError::Expired));
    }

    #[test]
    fn user_binding_enforced() {
        let codec = codec();
        let payload = CallbackPayload::new("restart", &[("c", "db")], Some(42));
        let encoded = codec.encode(&payload).unwrap();

        assert_eq!(
            codec.decode(&encoded, Some(99)),
            Err(CryptoError::UserMismatch)
        );
    }

    #[test]
    fn unbound_payload_accepts_any_caller() {
        let codec = codec();
        let payload = CallbackPayload::new("swap_info", &[], None);
        let encoded = codec.encode(&payload).unwrap();

        assert!(codec.decode(&encoded, Some(123)).is_ok());
    }

    #[test]
    fn action_charset_enforced() {
        let codec = codec();
        for bad in ["", "UPPER", "9lead", "has space", "way_too_long_action_name"] {
            let mut payload = CallbackPayload::new("ok", &[], None);
            payload.action = bad.to_owned();
            assert!(
                matches!(
                    codec.encode(&payload),
                    Err(CryptoError::BadCharacterSet { .. })
                ),
                "action {bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn param_bounds_enforced() {
        let codec = codec();

        let mut payload = CallbackPayload::new("a", &[], None);
        payload.params = (0..6).map(|i| (format!("k{i}"), "v".to_owned())).collect();
        assert!(codec.encode(&payload).is_err());

        let payload = CallbackPayload::new("a", &[("key_longer_than_ten", "v")], None);
        assert!(codec.encode(&payload).is_err());

        let payload = CallbackPayload::new("a", &[("k", "value-much-longer-than-twenty")], None);
        assert!(codec.encode(&payload).is_err());

        let payload = CallbackPayload::new("a", &[("k", "bad value")], None);
        assert!(codec.encode(&payload).is_err());
    }

    #[test]
    fn oversize_payload_rejected() {
        let codec = codec();
        let payload = CallbackPayload::new(
            "long_action_abc",
            &[
                ("param_one", "aaaaaaaaaaaaaaaaaaaa"),
                ("param_two", "bbbbbbbbbbbbbbbbbbbb"),
            ],
            Some(1),
        );
        assert!(matches!(
            codec.encode(&payload),
            Err(CryptoError::Oversize { .. })
        ));
    }

    #[test]
    fn garbage_input_is_bad_format() {
        let codec = codec();
        for garbage in ["", "no-separator", "a.b", "!!!.0123456789abcdef"] {
            assert!(codec.decode(garbage, None).is_err(), "{garbage:?}");
        }
    }

    #[test]
    fn nonce_set_evicts_oldest() {
        let mut set = NonceSet::new();
        for nonce in 0..=u32::try_from(NONCE_CAPACITY).unwrap() {
            assert!(set.consume(nonce));
        }
        // Capacity exceeded by one: nonce 0 was evicted and may be reused.
        assert!(set.consume(0));
        // A recent nonce is still rejected.
        assert!(!set.consume(5));
    }

    #[test]
    fn looks_signed_distinguishes_prefix_callbacks() {
        let codec = codec();
        let payload = CallbackPayload::new("rename", &[("c", "web")], Some(3));
        let encoded = codec.encode(&payload).unwrap();

        assert!(CallbackCodec::looks_signed(&encoded));
        assert!(!CallbackCodec::looks_signed("__get_full__:nginx:42"));
        assert!(!CallbackCodec::looks_signed("back_to_containers"));
    }

    #[test]
    fn derived_key_is_stable() {
        let a = CallbackCodec::from_secret(b"salt");
        let b = CallbackCodec::from_secret(b"salt");
        let payload = CallbackPayload::new("start", &[("c", "x")], Some(1));
        let encoded = a.encode(&payload).unwrap();
        assert!(b.decode(&encoded, Some(1)).is_ok());
    }
}
