//! Signature verification for incoming WhatsApp webhook requests.
//!
//! Meta signs every webhook payload with HMAC-SHA256 using the app secret and
//! sends it in the `X-Hub-Signature-256` header as `sha256=<hex_signature>`.
//! The signature is computed over the raw request body bytes, never over the
//! parsed JSON, and compared in constant time.

use derive_more::{Display, Error};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::str::FromStr;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Display, Error, PartialEq, Eq)]
pub enum SignatureError {
    MissingHeader,
    MissingPrefix,
    InvalidHex,
    Mismatch,
}

/// Decoded value of the `X-Hub-Signature-256` header
#[derive(Debug)]
pub struct HubSignature(Vec<u8>);

impl FromStr for HubSignature {
    type Err = SignatureError;

    fn from_str(header: &str) -> Result<Self, Self::Err> {
        let signature_hex = header
            .strip_prefix("sha256=")
            .ok_or(SignatureError::MissingPrefix)?;

        hex::decode(signature_hex)
            .map(Self)
            .map_err(|_| SignatureError::InvalidHex)
    }
}

impl HubSignature {
    /// Checks that this signature was produced for `payload` with `app_secret`
    pub fn verify(&self, payload: &[u8], app_secret: &str) -> Result<(), SignatureError> {
        // HMAC accepts keys of any length, this cannot fail
        let mut mac = HmacSha256::new_from_slice(app_secret.as_bytes())
            .map_err(|_| SignatureError::Mismatch)?;
        mac.update(payload);
        let computed_signature = mac.finalize().into_bytes();

        if bool::from(computed_signature.ct_eq(&self.0[..])) {
            Ok(())
        } else {
            Err(SignatureError::Mismatch)
        }
    }
}

/// Verifies the optional header value of a request against its raw body
pub fn verify_request_signature(
    signature_header: Option<&str>,
    payload: &[u8],
    app_secret: &str,
) -> Result<(), SignatureError> {
    signature_header
        .ok_or(SignatureError::MissingHeader)?
        .parse::<HubSignature>()?
        .verify(payload, app_secret)
}
