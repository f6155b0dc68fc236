//! Secret handling utilities.
//!
//! Re-exports the secrecy types used for API credentials.

pub use secrecy::{ExposeSecret, SecretString};

/// Wrap a raw credential, treating blank values as absent.
pub fn secret_from(raw: Option<String>) -> Option<SecretString> {
    raw.map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(SecretString::from)
}
