//! Embedded `user:pass@host` credential handling.
//!
//! Credentials found in the authority are moved into a [`BasicAuth`] and the
//! URL handed to the transport never carries them.

use percent_encoding::percent_decode_str;
use thiserror::Error;
use url::Url;

use super::types::BasicAuth;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("url cannot carry credentials: {0}")]
    CannotStrip(String),
}

/// Split embedded credentials off `url`.
///
/// Returns the URL unchanged with `None` when the authority has no user info,
/// including URLs where `@` only appears in the path or query.
pub fn extract_embedded_credentials(
    mut url: Url,
) -> Result<(Url, Option<BasicAuth>), CredentialError> {
    if url.username().is_empty() && url.password().is_none() {
        return Ok((url, None));
    }

    let auth = BasicAuth {
        username: decode(url.username()),
        password: url.password().map(decode),
    };

    url.set_username("")
        .map_err(|_| CredentialError::CannotStrip(url.to_string()))?;
    url.set_password(None)
        .map_err(|_| CredentialError::CannotStrip(url.to_string()))?;

    Ok((url, Some(auth)))
}

fn decode(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}
