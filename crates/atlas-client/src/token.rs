//! Alphanumeric random tokens drawn from the OS entropy source.
//!
//! Used to mint the client nonce for each digest handshake.

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine};
use rand::{rngs::OsRng, RngCore};

use crate::error::{AtlasClientError, AtlasClientResult};

/// Redraws allowed before giving up on a token.
pub const MAX_ATTEMPTS: usize = 10;

/// Generate a token of exactly `length` characters from `[A-Za-z0-9]`.
pub fn generate(length: usize) -> AtlasClientResult<String> {
    generate_with(&mut OsRng, length)
}

/// Generate a token using the supplied random source.
///
/// Draws `ceil(length * 1.25)` bytes, base64-encodes them, strips every
/// non-alphanumeric character and truncates to `length`. Stripping can leave
/// the string short, in which case a fresh draw is made, up to
/// [`MAX_ATTEMPTS`] times.
pub fn generate_with<R>(rng: &mut R, length: usize) -> AtlasClientResult<String>
where
    R: RngCore + ?Sized,
{
    let byte_len = (length * 5).div_ceil(4);
    let mut bytes = vec![0u8; byte_len];

    for _ in 0..MAX_ATTEMPTS {
        rng.try_fill_bytes(&mut bytes)
            .map_err(|e| AtlasClientError::Generation(format!("random read error: {e}")))?;

        let mut token: String = STANDARD_NO_PAD
            .encode(&bytes)
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .collect();

        if token.len() >= length {
            token.truncate(length);
            return Ok(token);
        }
    }

    Err(AtlasClientError::Generation(format!(
        "no {length}-character token after {MAX_ATTEMPTS} attempts"
    )))
}
