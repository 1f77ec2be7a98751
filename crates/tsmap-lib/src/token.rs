//! Token codec and the resolver seam used while decoding.
//!
//! Tokens pack up to twelve characters from a 38-symbol alphabet into a `u64`,
//! least significant digit first. Digit zero terminates the string.

use crate::template::PrefabTemplate;

/// Symbols of the token alphabet, indexed by digit value.
const LETTERS: &[u8; 38] = b"\x000123456789abcdefghijklmnopqrstuvwxyz_";

/// Number of symbols in the alphabet.
const BASE: u64 = 38;

/// Maximum number of characters a token can hold.
pub const MAX_TOKEN_LEN: usize = 12;

/// Encode a name as a token.
///
/// Returns `None` when the name is empty, longer than [`MAX_TOKEN_LEN`], or
/// contains a character outside the alphabet. Upper-case ASCII is folded.
pub fn string_to_token(text: &str) -> Option<u64> {
    if text.is_empty() || text.len() > MAX_TOKEN_LEN {
        return None;
    }

    let mut token = 0u64;
    let mut weight = 1u64;
    for ch in text.bytes() {
        let ch = ch.to_ascii_lowercase();
        let digit = LETTERS[1..].iter().position(|&letter| letter == ch)? as u64 + 1;
        token += digit * weight;
        weight = weight.saturating_mul(BASE);
    }
    Some(token)
}

/// Decode a token for diagnostics.
///
/// Values that are not well-formed tokens are rendered as hexadecimal, so the
/// result is always printable but not always reversible.
pub fn token_to_string(token: u64) -> String {
    let mut out = String::with_capacity(MAX_TOKEN_LEN);
    let mut rest = token;
    while rest != 0 {
        let digit = (rest % BASE) as usize;
        rest /= BASE;
        if digit == 0 || out.len() == MAX_TOKEN_LEN {
            return format!("{token:#x}");
        }
        out.push(LETTERS[digit] as char);
    }
    out
}

/// Resolves tokens found in map records.
///
/// Lookups are non-fatal: a missing template is reported by the caller and the
/// owning item is marked invalid.
pub trait TokenResolver {
    /// Readable form of a token, used in log messages.
    fn resolve_token(&self, token: u64) -> String {
        token_to_string(token)
    }

    /// Find the prefab template registered under `token`.
    fn lookup_prefab(&self, token: u64) -> Option<&PrefabTemplate>;
}
