//! Argument checks that run before any request is built.
//!
//! Token and wallet addresses are base58-encoded public keys, which encode
//! to between 32 and 44 characters. Nothing here decodes base58; the length
//! check is enough to keep obviously malformed input off the network.

use crate::error::{Error, Result};

pub const MIN_ADDRESS_LEN: usize = 32;
pub const MAX_ADDRESS_LEN: usize = 44;

pub fn validate_token_address(token: &str) -> Result<&str> {
    validate_address("token", token)
}

pub fn validate_wallet_address(wallet: &str) -> Result<&str> {
    validate_address("wallet", wallet)
}

fn validate_address<'a>(kind: &str, value: &'a str) -> Result<&'a str> {
    if value.is_empty() {
        return Err(Error::Validation(format!(
            "{kind} address must be a non-empty string"
        )));
    }
    let len = value.chars().count();
    if !(MIN_ADDRESS_LEN..=MAX_ADDRESS_LEN).contains(&len) {
        return Err(Error::Validation(format!(
            "invalid {kind} address format: expected {MIN_ADDRESS_LEN}-{MAX_ADDRESS_LEN} characters, got {len}"
        )));
    }
    Ok(value)
}

/// Reject an empty required text field.
pub fn require<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    if value.trim().is_empty() {
        return Err(Error::Validation(format!("{field} is required")));
    }
    Ok(value)
}

/// Reject an empty required list.
pub fn require_list<'a, T>(field: &str, values: &'a [T]) -> Result<&'a [T]> {
    if values.is_empty() {
        return Err(Error::Validation(format!("{field} must be a non-empty list")));
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOL_MINT: &str = "So11111111111111111111111111111111111111112";

    #[test]
    fn accepts_lengths_within_bounds() {
        for len in MIN_ADDRESS_LEN..=MAX_ADDRESS_LEN {
            let addr = "A".repeat(len);
            assert_eq!(validate_token_address(&addr).unwrap(), addr);
            assert_eq!(validate_wallet_address(&addr).unwrap(), addr);
        }
    }

    #[test]
    fn passes_real_mint_through_unchanged() {
        assert_eq!(validate_token_address(SOL_MINT).unwrap(), SOL_MINT);
    }

    #[test]
    fn rejects_too_short_and_too_long() {
        for len in [1, 10, MIN_ADDRESS_LEN - 1, MAX_ADDRESS_LEN + 1, 100] {
            let addr = "B".repeat(len);
            let err = validate_token_address(&addr).unwrap_err();
            assert!(matches!(err, Error::Validation(_)), "len {len}");
            let err = validate_wallet_address(&addr).unwrap_err();
            assert!(matches!(err, Error::Validation(_)), "len {len}");
        }
    }

    #[test]
    fn rejects_empty() {
        let err = validate_wallet_address("").unwrap_err();
        assert!(err.to_string().contains("non-empty"));
    }

    #[test]
    fn counts_characters_not_bytes() {
        // 32 two-byte characters: 64 bytes, but a valid length.
        let addr = "é".repeat(32);
        assert!(validate_token_address(&addr).is_ok());
    }

    #[test]
    fn require_rejects_blank() {
        assert!(matches!(require("query", "  "), Err(Error::Validation(_))));
        assert_eq!(require("query", "bonk").unwrap(), "bonk");
    }

    #[test]
    fn require_list_rejects_empty() {
        let empty: Vec<String> = Vec::new();
        assert!(matches!(
            require_list("tokens", &empty),
            Err(Error::Validation(_))
        ));
        assert_eq!(require_list("tokens", &[1, 2]).unwrap(), &[1, 2]);
    }
}
