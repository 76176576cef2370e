// Copyright (c) 2024 Spare Change Developers
// Distributed under the MIT software license

use rand::rngs::OsRng;
use rand::RngCore;

use crate::constants::{ADDRESS_URI_SCHEME, REFERENCE_LEN};

/// Generate a new random donation reference (hex)
pub fn new_reference() -> String {
    let mut bytes = [0u8; REFERENCE_LEN];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Strip the URI scheme (ex. `bitcoincash:`) from a user supplied address
#[tracing::instrument(level = "trace")]
pub fn normalize_address(address: &str) -> String {
    let address: &str = address.trim();
    let mut splitted = address.split(':');
    match (splitted.next(), splitted.next(), splitted.next()) {
        (Some(scheme), Some(rest), None) if scheme.eq_ignore_ascii_case(ADDRESS_URI_SCHEME) => {
            rest.to_string()
        }
        _ => address.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_reference() {
        let a = new_reference();
        let b = new_reference();
        assert_eq!(a.len(), REFERENCE_LEN * 2);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_normalize_address() {
        assert_eq!(
            normalize_address("bitcoincash:qp4atx0z6h6atuzchuaqssnkdqag95ecdqtt5nx8z8"),
            "qp4atx0z6h6atuzchuaqssnkdqag95ecdqtt5nx8z8"
        );
        assert_eq!(
            normalize_address("  BITCOINCASH:qp4atx0z6h6atuzchuaqssnkdqag95ecdqtt5nx8z8 "),
            "qp4atx0z6h6atuzchuaqssnkdqag95ecdqtt5nx8z8"
        );
        assert_eq!(normalize_address("bitcoincash:a:b"), "bitcoincash:a:b");
        assert_eq!(normalize_address("other:abc"), "other:abc");
        assert_eq!(normalize_address("abc"), "abc");
    }
}
