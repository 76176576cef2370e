// Copyright (c) 2024 Spare Change Developers
// Distributed under the MIT software license

use core::fmt;

use serde::{Deserialize, Serialize};

/// Donation recipient
///
/// Two recipients are the same only if both name and address match.
///
/// Serialized as a `[name, address]` pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "(String, String)", into = "(String, String)")]
pub struct Recipient {
    /// Name
    pub name: String,
    /// Address
    pub address: String,
}

impl Recipient {
    pub fn new<N, A>(name: N, address: A) -> Self
    where
        N: Into<String>,
        A: Into<String>,
    {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }
}

impl From<(String, String)> for Recipient {
    fn from((name, address): (String, String)) -> Self {
        Self { name, address }
    }
}

impl From<Recipient> for (String, String) {
    fn from(recipient: Recipient) -> Self {
        (recipient.name, recipient.address)
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.address)
    }
}

/// Persisted charity record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Charity {
    pub enabled: bool,
    pub name: String,
    /// May be an invalid address: it's kept for display but never donated to
    pub address: String,
}

impl Charity {
    pub fn new<N, A>(enabled: bool, name: N, address: A) -> Self
    where
        N: Into<String>,
        A: Into<String>,
    {
        Self {
            enabled,
            name: name.into(),
            address: address.into(),
        }
    }

    /// Placeholder used when the user adds a new, still empty, entry
    pub fn placeholder(index: usize) -> Self {
        Self::new(
            false,
            format!("Charity #{index}"),
            format!("Charity Address {index}"),
        )
    }

    pub fn recipient(&self) -> Recipient {
        Recipient::new(self.name.clone(), self.address.clone())
    }
}

impl From<Charity> for Recipient {
    fn from(charity: Charity) -> Self {
        Self {
            name: charity.name,
            address: charity.address,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recipient_identity() {
        let a = Recipient::new("A", "addr1");
        assert_eq!(a, Recipient::new("A", "addr1"));
        assert_ne!(a, Recipient::new("A", "addr2"));
        assert_ne!(a, Recipient::new("B", "addr1"));
    }

    #[test]
    fn test_recipient_serde_as_pair() {
        let json = serde_json::to_string(&Recipient::new("A", "addr1")).unwrap();
        assert_eq!(json, r#"["A","addr1"]"#);
        let back: Recipient = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Recipient::new("A", "addr1"));
    }

    #[test]
    fn test_charity_placeholder() {
        let charity = Charity::placeholder(14);
        assert!(!charity.enabled);
        assert_eq!(charity.name, "Charity #14");
        assert_eq!(charity.address, "Charity Address 14");
        assert_eq!(
            Recipient::from(charity),
            Recipient::new("Charity #14", "Charity Address 14")
        );
    }
}
