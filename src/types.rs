use std::fmt;
use serde::{Serialize, Deserialize};

/// Project-wide Result type
pub type Result<T> = std::result::Result<T, crate::error::Error>;

/// Key algorithm of an uploaded certificate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum KeyAlgorithm {
    /// RSA key
    Rsa,
    /// ECDSA key
    Ecdsa,
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyAlgorithm::Rsa => write!(f, "RSA"),
            KeyAlgorithm::Ecdsa => write!(f, "ECDSA"),
        }
    }
}

/// Certificate validation type of an enrollment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValidationType {
    /// Domain validated
    Dv,
    /// Organization validated
    Ov,
    /// Extended validation
    Ev,
    /// Externally issued certificate
    ThirdParty,
}

impl fmt::Display for ValidationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationType::Dv => write!(f, "dv"),
            ValidationType::Ov => write!(f, "ov"),
            ValidationType::Ev => write!(f, "ev"),
            ValidationType::ThirdParty => write!(f, "third-party"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names() {
        assert_eq!(serde_json::to_string(&KeyAlgorithm::Ecdsa).unwrap(), "\"ECDSA\"");
        assert_eq!(serde_json::to_string(&ValidationType::ThirdParty).unwrap(), "\"third-party\"");
        let parsed: ValidationType = serde_json::from_str("\"dv\"").unwrap();
        assert_eq!(parsed, ValidationType::Dv);
    }
}
