//! Hexagram characteristic descriptor
//!
//! Supplied by the static content database; every field tolerates absence so
//! malformed entries degrade instead of failing deserialization.

use serde::{Deserialize, Serialize};

/// Descriptive profile of one hexagram
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HexagramCharacteristic {
    /// Display name, also the memoization key
    pub name: String,
    /// Descriptor keywords
    pub keywords: Vec<String>,
    /// Strength summary
    pub strength: String,
    /// Weakness summary
    pub weakness: String,
    /// Energy description
    pub energy: String,
}

impl HexagramCharacteristic {
    pub fn new(name: impl Into<String>, keywords: &[&str]) -> Self {
        Self {
            name: name.into(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn with_strength(mut self, strength: impl Into<String>) -> Self {
        self.strength = strength.into();
        self
    }

    pub fn with_weakness(mut self, weakness: impl Into<String>) -> Self {
        self.weakness = weakness.into();
        self
    }

    pub fn with_energy(mut self, energy: impl Into<String>) -> Self {
        self.energy = energy.into();
        self
    }

    /// First keyword, falling back to the strength summary
    pub fn lead_keyword(&self) -> &str {
        self.keywords
            .first()
            .map(String::as_str)
            .unwrap_or(self.strength.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_deserialize_to_defaults() {
        let c: HexagramCharacteristic = serde_json::from_str(r#"{"name": "乾為天"}"#).unwrap();
        assert_eq!(c.name, "乾為天");
        assert!(c.keywords.is_empty());
        assert_eq!(c.lead_keyword(), "");
    }

    #[test]
    fn test_lead_keyword() {
        let c =
            HexagramCharacteristic::new("坤為地", &["受容性", "包容"]).with_strength("支える力");
        assert_eq!(c.lead_keyword(), "受容性");

        let bare = HexagramCharacteristic::new("坤為地", &[]).with_strength("支える力");
        assert_eq!(bare.lead_keyword(), "支える力");
    }
}
