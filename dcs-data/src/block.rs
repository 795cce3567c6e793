use std::collections::HashMap;

/// A configured control block parsed from a CP dump.
///
/// Identity is the pair `(compound, name)`; `cp` carries the control
/// processor the dump was taken from.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Block {
    /// Compound containing the block.
    pub compound: String,
    /// Block name, unique within its compound.
    pub name: String,
    /// Control processor the block was dumped from.
    pub cp: String,
    /// Raw configuration entries, keyed by uppercase parameter name.
    pub config: HashMap<String, String>,
}

impl Block {
    /// Raw config value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.config.get(key).map(String::as_str)
    }

    /// Configured block type, e.g. `CALC` or `COMPND`.
    pub fn block_type(&self) -> &str {
        self.get("TYPE").unwrap_or_default()
    }
}

impl std::fmt::Display for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.compound, self.name)
    }
}
