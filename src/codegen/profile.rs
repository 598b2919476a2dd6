//! Render profile
//!
//! Configurable surface of the emitters: method prefixes, type-name
//! suffixes, and output layout. Classification is config-free; only
//! rendering consults the profile. Loadable from TOML so the CLI can ship a
//! project-wide profile.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Language-rendering configuration for both synthesizers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderProfile {
    /// Prefix for builder setters (`with_` gives `with_id`)
    pub setter_prefix: String,
    /// Suffix for the generated value struct (`Value` gives `UserValue`)
    pub value_suffix: String,
    /// Name of the builder entry function
    pub builder_entry: String,
    /// Name of the copy-builder entry function
    pub copy_entry: String,
    /// Emit one `pub mod` per contract (otherwise a flat file)
    pub module_per_contract: bool,
    /// Maps a validator's registry name to the Rust path generated setters
    /// invoke. Names without a mapping are emitted verbatim.
    pub validator_paths: HashMap<String, String>,
}

impl Default for RenderProfile {
    fn default() -> Self {
        let validator_paths = [
            ("non_empty_string", "dtoforge::validate::NonEmptyString"),
            ("positive_i64", "dtoforge::validate::PositiveI64"),
            ("negative_i64", "dtoforge::validate::NegativeI64"),
            ("non_positive_i64", "dtoforge::validate::NonPositiveI64"),
            ("non_negative_i64", "dtoforge::validate::NonNegativeI64"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        Self {
            setter_prefix: "with_".to_string(),
            value_suffix: "Value".to_string(),
            builder_entry: "builder".to_string(),
            copy_entry: "copy_of".to_string(),
            module_per_contract: true,
            validator_paths,
        }
    }
}

impl RenderProfile {
    pub fn value_name(&self, trait_name: &str) -> String {
        format!("{trait_name}{}", self.value_suffix)
    }

    pub fn validator_path<'a>(&'a self, name: &'a str) -> &'a str {
        self.validator_paths
            .get(name)
            .map(String::as_str)
            .unwrap_or(name)
    }
}
