//! Tokenizer rules: which words are keywords, what opens a comment and what
//! delimits a string, per language.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::ConfigError;

/// Rules file used when a language has none of its own
pub const FALLBACK_RULES_FILE: &str = "fallback.json";

/// Starting point offered when the user creates a new rules file
pub const TEMPLATE: &str = r#"{
  "keywords": ["keyword1", "keyword2", "keyword3"],
  "comments": ["//", "/*", "*/"],
  "strings": ["\"", "'"]
}"#;

const BUNDLED: &[(&str, &str)] = &[
    ("kotlin.json", include_str!("../assets/kotlin.json")),
    ("java.json", include_str!("../assets/java.json")),
    ("python.json", include_str!("../assets/python.json")),
    (FALLBACK_RULES_FILE, include_str!("../assets/fallback.json")),
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntaxRules {
    pub keywords: Vec<String>,
    pub comments: Vec<String>,
    pub strings: Vec<String>,
}

impl SyntaxRules {
    pub fn from_json(name: &str, json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|source| ConfigError::RulesParseError {
            name: name.to_string(),
            source,
        })
    }
}

/// Outcome of loading a rules file. A failure still carries usable rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigLoadResult {
    Success(SyntaxRules),
    Fallback { message: String, rules: SyntaxRules },
}

impl ConfigLoadResult {
    pub fn rules(&self) -> &SyntaxRules {
        match self {
            ConfigLoadResult::Success(rules) => rules,
            ConfigLoadResult::Fallback { rules, .. } => rules,
        }
    }

    pub fn into_rules(self) -> SyntaxRules {
        match self {
            ConfigLoadResult::Success(rules) => rules,
            ConfigLoadResult::Fallback { rules, .. } => rules,
        }
    }

    /// The problem to show the user, if any
    pub fn message(&self) -> Option<&str> {
        match self {
            ConfigLoadResult::Success(_) => None,
            ConfigLoadResult::Fallback { message, .. } => Some(message),
        }
    }
}

/// Built-in copy of a rules file, if one ships with the crate
pub fn bundled(name: &str) -> Option<&'static str> {
    BUNDLED
        .iter()
        .find(|(file, _)| *file == name)
        .map(|(_, json)| *json)
}

/// Load `name` from `configs_dir`.
///
/// A missing file is seeded from the bundled copy when there is one. Any
/// failure falls back to the bundled fallback rules, then to empty rules.
pub fn load_syntax_rules_with_fallback(configs_dir: &Path, name: &str) -> ConfigLoadResult {
    let path = configs_dir.join(name);
    if path.exists() {
        return match read_rules(&path, name) {
            Ok(rules) => {
                log::debug!("loaded rules from {}", path.display());
                ConfigLoadResult::Success(rules)
            }
            Err(e) => {
                log::warn!("{e}");
                ConfigLoadResult::Fallback {
                    message: format!(
                        "Error loading configuration '{name}': {e}. Using fallback configuration."
                    ),
                    rules: fallback_rules(),
                }
            }
        };
    }

    match seed_from_bundled(configs_dir, name) {
        Some(rules) => ConfigLoadResult::Success(rules),
        None => ConfigLoadResult::Fallback {
            message: format!("Configuration file '{name}' not found. Using fallback configuration."),
            rules: fallback_rules(),
        },
    }
}

fn read_rules(path: &Path, name: &str) -> Result<SyntaxRules, ConfigError> {
    let json = fs::read_to_string(path).map_err(|source| ConfigError::RulesReadError {
        path: path.to_path_buf(),
        source,
    })?;
    SyntaxRules::from_json(name, &json)
}

fn seed_from_bundled(configs_dir: &Path, name: &str) -> Option<SyntaxRules> {
    let json = bundled(name)?;
    let rules = match SyntaxRules::from_json(name, json) {
        Ok(rules) => rules,
        Err(e) => {
            log::warn!("bundled {e}");
            return None;
        }
    };

    // Seeding is best effort; the rules are usable either way
    let written =
        fs::create_dir_all(configs_dir).and_then(|()| fs::write(configs_dir.join(name), json));
    match written {
        Ok(()) => log::info!("copied bundled {name} to {}", configs_dir.display()),
        Err(e) => log::warn!("could not copy bundled {name}: {e}"),
    }
    Some(rules)
}

fn fallback_rules() -> SyntaxRules {
    bundled(FALLBACK_RULES_FILE)
        .and_then(|json| SyntaxRules::from_json(FALLBACK_RULES_FILE, json).ok())
        .unwrap_or_default()
}
