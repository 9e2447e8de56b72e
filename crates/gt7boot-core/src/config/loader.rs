//! Environment loading: `.env` parsing and fallback-chain helpers.
//!
//! Reads go through [`EnvSource`] so the whole configuration can be built from a
//! plain map in tests without touching the process environment.

use std::collections::HashMap;
use std::env;
use std::path::Path;

/// A read-only view of environment variables.
pub trait EnvSource {
    fn var(&self, key: &str) -> Option<String>;
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Process environment layered over an optional `.env` file.
///
/// Variables already present in the process environment always win; the `.env`
/// file only fills gaps.
#[derive(Debug, Clone, Default)]
pub struct LayeredEnv {
    dotenv: HashMap<String, String>,
}

impl LayeredEnv {
    /// Process environment plus `<dir>/.env` when it exists.
    pub fn load(dir: &Path) -> Self {
        let path = dir.join(".env");
        let dotenv = match std::fs::read_to_string(&path) {
            Ok(content) => {
                let vars = parse_dotenv(&content);
                tracing::debug!(path = %path.display(), count = vars.len(), "Loaded .env");
                vars
            }
            Err(_) => HashMap::new(),
        };
        Self { dotenv }
    }
}

impl EnvSource for LayeredEnv {
    fn var(&self, key: &str) -> Option<String> {
        env::var(key).ok().or_else(|| self.dotenv.get(key).cloned())
    }
}

/// Parse `KEY=value` lines. Blank lines and `#` comments are skipped, surrounding
/// quotes are stripped, and an unquoted trailing `# comment` is dropped.
pub fn parse_dotenv(content: &str) -> HashMap<String, String> {
    let mut vars = HashMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some(eq_pos) = line.find('=') else {
            continue;
        };
        let key = line[..eq_pos].trim();
        let mut value = line[eq_pos + 1..].trim();
        if let Some(hash_pos) = value.find('#') {
            let before_hash = value[..hash_pos].trim_end();
            if !before_hash.contains('"') && !before_hash.contains('\'') {
                value = before_hash;
            }
        }
        if value.len() >= 2
            && ((value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\'')))
        {
            value = &value[1..value.len() - 1];
        }
        if !key.is_empty() {
            vars.insert(key.to_string(), value.to_string());
        }
    }
    vars
}

/// Read the primary key or the first set alias; blank values fall back to `default`.
pub fn env_or<F>(src: &dyn EnvSource, primary: &str, aliases: &[&str], default: F) -> String
where
    F: FnOnce() -> String,
{
    env_optional(src, primary, aliases).unwrap_or_else(default)
}

/// Read the primary key or the first set alias. Blank values count as unset,
/// so `KEY=` never hides an alias further down the chain.
pub fn env_optional(src: &dyn EnvSource, primary: &str, aliases: &[&str]) -> Option<String> {
    std::iter::once(primary)
        .chain(aliases.iter().copied())
        .find_map(|key| non_blank(src, key))
}

fn non_blank(src: &dyn EnvSource, key: &str) -> Option<String> {
    let value = src.var(key)?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Boolean flag: 0/false/no/off are false, any other non-empty value is true.
pub fn env_bool(src: &dyn EnvSource, primary: &str, aliases: &[&str], default: bool) -> bool {
    match env_optional(src, primary, aliases) {
        Some(s) => !matches!(s.to_lowercase().as_str(), "0" | "false" | "no" | "off"),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_dotenv_quotes_and_comments() {
        let parsed = parse_dotenv(
            "# dashboard\nDEVICE_IP=192.168.1.50 # ps5\nLOG_LEVEL=\"DEBUG\"\nexport OPEN_VIEWER='false'\n\nnot a pair\n",
        );
        assert_eq!(parsed.get("DEVICE_IP").map(String::as_str), Some("192.168.1.50"));
        assert_eq!(parsed.get("LOG_LEVEL").map(String::as_str), Some("DEBUG"));
        assert_eq!(parsed.get("OPEN_VIEWER").map(String::as_str), Some("false"));
        assert_eq!(parsed.len(), 3);
    }

    #[test]
    fn test_env_optional_alias_chain() {
        let src = vars(&[("GT7_PLAYSTATION_IP", "10.0.0.2")]);
        assert_eq!(
            env_optional(&src, "DEVICE_IP", &["GT7_PLAYSTATION_IP"]).as_deref(),
            Some("10.0.0.2")
        );
        let src = vars(&[("DEVICE_IP", "10.0.0.1"), ("GT7_PLAYSTATION_IP", "10.0.0.2")]);
        assert_eq!(
            env_optional(&src, "DEVICE_IP", &["GT7_PLAYSTATION_IP"]).as_deref(),
            Some("10.0.0.1")
        );
    }

    #[test]
    fn test_blank_values_are_unset() {
        let src = vars(&[("DEVICE_IP", "   ")]);
        assert_eq!(env_optional(&src, "DEVICE_IP", &[]), None);
        assert_eq!(env_or(&vars(&[("X", "")]), "X", &[], || "fallback".into()), "fallback");
    }

    #[test]
    fn test_blank_primary_does_not_hide_alias() {
        let src = vars(&[("DEVICE_IP", ""), ("GT7_PLAYSTATION_IP", "192.168.1.50")]);
        assert_eq!(
            env_optional(&src, "DEVICE_IP", &["GT7_PLAYSTATION_IP"]).as_deref(),
            Some("192.168.1.50")
        );
        let src = vars(&[("LOG_LEVEL", " "), ("GT7_LOG_LEVEL", "DEBUG")]);
        assert_eq!(env_or(&src, "LOG_LEVEL", &["GT7_LOG_LEVEL"], || "INFO".into()), "DEBUG");
    }

    #[test]
    fn test_env_bool() {
        assert!(!env_bool(&vars(&[("F", "off")]), "F", &[], true));
        assert!(env_bool(&vars(&[("F", "1")]), "F", &[], false));
        assert!(env_bool(&vars(&[]), "F", &[], true));
    }
}
