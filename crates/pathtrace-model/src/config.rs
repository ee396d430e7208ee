//! Property-style configuration lookup.
//!
//! Sources are `key = value` property files, `+key=value` overrides from the
//! command line, or a flat JSON object. Typed accessors never fail: a missing
//! or malformed value resolves to the caller's default.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("line {line}: expected `key = value`, got `{text}`")]
    MalformedLine { line: usize, text: String },

    #[error("override `{0}` must have the form `+key=value`")]
    MalformedOverride(String),

    #[error("JSON config error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("JSON config must be a flat object, key `{key}` is nested")]
    NestedValue { key: String },

    #[error("JSON config must be an object")]
    NotAnObject,

    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    entries: BTreeMap<String, String>,
}

impl Config {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Parse property text. `#` and `!` start comment lines, a trailing
    /// backslash continues the value on the next line.
    pub fn parse_properties(text: &str) -> Result<Self, ConfigError> {
        let mut config = Self::new();
        let mut pending: Option<(usize, String)> = None;

        for (i, raw) in text.lines().enumerate() {
            let line_no = i + 1;
            let line = raw.trim();

            let (start, mut logical) = match pending.take() {
                Some((start, mut acc)) => {
                    acc.push_str(line);
                    (start, acc)
                }
                None => {
                    if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                        continue;
                    }
                    (line_no, line.to_string())
                }
            };

            if logical.ends_with('\\') {
                logical.pop();
                pending = Some((start, logical));
                continue;
            }

            config.insert_pair(&logical, start)?;
        }

        if let Some((start, logical)) = pending {
            config.insert_pair(&logical, start)?;
        }

        Ok(config)
    }

    /// Apply `+key=value` overrides, e.g. from command-line arguments.
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Result<Self, ConfigError> {
        let mut config = Self::new();
        config.apply_args(args)?;
        Ok(config)
    }

    pub fn apply_args<S: AsRef<str>>(&mut self, args: &[S]) -> Result<(), ConfigError> {
        for arg in args {
            let arg = arg.as_ref();
            let (key, value) = arg
                .strip_prefix('+')
                .and_then(|rest| rest.split_once('='))
                .ok_or_else(|| ConfigError::MalformedOverride(arg.to_string()))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(ConfigError::MalformedOverride(arg.to_string()));
            }
            self.set(key, value.trim());
        }
        Ok(())
    }

    /// Load a flat JSON object. Arrays become comma-separated lists, `null`
    /// entries are skipped.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let serde_json::Value::Object(map) = value else {
            return Err(ConfigError::NotAnObject);
        };

        let mut config = Self::new();
        for (key, value) in map {
            let text = match value {
                serde_json::Value::Null => continue,
                serde_json::Value::String(s) => s,
                serde_json::Value::Bool(b) => b.to_string(),
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::Array(items) => {
                    let mut parts = Vec::with_capacity(items.len());
                    for item in items {
                        match item {
                            serde_json::Value::String(s) => parts.push(s),
                            serde_json::Value::Bool(_) | serde_json::Value::Number(_) => {
                                parts.push(item.to_string())
                            }
                            _ => return Err(ConfigError::NestedValue { key }),
                        }
                    }
                    parts.join(",")
                }
                serde_json::Value::Object(_) => return Err(ConfigError::NestedValue { key }),
            };
            config.set(&key, &text);
        }
        Ok(config)
    }

    /// Read a config file; `.json` files are parsed as JSON, anything else as
    /// properties.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&text),
            _ => Self::parse_properties(&text),
        }
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Split a list value on commas, semicolons and whitespace. Returns
    /// `None` if the key is absent; empty items are dropped.
    pub fn get_string_array(&self, key: &str) -> Option<Vec<String>> {
        self.get_string(key).map(|value| {
            value
                .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect()
        })
    }

    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        let Some(value) = self.get_string(key) else {
            return default;
        };
        match value.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" => true,
            "false" | "no" | "off" => false,
            _ => {
                tracing::warn!(key, value, default, "malformed boolean, using default");
                default
            }
        }
    }

    pub fn get_int(&self, key: &str, default: i64) -> i64 {
        self.get_parsed(key, default)
    }

    pub fn get_u64(&self, key: &str, default: u64) -> u64 {
        self.get_parsed(key, default)
    }

    /// Look up an enumerated option. Parsing is delegated to the enum's
    /// `FromStr` impl.
    pub fn get_enum<T: FromStr>(&self, key: &str, default: T) -> T {
        self.get_parsed(key, default)
    }

    fn get_parsed<T: FromStr>(&self, key: &str, default: T) -> T {
        let Some(value) = self.get_string(key) else {
            return default;
        };
        match value.trim().parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                tracing::warn!(key, value, "malformed value, using default");
                default
            }
        }
    }

    fn insert_pair(&mut self, logical: &str, line: usize) -> Result<(), ConfigError> {
        let (key, value) = logical
            .split_once('=')
            .ok_or_else(|| ConfigError::MalformedLine {
                line,
                text: logical.to_string(),
            })?;
        let key = key.trim();
        if key.is_empty() {
            return Err(ConfigError::MalformedLine {
                line,
                text: logical.to_string(),
            });
        }
        self.set(key, value.trim());
        Ok(())
    }
}
