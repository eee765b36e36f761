//! Plugin option schemas and validation.
//!
//! Each plugin declares the options it understands. Part construction
//! validates the user's options against that declaration, applies defaults
//! and rejects anything unknown.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use serde_json::Value;

use crate::config::ConfigError;
use crate::phase::Phase;

/// Option names shared by every built-in plugin.
pub const SOURCE_OPTION: &str = "source";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OptionType {
  String,
  Boolean,
  Integer,
  StringArray,
}

impl OptionType {
  fn describe(self) -> &'static str {
    match self {
      OptionType::String => "a string",
      OptionType::Boolean => "a boolean",
      OptionType::Integer => "an integer",
      OptionType::StringArray => "an array of strings",
    }
  }
}

/// Declaration of a single option.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionSpec {
  pub kind: OptionType,
  /// Value used when the option is omitted. `None` resolves to `null`.
  pub default: Option<Value>,
  pub required: bool,
  /// Allowed values for string options.
  pub allowed: Option<Vec<String>>,
  pub unique_items: bool,
  pub min_items: Option<usize>,
  /// The phase whose fingerprint this option feeds (`pull` or `build`).
  pub phase: Phase,
}

impl OptionSpec {
  fn new(kind: OptionType) -> Self {
    Self {
      kind,
      default: None,
      required: false,
      allowed: None,
      unique_items: false,
      min_items: None,
      phase: Phase::Build,
    }
  }

  pub fn string() -> Self {
    Self::new(OptionType::String)
  }

  pub fn boolean() -> Self {
    Self::new(OptionType::Boolean)
  }

  pub fn integer() -> Self {
    Self::new(OptionType::Integer)
  }

  pub fn string_array() -> Self {
    Self::new(OptionType::StringArray).default_value(Value::Array(Vec::new()))
  }

  pub fn default_value(mut self, value: impl Into<Value>) -> Self {
    self.default = Some(value.into());
    self
  }

  pub fn required(mut self) -> Self {
    self.required = true;
    self
  }

  pub fn one_of(mut self, values: &[&str]) -> Self {
    self.allowed = Some(values.iter().map(|v| v.to_string()).collect());
    self
  }

  pub fn unique(mut self) -> Self {
    self.unique_items = true;
    self
  }

  pub fn min_items(mut self, min: usize) -> Self {
    self.min_items = Some(min);
    self
  }

  /// Mark the option as an input of the pull phase.
  pub fn pull(mut self) -> Self {
    self.phase = Phase::Pull;
    self
  }
}

/// The full set of options a plugin accepts.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Schema {
  properties: BTreeMap<String, OptionSpec>,
}

impl Schema {
  /// An empty schema that accepts no options.
  pub fn new() -> Self {
    Self::default()
  }

  /// Schema with the options common to all built-in plugins.
  pub fn base() -> Self {
    Self::new().with(SOURCE_OPTION, OptionSpec::string().pull())
  }

  pub fn with(mut self, name: &str, spec: OptionSpec) -> Self {
    self.properties.insert(name.to_string(), spec);
    self
  }

  pub fn get(&self, name: &str) -> Option<&OptionSpec> {
    self.properties.get(name)
  }

  pub fn properties(&self) -> impl Iterator<Item = (&String, &OptionSpec)> {
    self.properties.iter()
  }

  /// Phase fed by `name`; options the schema does not know feed `build`.
  pub fn phase_of(&self, name: &str) -> Phase {
    self.properties.get(name).map(|s| s.phase).unwrap_or(Phase::Build)
  }

  /// Validate `raw` options for `part`, returning them with defaults applied.
  pub fn validate(&self, part: &str, raw: &BTreeMap<String, Value>) -> Result<ResolvedOptions, ConfigError> {
    if let Some(unknown) = raw.keys().find(|k| !self.properties.contains_key(*k)) {
      return Err(ConfigError::UnknownOption {
        part: part.to_string(),
        option: unknown.clone(),
      });
    }

    let mut resolved = BTreeMap::new();
    for (name, spec) in &self.properties {
      let value = match raw.get(name) {
        Some(Value::Null) if !spec.required => Value::Null,
        Some(value) => {
          check_value(part, name, spec, value)?;
          value.clone()
        }
        None if spec.required => {
          return Err(ConfigError::MissingOption {
            part: part.to_string(),
            option: name.clone(),
          });
        }
        None => spec.default.clone().unwrap_or(Value::Null),
      };
      resolved.insert(name.clone(), value);
    }

    Ok(ResolvedOptions(resolved))
  }
}

fn check_value(part: &str, name: &str, spec: &OptionSpec, value: &Value) -> Result<(), ConfigError> {
  let invalid_type = || ConfigError::InvalidType {
    part: part.to_string(),
    option: name.to_string(),
    expected: spec.kind.describe(),
  };

  match spec.kind {
    OptionType::String => {
      let s = value.as_str().ok_or_else(invalid_type)?;
      if let Some(allowed) = &spec.allowed
        && !allowed.iter().any(|a| a == s)
      {
        return Err(ConfigError::NotAllowed {
          part: part.to_string(),
          option: name.to_string(),
          value: s.to_string(),
          allowed: allowed.clone(),
        });
      }
    }
    OptionType::Boolean => {
      value.as_bool().ok_or_else(invalid_type)?;
    }
    OptionType::Integer => {
      value.as_i64().ok_or_else(invalid_type)?;
    }
    OptionType::StringArray => {
      let items = value.as_array().ok_or_else(invalid_type)?;
      let mut seen = HashSet::new();
      for item in items {
        let s = item.as_str().ok_or_else(invalid_type)?;
        if spec.unique_items && !seen.insert(s) {
          return Err(ConfigError::DuplicateItem {
            part: part.to_string(),
            option: name.to_string(),
            item: s.to_string(),
          });
        }
      }
      if let Some(min) = spec.min_items
        && items.len() < min
      {
        return Err(ConfigError::TooFewItems {
          part: part.to_string(),
          option: name.to_string(),
          min,
        });
      }
    }
  }

  Ok(())
}

/// Options after validation, with every declared option present.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResolvedOptions(BTreeMap<String, Value>);

impl From<BTreeMap<String, Value>> for ResolvedOptions {
  fn from(map: BTreeMap<String, Value>) -> Self {
    Self(map)
  }
}

impl ResolvedOptions {
  pub fn get(&self, name: &str) -> Option<&Value> {
    self.0.get(name)
  }

  /// String value of `name`, or `None` when unset or null.
  pub fn str(&self, name: &str) -> Option<&str> {
    self.0.get(name).and_then(Value::as_str)
  }

  /// String array value of `name`; empty when unset.
  pub fn strings(&self, name: &str) -> Vec<String> {
    self
      .0
      .get(name)
      .and_then(Value::as_array)
      .map(|items| items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
      .unwrap_or_default()
  }

  pub fn bool(&self, name: &str) -> bool {
    self.0.get(name).and_then(Value::as_bool).unwrap_or(false)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
    self.0.iter()
  }
}
