//! Plugin option values and configuration documents.

use std::collections::BTreeMap;

use serde::Serialize;

/// Option name of the reserved skip flag, consumed by the execution loop.
pub const SKIP_OPTION: &str = "skip";

/// A single plugin option value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OptionValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<OptionValue>),
}

impl OptionValue {
    /// Truthiness: null, false, zero, empty strings and empty lists are false.
    pub fn is_truthy(&self) -> bool {
        match self {
            OptionValue::Null => false,
            OptionValue::Bool(b) => *b,
            OptionValue::Integer(i) => *i != 0,
            OptionValue::Float(f) => *f != 0.0,
            OptionValue::String(s) => !s.is_empty(),
            OptionValue::List(items) => !items.is_empty(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OptionValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            OptionValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// View the value as a list of strings. A single string is a one-element list.
    pub fn as_string_list(&self) -> Option<Vec<String>> {
        match self {
            OptionValue::String(s) => Some(vec![s.clone()]),
            OptionValue::List(items) => items
                .iter()
                .map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => None,
        }
    }
}

impl From<bool> for OptionValue {
    fn from(b: bool) -> Self {
        OptionValue::Bool(b)
    }
}

impl From<i64> for OptionValue {
    fn from(i: i64) -> Self {
        OptionValue::Integer(i)
    }
}

impl From<f64> for OptionValue {
    fn from(f: f64) -> Self {
        OptionValue::Float(f)
    }
}

impl From<String> for OptionValue {
    fn from(s: String) -> Self {
        OptionValue::String(s)
    }
}

impl From<&str> for OptionValue {
    fn from(s: &str) -> Self {
        OptionValue::String(s.to_string())
    }
}

impl From<Vec<OptionValue>> for OptionValue {
    fn from(items: Vec<OptionValue>) -> Self {
        OptionValue::List(items)
    }
}

/// Mapping of option name to value for one plugin.
pub type OptionMap = BTreeMap<String, OptionValue>;

/// A configuration document: plugin config key to option mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConfigDocument {
    sections: BTreeMap<String, OptionMap>,
}

impl ConfigDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or extend a section. Later options win over earlier ones.
    pub fn insert_section(&mut self, key: impl Into<String>, options: OptionMap) {
        self.sections.entry(key.into()).or_default().extend(options);
    }

    /// Builder-style variant of [`insert_section`](Self::insert_section).
    pub fn with_section<K, I, N, V>(mut self, key: K, options: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (N, V)>,
        N: Into<String>,
        V: Into<OptionValue>,
    {
        let options = options
            .into_iter()
            .map(|(name, value)| (name.into(), value.into()))
            .collect();
        self.insert_section(key, options);
        self
    }

    pub fn section(&self, key: &str) -> Option<&OptionMap> {
        self.sections.get(key)
    }

    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

/// The merged options one plugin sees for one package.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EffectiveConfig {
    options: OptionMap,
}

impl EffectiveConfig {
    pub fn new(options: OptionMap) -> Self {
        Self { options }
    }

    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.options.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(OptionValue::as_str)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(OptionValue::as_bool)
    }

    pub fn get_string_list(&self, name: &str) -> Option<Vec<String>> {
        self.get(name).and_then(OptionValue::as_string_list)
    }

    /// Whether the reserved skip flag is present and truthy.
    pub fn is_skipped(&self) -> bool {
        self.get(SKIP_OPTION)
            .map(OptionValue::is_truthy)
            .unwrap_or(false)
    }

    pub fn options(&self) -> &OptionMap {
        &self.options
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}
