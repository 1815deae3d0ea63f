use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{DomainValidationError, NodeName, StackId};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeName(String);

impl AttributeName {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AttributeName {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for AttributeName {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for AttributeName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for AttributeName {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(formatter)
    }
}

/// A lazy handle to an attribute another node will only have once provisioned.
///
/// Embedding a reference in a node's configuration makes that node depend on
/// the referenced one. The reference remembers which stack minted it so that
/// it cannot silently be used in a different stack.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct OutputReference {
    #[serde(skip)]
    scope: StackId,
    node: NodeName,
    attribute: AttributeName,
}

impl OutputReference {
    #[must_use]
    pub const fn new(scope: StackId, node: NodeName, attribute: AttributeName) -> Self {
        Self {
            scope,
            node,
            attribute,
        }
    }

    #[must_use]
    pub const fn scope(&self) -> StackId {
        self.scope
    }

    #[must_use]
    pub const fn node(&self) -> &NodeName {
        &self.node
    }

    #[must_use]
    pub const fn attribute(&self) -> &AttributeName {
        &self.attribute
    }
}

impl fmt::Display for OutputReference {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "${{{}.{}}}", self.node, self.attribute)
    }
}

/// SHA-256 of a build-context file, as 64 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentDigest(String);

impl ContentDigest {
    pub const LEN: usize = 64;

    /// Wrap a hex encoded SHA-256 digest.
    ///
    /// # Errors
    ///
    /// Returns an error when `value` is not 64 lowercase hex characters.
    pub fn new(value: String) -> Result<Self, DomainValidationError> {
        let valid = value.len() == Self::LEN
            && value
                .bytes()
                .all(|byte| byte.is_ascii_digit() || (b'a'..=b'f').contains(&byte));
        if valid {
            Ok(Self(value))
        } else {
            Err(DomainValidationError::InvalidDigest { value })
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn short(&self) -> &str {
        &self.0[..12]
    }
}

impl TryFrom<String> for ContentDigest {
    type Error = DomainValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ContentDigest> for String {
    fn from(value: ContentDigest) -> Self {
        value.0
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(formatter)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "part", content = "value", rename_all = "snake_case")]
pub enum TemplatePart {
    Text(String),
    Reference(OutputReference),
}

impl From<&str> for TemplatePart {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for TemplatePart {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<OutputReference> for TemplatePart {
    fn from(value: OutputReference) -> Self {
        Self::Reference(value)
    }
}

/// A configuration value: a literal, or something only known after another
/// node is provisioned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ConfigValue {
    String(String),
    Integer(i64),
    Bool(bool),
    List(Vec<ConfigValue>),
    Map(BTreeMap<String, ConfigValue>),
    /// Literal that must never show up in rendered output.
    Sensitive(String),
    Reference(OutputReference),
    /// String interpolation mixing literal text and references.
    Template(Vec<TemplatePart>),
    Trigger(ContentDigest),
}

impl ConfigValue {
    #[must_use]
    pub fn template<I, P>(parts: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<TemplatePart>,
    {
        Self::Template(parts.into_iter().map(Into::into).collect())
    }

    #[must_use]
    pub fn sensitive(value: impl Into<String>) -> Self {
        Self::Sensitive(value.into())
    }

    /// Walk nested values and call `visitor` for every embedded reference,
    /// including those inside templates.
    pub fn visit_references<'a, F>(&'a self, visitor: &mut F)
    where
        F: FnMut(&'a OutputReference),
    {
        match self {
            Self::Reference(reference) => visitor(reference),
            Self::Template(parts) => {
                for part in parts {
                    if let TemplatePart::Reference(reference) = part {
                        visitor(reference);
                    }
                }
            }
            Self::List(items) => {
                for item in items {
                    item.visit_references(visitor);
                }
            }
            Self::Map(entries) => {
                for value in entries.values() {
                    value.visit_references(visitor);
                }
            }
            Self::String(_)
            | Self::Integer(_)
            | Self::Bool(_)
            | Self::Sensitive(_)
            | Self::Trigger(_) => {}
        }
    }

    pub fn visit_sensitive<'a, F>(&'a self, visitor: &mut F)
    where
        F: FnMut(&'a str),
    {
        match self {
            Self::Sensitive(secret) => visitor(secret),
            Self::List(items) => {
                for item in items {
                    item.visit_sensitive(visitor);
                }
            }
            Self::Map(entries) => {
                for value in entries.values() {
                    value.visit_sensitive(visitor);
                }
            }
            _ => {}
        }
    }

    /// First content trigger found in this value, depth first.
    #[must_use]
    pub fn trigger(&self) -> Option<&ContentDigest> {
        match self {
            Self::Trigger(digest) => Some(digest),
            Self::List(items) => items.iter().find_map(Self::trigger),
            Self::Map(entries) => entries.values().find_map(Self::trigger),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_reference(&self) -> Option<&OutputReference> {
        match self {
            Self::Reference(reference) => Some(reference),
            _ => None,
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<OutputReference> for ConfigValue {
    fn from(value: OutputReference) -> Self {
        Self::Reference(value)
    }
}

impl From<ContentDigest> for ConfigValue {
    fn from(value: ContentDigest) -> Self {
        Self::Trigger(value)
    }
}

impl From<Config> for ConfigValue {
    fn from(value: Config) -> Self {
        Self::Map(value.0)
    }
}

impl<T: Into<ConfigValue>> From<Vec<T>> for ConfigValue {
    fn from(value: Vec<T>) -> Self {
        Self::List(value.into_iter().map(Into::into).collect())
    }
}

/// Option name to value mapping of a node or provider.
///
/// Keys are kept sorted so serialized plans are stable.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Config(BTreeMap<String, ConfigValue>);

impl Config {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ConfigValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ConfigValue>) {
        self.0.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.0.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConfigValue)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn visit_references<'a, F>(&'a self, visitor: &mut F)
    where
        F: FnMut(&'a OutputReference),
    {
        for value in self.0.values() {
            value.visit_references(visitor);
        }
    }

    #[must_use]
    pub fn references(&self) -> Vec<&OutputReference> {
        let mut found = Vec::new();
        self.visit_references(&mut |reference| found.push(reference));
        found
    }

    #[must_use]
    pub fn sensitive_values(&self) -> Vec<&str> {
        let mut found = Vec::new();
        for value in self.0.values() {
            value.visit_sensitive(&mut |secret| found.push(secret));
        }
        found
    }

    #[must_use]
    pub fn trigger(&self) -> Option<&ContentDigest> {
        self.0.values().find_map(ConfigValue::trigger)
    }
}
