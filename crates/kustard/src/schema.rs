//! Schema definitions and the references that stand in for them once stored.

use camino::{Utf8Path, Utf8PathBuf};
use std::fmt;

/// Dialect a schema definition is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SchemaDialect {
    /// Kusto Query Language script (`.kql`).
    #[default]
    Kql,
    /// Kusto control commands script (`.csl`).
    Csl,
}

impl SchemaDialect {
    pub fn extension(self) -> &'static str {
        match self {
            SchemaDialect::Kql => "kql",
            SchemaDialect::Csl => "csl",
        }
    }

    /// Parse a dialect name, as written in configuration.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "kql" => Some(SchemaDialect::Kql),
            "csl" => Some(SchemaDialect::Csl),
            _ => None,
        }
    }
}

/// The desired schema state, as opaque text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDefinition {
    dialect: SchemaDialect,
    text: String,
}

impl SchemaDefinition {
    pub fn new(dialect: SchemaDialect, text: impl Into<String>) -> Self {
        Self {
            dialect,
            text: text.into(),
        }
    }

    pub fn kql(text: impl Into<String>) -> Self {
        Self::new(SchemaDialect::Kql, text)
    }

    pub fn dialect(&self) -> SchemaDialect {
        self.dialect
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Where a stored schema definition lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaFileRef(Utf8PathBuf);

impl SchemaFileRef {
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Utf8Path {
        &self.0
    }
}

impl fmt::Display for SchemaFileRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Reference to a generated job file. Opaque: it is handed to the apply
/// engine as-is and never parsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobFileRef(Utf8PathBuf);

impl JobFileRef {
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Utf8Path {
        &self.0
    }
}

impl fmt::Display for JobFileRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
