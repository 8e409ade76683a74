//! Raw machine declaration, as written in the TOML file.
//!
//! This layer only describes structure.  Environment expansion and path
//! resolution happen afterwards in [`super::normalize`].
use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

/// Top-level declaration file.
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Declaration {
    /// Default machine name when none is given on the command line.
    #[serde(default)]
    pub machine: Option<String>,
    /// Environment variables exported to every command.
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    /// Tasks by name.
    #[serde(default)]
    pub tasks: BTreeMap<String, TaskDecl>,
}

/// A task entry under `[tasks.<name>]`.
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TaskDecl {
    /// Names of tasks that must run first.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Links to create, in order.
    #[serde(default)]
    pub links: Vec<LinkDecl>,
    /// Shell commands to run, in order.
    #[serde(default)]
    pub commands: Vec<String>,
}

/// A link entry: `{ target = "…", destination = "…", encrypted = false }`.
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LinkDecl {
    /// Source path, relative to the declaration's directory unless absolute.
    pub target: String,
    /// Link path, relative to the user's home unless absolute.
    pub destination: String,
    /// Whether the target is decrypted by the encryption collaborator.
    #[serde(default)]
    pub encrypted: bool,
}

impl Declaration {
    /// Parse a declaration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the text is not valid TOML or does
    /// not match the declaration schema.
    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read and parse a declaration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Parse`] if it is malformed.
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }
}
