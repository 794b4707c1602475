//! Compiler configuration file.
//!
//! Example `stepjs.toml`:
//! ```toml
//! [output]
//! runtime_module = "./runtime.js"
//! exports = true
//!
//! [ours]
//! functions = ["lex"]
//! classes = ["Browser"]
//! methods = ["paint"]
//!
//! [imports]
//! known = ["gtts"]
//! ```

use crate::context::Context;
use crate::module::CompileOptions;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Output configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Module the runtime helpers and library bindings are imported from.
    pub runtime_module: Option<String>,
    /// Whether to append an export list.
    pub exports: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            runtime_module: None,
            exports: true,
        }
    }
}

/// Declarations compiled elsewhere that should still be awaited.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OursConfig {
    pub functions: Vec<String>,
    pub classes: Vec<String>,
    pub methods: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ImportsConfig {
    /// Extra modules the runtime provides shims for.
    pub known: Vec<String>,
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StepConfig {
    pub output: OutputConfig,
    pub ours: OursConfig,
    pub imports: ImportsConfig,
}

impl StepConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Pre-register configured declarations and modules.
    pub fn apply(&self, ctx: &mut Context) {
        for name in &self.ours.functions {
            ctx.register_function(name.as_str());
        }
        for name in &self.ours.classes {
            ctx.register_class(name.as_str());
        }
        for name in &self.ours.methods {
            ctx.register_method(name.as_str());
        }
        for module in &self.imports.known {
            ctx.add_known_module(module.as_str());
        }
    }

    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            runtime_module: self.output.runtime_module.clone(),
            exports: self.output.exports,
        }
    }
}
