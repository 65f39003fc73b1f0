//! Compiler configuration.
//!
//! The compiler needs very little configuring: which target OS to emit
//! syscalls for and, rarely, an override of the C symbol prefix. Both can
//! come from a `cedar.toml` next to the project:
//!
//! ```toml
//! [build]
//! target = "linux"        # linux | freebsd | darwin
//! c-prefix = ""           # optional
//! ```
//!
//! Precedence is command line over config file over host detection.

use crate::codegen::{Target, TargetOs};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Name of the config file looked up in the working directory.
pub const CONFIG_FILE: &str = "cedar.toml";

#[derive(Debug, Clone, Default)]
pub struct CompilerConfig {
    /// Target OS; `None` means detect from the host.
    pub target: Option<TargetOs>,
    /// Override of the C symbol prefix; `None` means the target default.
    pub c_prefix: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    build: Option<BuildSection>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct BuildSection {
    target: Option<TargetOs>,
    c_prefix: Option<String>,
}

impl CompilerConfig {
    pub fn new() -> Self {
        CompilerConfig::default()
    }

    /// Set the target OS (builder pattern).
    pub fn with_target(mut self, target: TargetOs) -> Self {
        self.target = Some(target);
        self
    }

    /// Override the C symbol prefix.
    pub fn with_c_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.c_prefix = Some(prefix.into());
        self
    }

    /// Parse a configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, String> {
        let file: ConfigFile =
            toml::from_str(text).map_err(|e| format!("Invalid configuration: {}", e))?;
        let build = file.build.unwrap_or(BuildSection {
            target: None,
            c_prefix: None,
        });
        Ok(CompilerConfig {
            target: build.target,
            c_prefix: build.c_prefix,
        })
    }

    /// Load a configuration file from disk.
    pub fn load(path: &Path) -> Result<Self, String> {
        let text = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        Self::from_toml(&text)
    }

    /// Resolve the fully-specified target, falling back to host
    /// detection when nothing was configured.
    pub fn resolve_target(&self) -> Result<Target, String> {
        let os = match self.target.or_else(TargetOs::detect) {
            Some(os) => os,
            None => {
                return Err(
                    "Unable to determine the target OS for this host; \
                     pass --target or set build.target in cedar.toml"
                        .to_string(),
                );
            }
        };
        Ok(match &self.c_prefix {
            Some(prefix) => Target::with_c_prefix(os, prefix.clone()),
            None => Target::new(os),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_toml() {
        let config = CompilerConfig::from_toml("[build]\ntarget = \"darwin\"\n").unwrap();
        assert_eq!(config.target, Some(TargetOs::Darwin));
        assert_eq!(config.c_prefix, None);
    }

    #[test]
    fn test_from_toml_with_prefix_override() {
        let config =
            CompilerConfig::from_toml("[build]\ntarget = \"linux\"\nc-prefix = \"_\"\n").unwrap();
        let target = config.resolve_target().unwrap();
        assert!(target.is_linux());
        assert_eq!(target.c_prefix, "_");
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = CompilerConfig::from_toml("").unwrap();
        assert_eq!(config.target, None);
        assert_eq!(config.c_prefix, None);
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        assert!(CompilerConfig::from_toml("[build]\ntargett = \"linux\"\n").is_err());
    }

    #[test]
    fn test_builder() {
        let config = CompilerConfig::new().with_target(TargetOs::FreeBsd);
        let target = config.resolve_target().unwrap();
        assert!(!target.is_linux());
        assert_eq!(target.c_prefix, "");
    }

    #[test]
    fn test_configured_target_beats_detection() {
        let config = CompilerConfig::new().with_target(TargetOs::Darwin);
        let target = config.resolve_target().unwrap();
        assert_eq!(target.c_prefix, "_");
    }
}
