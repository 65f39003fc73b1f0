//! Target platform detection and configuration.
//!
//! The target decides two things: which syscall convention the generator
//! uses (`int 80h` with register arguments on Linux, the stacked BSD form
//! elsewhere) and the prefix C symbols carry (`_` on Darwin).

use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Supported target operating systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetOs {
    Linux,
    #[serde(rename = "freebsd")]
    FreeBsd,
    Darwin,
}

impl TargetOs {
    /// Resolve the target from the host this compiler was built for.
    /// Returns `None` on any other host; the caller must then be told the
    /// target explicitly.
    pub fn detect() -> Option<TargetOs> {
        if cfg!(target_os = "linux") {
            Some(TargetOs::Linux)
        } else if cfg!(target_os = "freebsd") {
            Some(TargetOs::FreeBsd)
        } else if cfg!(target_os = "macos") {
            Some(TargetOs::Darwin)
        } else {
            None
        }
    }

    /// Whether syscalls use the Linux register-argument convention.
    pub fn is_linux(self) -> bool {
        matches!(self, TargetOs::Linux)
    }

    /// Prefix carried by externally-linked C symbols.
    pub fn c_prefix(self) -> &'static str {
        match self {
            TargetOs::Linux | TargetOs::FreeBsd => "",
            TargetOs::Darwin => "_",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TargetOs::Linux => "linux",
            TargetOs::FreeBsd => "freebsd",
            TargetOs::Darwin => "darwin",
        }
    }
}

impl fmt::Display for TargetOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TargetOs {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "linux" => Ok(TargetOs::Linux),
            "freebsd" => Ok(TargetOs::FreeBsd),
            "darwin" | "macos" => Ok(TargetOs::Darwin),
            other => Err(format!(
                "Unknown target '{}' (expected linux, freebsd or darwin)",
                other
            )),
        }
    }
}

/// A fully resolved target: the OS plus the (possibly overridden) C
/// symbol prefix.
#[derive(Debug, Clone)]
pub struct Target {
    pub os: TargetOs,
    pub c_prefix: String,
}

impl Target {
    pub fn new(os: TargetOs) -> Self {
        Target {
            os,
            c_prefix: os.c_prefix().to_string(),
        }
    }

    pub fn with_c_prefix(os: TargetOs, c_prefix: impl Into<String>) -> Self {
        Target {
            os,
            c_prefix: c_prefix.into(),
        }
    }

    pub fn is_linux(&self) -> bool {
        self.os.is_linux()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_c_prefix_per_os() {
        assert_eq!(TargetOs::Linux.c_prefix(), "");
        assert_eq!(TargetOs::FreeBsd.c_prefix(), "");
        assert_eq!(TargetOs::Darwin.c_prefix(), "_");
    }

    #[test]
    fn test_from_str() {
        assert_eq!("linux".parse::<TargetOs>(), Ok(TargetOs::Linux));
        assert_eq!("Darwin".parse::<TargetOs>(), Ok(TargetOs::Darwin));
        assert_eq!("macos".parse::<TargetOs>(), Ok(TargetOs::Darwin));
        assert!("plan9".parse::<TargetOs>().is_err());
    }

    #[test]
    fn test_syscall_convention_split() {
        assert!(TargetOs::Linux.is_linux());
        assert!(!TargetOs::FreeBsd.is_linux());
        assert!(!TargetOs::Darwin.is_linux());
    }

    #[test]
    fn test_prefix_override() {
        let t = Target::with_c_prefix(TargetOs::Linux, "_");
        assert_eq!(t.c_prefix, "_");
        assert!(t.is_linux());
    }
}
