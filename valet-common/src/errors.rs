//! Error catalog shared across the workspace.
//!
//! Every fallible component defines its own `thiserror` enum; each variant
//! also maps to a stable [`ErrorCode`] so operators can grep a log line for
//! `VLT-E1xx` without caring which Rust type produced it.
//!
//! # Error Code Ranges
//!
//! | Range | Category  | Description                              |
//! |-------|-----------|-------------------------------------------|
//! | E0xx  | Manifest  | Parsing and validation of `valet.toml`     |
//! | E1xx  | Resolver  | Dependency graph and remote fetch errors   |
//! | E2xx  | Build     | Source layout and linkage errors           |
//! | E3xx  | Execution | Command execution and pool errors          |
//! | E9xx  | Internal  | I/O races and unexpected filesystem states |

use std::fmt;

/// Stable, user-facing error code. Does not carry payload data — pair it
/// with the originating `thiserror` variant's `Display` for details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorCode {
    ManifestNotFound,
    ManifestParseError,
    ManifestInvalidType,
    ManifestMissingIncludeDir,
    ManifestUnsupportedDependencyForm,

    ResolverCycle,
    ResolverUnresolvedDependency,
    ResolverFetchFailed,
    ResolverGitUnavailable,

    BuildMissingSourceFolder,
    BuildUnsupportedLinkage,

    ExecutionCommandFailed,
    ExecutionPoolShutdown,

    InternalIoRace,
    InternalMtimeUnreadable,
}

impl ErrorCode {
    pub const fn code_number(&self) -> u16 {
        match self {
            Self::ManifestNotFound => 0,
            Self::ManifestParseError => 1,
            Self::ManifestInvalidType => 2,
            Self::ManifestMissingIncludeDir => 3,
            Self::ManifestUnsupportedDependencyForm => 4,

            Self::ResolverCycle => 100,
            Self::ResolverUnresolvedDependency => 101,
            Self::ResolverFetchFailed => 102,
            Self::ResolverGitUnavailable => 103,

            Self::BuildMissingSourceFolder => 200,
            Self::BuildUnsupportedLinkage => 201,

            Self::ExecutionCommandFailed => 300,
            Self::ExecutionPoolShutdown => 301,

            Self::InternalIoRace => 900,
            Self::InternalMtimeUnreadable => 901,
        }
    }

    pub fn code_string(&self) -> String {
        format!("VLT-E{:03}", self.code_number())
    }

    pub const fn category(&self) -> ErrorCategory {
        match self.code_number() {
            0..=99 => ErrorCategory::Manifest,
            100..=199 => ErrorCategory::Resolver,
            200..=299 => ErrorCategory::Build,
            300..=399 => ErrorCategory::Execution,
            _ => ErrorCategory::Internal,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Manifest,
    Resolver,
    Build,
    Execution,
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Manifest => "manifest",
            Self::Resolver => "resolver",
            Self::Build => "build",
            Self::Execution => "execution",
            Self::Internal => "internal",
        };
        write!(f, "{label}")
    }
}

/// Attach an [`ErrorCode`] to an error that can also display itself. Used by
/// `thiserror` enums to give every variant a stable grep-able prefix without
/// repeating the `VLT-Exxx` string in every `#[error("...")]` template.
pub trait CodedError: fmt::Display {
    fn code(&self) -> ErrorCode;

    fn coded_message(&self) -> String {
        format!("[{}] {}", self.code(), self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_string_is_zero_padded() {
        assert_eq!(ErrorCode::ManifestNotFound.code_string(), "VLT-E000");
        assert_eq!(ErrorCode::ResolverCycle.code_string(), "VLT-E100");
    }

    #[test]
    fn category_matches_range() {
        assert_eq!(ErrorCode::ManifestParseError.category(), ErrorCategory::Manifest);
        assert_eq!(ErrorCode::ResolverFetchFailed.category(), ErrorCategory::Resolver);
        assert_eq!(ErrorCode::BuildUnsupportedLinkage.category(), ErrorCategory::Build);
        assert_eq!(ErrorCode::ExecutionPoolShutdown.category(), ErrorCategory::Execution);
        assert_eq!(ErrorCode::InternalIoRace.category(), ErrorCategory::Internal);
    }
}
