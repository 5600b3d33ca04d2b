//! Platform adapter: the handful of OS-specific facts the rest of the
//! workspace needs (file extensions, archiver invocation, worker sizing).
//!
//! Resolved once from `cfg!` target attributes rather than runtime probing —
//! cross-compiling the orchestrator itself is out of scope.

use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    MacOs,
    Windows,
}

impl Platform {
    pub const fn current() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Linux
        }
    }

    pub const fn static_lib_ext(&self) -> &'static str {
        match self {
            Platform::Windows => "lib",
            Platform::MacOs | Platform::Linux => "a",
        }
    }

    pub const fn shared_lib_ext(&self) -> &'static str {
        match self {
            Platform::Windows => "dll",
            Platform::MacOs => "dylib",
            Platform::Linux => "so",
        }
    }

    pub const fn executable_ext(&self) -> &'static str {
        match self {
            Platform::Windows => "exe",
            Platform::MacOs | Platform::Linux => "",
        }
    }

    /// Argv prefix (minus the trailing object files) for building a static
    /// archive at `output_path`.
    pub fn static_archiver_invocation(&self, output_path: &str) -> Vec<String> {
        match self {
            Platform::Windows => vec![
                "lld-link".to_string(),
                "-lib".to_string(),
                format!("/out:{}", self.sanitize_path(output_path)),
            ],
            Platform::MacOs => vec!["ld".to_string(), "-r".to_string(), "-o".to_string(), output_path.to_string()],
            Platform::Linux => vec!["ar".to_string(), "r".to_string(), output_path.to_string()],
        }
    }

    /// Windows-only escaping of backslash-space / quote sequences that would
    /// otherwise be split by the shell; a no-op on POSIX platforms.
    pub fn sanitize_path(&self, path: &str) -> String {
        if !matches!(self, Platform::Windows) {
            return path.to_string();
        }
        path.replace("\\ ", " ").replace('/', "\\").replace('"', "\\\"")
    }

    pub fn cpu_count(&self) -> usize {
        std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
    }

    /// Recommended worker-pool size: leave headroom for the OS scheduler and
    /// the orchestrator's own main thread.
    pub fn default_worker_count(&self) -> usize {
        std::cmp::max(1, self.cpu_count() / 2).saturating_sub(1).max(1)
    }

    pub fn home_dir(&self) -> Option<PathBuf> {
        dirs::home_dir()
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_worker_count_is_at_least_one() {
        let p = Platform::current();
        assert!(p.default_worker_count() >= 1);
    }

    #[test]
    fn sanitize_path_is_noop_off_windows() {
        let p = Platform::Linux;
        assert_eq!(p.sanitize_path("a b/c"), "a b/c");
    }

    #[test]
    fn sanitize_path_escapes_on_windows() {
        let p = Platform::Windows;
        assert_eq!(p.sanitize_path("a\\ b"), "a b");
    }

    #[test]
    fn archiver_invocation_differs_per_platform() {
        assert_eq!(Platform::Linux.static_archiver_invocation("out.a")[0], "ar");
        assert_eq!(Platform::MacOs.static_archiver_invocation("out.a")[0], "ld");
        assert_eq!(Platform::Windows.static_archiver_invocation("out.lib")[0], "lld-link");
    }

    #[test]
    fn extensions_match_known_platforms() {
        assert_eq!(Platform::Linux.shared_lib_ext(), "so");
        assert_eq!(Platform::MacOs.shared_lib_ext(), "dylib");
        assert_eq!(Platform::Windows.shared_lib_ext(), "dll");
        assert_eq!(Platform::Linux.executable_ext(), "");
        assert_eq!(Platform::Windows.executable_ext(), "exe");
    }
}
