//! Scratch-directory resolution: `Workspace` spills
//! derived datasets to a scratch directory rather than holding them in
//! memory. `JLA_SCRATCH_DIR` optionally overrides where that directory
//! is created; absent that, we fall back to the OS cache directory via
//! `dirs`, and finally to `std::env::temp_dir`.

use std::env;
use std::path::PathBuf;

/// Resolve the parent directory under which `Workspace` should create
/// its scratch `TempDir`.
///
/// Resolution order:
/// 1. `JLA_SCRATCH_DIR` env var, if set.
/// 2. The OS cache directory (`dirs::cache_dir`).
/// 3. `std::env::temp_dir`.
#[must_use]
pub fn resolve_scratch_base() -> PathBuf {
    if let Ok(dir) = env::var("JLA_SCRATCH_DIR") {
        return PathBuf::from(dir);
    }
    dirs::cache_dir().unwrap_or_else(env::temp_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_override_takes_precedence() {
        std::env::set_var("JLA_SCRATCH_DIR", "/tmp/jla-test-override");
        assert_eq!(resolve_scratch_base(), PathBuf::from("/tmp/jla-test-override"));
        std::env::remove_var("JLA_SCRATCH_DIR");
    }

    #[test]
    fn falls_back_to_a_real_directory_without_override() {
        std::env::remove_var("JLA_SCRATCH_DIR");
        let base = resolve_scratch_base();
        assert!(!base.as_os_str().is_empty());
    }
}
