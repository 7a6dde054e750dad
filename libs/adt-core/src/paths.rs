//! Home-directory resolution for the workflow store's default location.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors resolving a base directory for on-disk state.
#[derive(Debug, Error)]
pub enum HomeDirError {
    #[error("could not determine a home directory to expand `~` against")]
    HomeMissing,
    #[error("could not resolve the current working directory: {0}")]
    Io(#[from] std::io::Error),
}

/// Resolve the directory under which `.adt/` state is stored.
///
/// Order: `ADT_HOME` environment variable, then the OS home directory, then
/// the current working directory as a last resort. Mirrors the teacher's
/// layered fallback for host state directories.
#[must_use]
pub fn default_home_dir() -> PathBuf {
    if let Ok(value) = std::env::var("ADT_HOME") {
        if !value.is_empty() {
            return PathBuf::from(value);
        }
    }
    dirs::home_dir().unwrap_or_else(|| {
        std::env::current_dir().unwrap_or_else(|_| std::env::temp_dir())
    })
}

/// The default workflow store directory, `<home>/.adt/workflows/`.
#[must_use]
pub fn default_workflow_store_dir() -> PathBuf {
    default_home_dir().join(".adt").join("workflows")
}

/// The home directory to expand a literal `~` against: `ADT_HOME` if set,
/// otherwise the OS home directory. Unlike [`default_home_dir`], this has no
/// cwd/temp fallback — a `~` the caller typed has to mean an actual home.
fn strict_home_dir() -> Result<PathBuf, HomeDirError> {
    if let Ok(value) = std::env::var("ADT_HOME") {
        if !value.is_empty() {
            return Ok(PathBuf::from(value));
        }
    }
    dirs::home_dir().ok_or(HomeDirError::HomeMissing)
}

/// Expand a leading `~` or `~/` to the resolved home directory.
///
/// # Errors
///
/// Returns [`HomeDirError::HomeMissing`] if `raw` starts with `~` and no
/// home directory can be determined.
pub fn expand_tilde(raw: &str) -> Result<PathBuf, HomeDirError> {
    if let Some(rest) = raw.strip_prefix("~/") {
        return Ok(strict_home_dir()?.join(rest));
    }
    if raw == "~" {
        return strict_home_dir();
    }
    Ok(PathBuf::from(raw))
}

/// Expand `~` and make the path absolute relative to the current directory
/// if it is not already.
///
/// # Errors
///
/// Returns [`HomeDirError::HomeMissing`] if `raw` starts with `~` and no home
/// directory can be determined, or [`HomeDirError::Io`] if the current
/// working directory cannot be read.
pub fn normalize_path(raw: &str) -> Result<PathBuf, HomeDirError> {
    let expanded = expand_tilde(raw)?;
    if expanded.is_absolute() {
        Ok(expanded)
    } else {
        Ok(std::env::current_dir()?.join(expanded))
    }
}

#[must_use]
pub fn ensure_dir_exists(dir: &Path) -> std::io::Result<()> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use temp_env::with_var;

    #[test]
    fn adt_home_env_var_overrides_default() {
        with_var("ADT_HOME", Some("/tmp/adt-home-test"), || {
            assert_eq!(default_home_dir(), PathBuf::from("/tmp/adt-home-test"));
        });
    }

    #[test]
    fn tilde_expands_to_home() {
        with_var("ADT_HOME", Some("/tmp/adt-home-test"), || {
            assert_eq!(
                expand_tilde("~/workflows").unwrap(),
                PathBuf::from("/tmp/adt-home-test/workflows")
            );
        });
    }

    #[cfg(not(target_os = "windows"))]
    #[test]
    fn expand_tilde_without_a_home_directory_errors() {
        temp_env::with_vars([("ADT_HOME", None::<&str>), ("HOME", None)], || {
            let err = expand_tilde("~/workflows").unwrap_err();
            assert!(matches!(err, HomeDirError::HomeMissing));
        });
    }

    #[test]
    fn normalize_path_leaves_absolute_paths_untouched() {
        assert_eq!(normalize_path("/abs/docs").unwrap(), PathBuf::from("/abs/docs"));
    }

    #[test]
    fn normalize_path_joins_relative_paths_onto_cwd() {
        let expected = std::env::current_dir().unwrap().join("docs");
        assert_eq!(normalize_path("docs").unwrap(), expected);
    }

    #[test]
    fn default_workflow_store_dir_is_nested_under_home() {
        with_var("ADT_HOME", Some("/tmp/adt-home-test"), || {
            assert_eq!(
                default_workflow_store_dir(),
                PathBuf::from("/tmp/adt-home-test/.adt/workflows")
            );
        });
    }
}
