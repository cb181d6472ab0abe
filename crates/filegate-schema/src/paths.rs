//! Path resolution for schema references.
//!
//! Pure path computation, no I/O beyond reading the process working
//! directory in [`absolutize`].

use std::path::{Path, PathBuf};

/// Resolve `reference` against `base_dir`.
///
/// Absolute references are returned unchanged; relative ones are joined
/// onto `base_dir`.
pub fn resolve(reference: &Path, base_dir: &Path) -> PathBuf {
    if reference.is_absolute() {
        return reference.to_path_buf();
    }
    base_dir.join(reference)
}

/// Make `path` absolute by joining it onto the current working directory.
pub fn absolutize(path: &Path) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// Directory a definition's relative references resolve against.
pub fn base_dir_of(definition_path: &Path) -> std::io::Result<PathBuf> {
    let absolute = absolutize(definition_path)?;
    Ok(absolute
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or(absolute))
}
