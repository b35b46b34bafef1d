//! Module resolution: from a logical module name to a description file.
//!
//! The description directory holds one file per module, named
//! `<Module>.wsdl`, optionally with a version-specific sibling
//! `<Module>_<major>_<minor>.wsdl` that takes precedence. Resolution never
//! falls back to a default module: a name that is not listed is an error.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::{normalize_module_name, ApiVersion, HeraError, HeraResult, ModuleName};

/// Directory searched for service descriptions when none is configured.
pub const DEFAULT_DESCRIPTION_DIR: &str = "/usr/share/zeus/wsdl";

fn configuration_error(path: &Path, reason: impl Into<String>) -> HeraError {
    HeraError::Configuration {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

/// Returns `path` as an absolute path so that the same directory always
/// yields the same description locations.
pub fn absolute_directory(path: &Path) -> HeraResult<PathBuf> {
    std::path::absolute(path).map_err(|e| configuration_error(path, e.to_string()))
}

/// Lists the modules described by regular files directly under `path`.
///
/// File names are normalized, so `Pool.wsdl` is reported as `Pool`.
/// Subdirectories are ignored.
///
/// # Errors
///
/// [`HeraError::Configuration`] if `path` is not a directory or cannot be read.
pub fn list_available_modules(path: &Path) -> HeraResult<BTreeSet<ModuleName>> {
    if !path.is_dir() {
        return Err(configuration_error(
            path,
            "service description directory does not exist or is not a directory",
        ));
    }

    let entries = fs::read_dir(path).map_err(|e| configuration_error(path, e.to_string()))?;
    let mut modules = BTreeSet::new();
    for entry in entries {
        let entry = entry.map_err(|e| configuration_error(path, e.to_string()))?;
        let entry_path = entry.path();
        if !entry_path.is_file() {
            continue;
        }
        if let Some(module) = ModuleName::new(entry.file_name().to_string_lossy()) {
            modules.insert(module);
        }
    }
    Ok(modules)
}

/// Resolves `name` to its description file under `path`.
///
/// # Errors
///
/// - [`HeraError::Configuration`] if `path` is not a readable directory.
/// - [`HeraError::ModuleNotFound`] if no file for the module is listed.
pub fn resolve_module_location(name: &str, path: &Path) -> HeraResult<PathBuf> {
    let directory = absolute_directory(path)?;
    let available = list_available_modules(&directory)?;
    match ModuleName::new(name) {
        Some(module) if available.contains(&module) => Ok(directory.join(module.file_name())),
        _ => Err(HeraError::module_not_found(normalize_module_name(name), &directory)),
    }
}

/// Resolves `name` preferring the description specific to `version`.
///
/// `Pool` with version `1.2` resolves to `Pool_1_2.wsdl` when that file is
/// listed and to `Pool.wsdl` otherwise. Returns the normalized module name
/// together with the location.
///
/// # Errors
///
/// Same as [`resolve_module_location`].
pub fn resolve_versioned_module_location(
    name: &str,
    path: &Path,
    version: ApiVersion,
) -> HeraResult<(ModuleName, PathBuf)> {
    let directory = absolute_directory(path)?;
    let available = list_available_modules(&directory)?;
    let module = ModuleName::new(name)
        .ok_or_else(|| HeraError::module_not_found(name.to_string(), &directory))?;

    let versioned = ModuleName::new(format!("{module}{}", version.file_suffix()));
    let candidate = versioned
        .into_iter()
        .chain(std::iter::once(module.clone()))
        .find(|candidate| available.contains(candidate))
        .ok_or_else(|| HeraError::module_not_found(module.to_string(), &directory))?;

    Ok((module, directory.join(candidate.file_name())))
}
