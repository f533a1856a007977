use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use mws_content::ContentStore;
use mws_core::ScriptError;
use tracing::debug;
use walkdir::WalkDir;

use crate::{map_cli_source_path, map_cli_source_read, map_cli_source_scan};

/// Loads every `.xml` file under `content_dir`, in path order, into one store.
pub(crate) fn load_content_dir(content_dir: &str) -> Result<(PathBuf, ContentStore), ScriptError> {
    let root = resolve_content_dir(content_dir)?;
    let files = read_content_xml_from_dir(&root)?;
    debug!(dir = %root.display(), files = files.len(), "loading content");
    let content = ContentStore::load_xml_map(&files)?;
    Ok((root, content))
}

pub(crate) fn resolve_content_dir(content_dir: &str) -> Result<PathBuf, ScriptError> {
    let path = PathBuf::from(content_dir);
    let absolute = if path.is_absolute() {
        path
    } else {
        std::env::current_dir()
            .map_err(map_cli_source_path)?
            .join(path)
    };

    if !absolute.exists() {
        return Err(ScriptError::new(
            "CLI_SOURCE_NOT_FOUND",
            format!("content-dir does not exist: {}", absolute.display()),
        ));
    }

    if !absolute.is_dir() {
        return Err(ScriptError::new(
            "CLI_SOURCE_NOT_DIR",
            format!("content-dir is not a directory: {}", absolute.display()),
        ));
    }

    Ok(absolute)
}

pub(crate) fn read_content_xml_from_dir(
    content_dir: &Path,
) -> Result<BTreeMap<String, String>, ScriptError> {
    let mut files = BTreeMap::new();

    for entry in WalkDir::new(content_dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if path.extension().and_then(|extension| extension.to_str()) != Some("xml") {
            continue;
        }

        let relative = path
            .strip_prefix(content_dir)
            .map_err(map_cli_source_scan)?
            .to_string_lossy()
            .replace('\\', "/");

        let source = fs::read_to_string(path).map_err(map_cli_source_read)?;
        files.insert(relative, source);
    }

    if files.is_empty() {
        return Err(ScriptError::new(
            "CLI_SOURCE_EMPTY",
            format!("No .xml files under {}", content_dir.display()),
        ));
    }

    Ok(files)
}
