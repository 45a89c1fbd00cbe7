//! Source discovery over the `ignore` walker.

use std::fs;
use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Utc};
use ignore::WalkBuilder;
use tracing::{debug, warn};

use trellis_rs::{Language, SourceFile};

/// Every recognised source file under `root`, honouring ignore files.
///
/// Paths are relative to `root` with `/` separators so node ids do not
/// depend on where the tree is checked out.
pub fn discover_sources(root: &Path) -> anyhow::Result<Vec<SourceFile>> {
    if !root.is_dir() {
        anyhow::bail!("Not a directory: {}", root.display());
    }

    let mut files = Vec::new();
    for entry in WalkBuilder::new(root).hidden(true).build() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("Skipping unreadable entry: {}", err);
                continue;
            }
        };
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }

        let path = entry.path();
        let Some(language) = Language::from_path(path) else {
            continue;
        };
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) => {
                warn!("Skipping {}: {}", path.display(), err);
                continue;
            }
        };
        let modified = entry
            .metadata()
            .ok()
            .and_then(|meta| meta.modified().ok())
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(Utc::now);

        let relative = relative_path(root, path)
            .with_context(|| format!("Failed to relativize {}", path.display()))?;
        debug!("Discovered {} ({})", relative, language);
        files.push(SourceFile::new(relative, language, text, modified));
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}

fn relative_path(root: &Path, path: &Path) -> anyhow::Result<String> {
    let relative = path.strip_prefix(root)?;
    let parts: Vec<_> = relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect();
    Ok(parts.join("/"))
}
