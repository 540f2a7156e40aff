//! Materialization of generated file mappings onto disk.
//!
//! The producer chooses the relative paths, so every component is sanitized
//! before it touches the filesystem: traversal components are dropped and
//! illegal characters replaced. A file that still cannot be written is
//! logged and replaced by an error marker; remaining files are unaffected.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{error, info, warn};

/// Replace characters that are illegal in file names on common filesystems.
pub fn sanitize_component(component: &str) -> String {
    component
        .chars()
        .map(|c| {
            if matches!(c, '<' | '>' | ':' | '"' | '|' | '?' | '*' | '\\') || (c as u32) < 0x20 {
                '_'
            } else {
                c
            }
        })
        .collect()
}

/// Turn a producer-supplied relative path into a safe one.
///
/// Empty and `.` components are dropped, `..` components are discarded so
/// the path can never escape the target directory. Returns `None` when
/// nothing usable remains.
pub fn sanitize_rel_path(raw: &str) -> Option<PathBuf> {
    let mut sanitized = PathBuf::new();

    for component in raw.split('/') {
        match component {
            "" | "." => continue,
            ".." => {
                warn!(path = raw, "Dropping traversal component from generated path");
            }
            other => sanitized.push(sanitize_component(other)),
        }
    }

    if sanitized.as_os_str().is_empty() {
        None
    } else {
        Some(sanitized)
    }
}

/// Write a mapping of relative path to text content under `target_dir`.
///
/// Returns the number of files written successfully. Per-file failures are
/// replaced by an `error_<name>.txt` marker and never abort the rest.
pub async fn materialize(target_dir: &Path, files: &BTreeMap<String, String>) -> usize {
    let mut written = 0;

    if files.is_empty() {
        return written;
    }

    if let Err(e) = fs::create_dir_all(target_dir).await {
        error!(dir = %target_dir.display(), error = %e, "Could not create artifact directory");
        return written;
    }

    for (raw_path, content) in files {
        match write_one(target_dir, raw_path, content).await {
            Ok(path) => {
                info!(path = %path.display(), "Created artifact");
                written += 1;
            }
            Err(e) => {
                error!(file = raw_path, error = %e, "Failed to create artifact");
                write_error_marker(target_dir, raw_path, content, &e).await;
            }
        }
    }

    written
}

async fn write_one(
    target_dir: &Path,
    raw_path: &str,
    content: &str,
) -> std::io::Result<PathBuf> {
    let rel = sanitize_rel_path(raw_path).ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("no usable path components in {raw_path:?}"),
        )
    })?;

    let full_path = target_dir.join(rel);
    if let Some(parent) = full_path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(&full_path, content).await?;

    Ok(full_path)
}

async fn write_error_marker(
    target_dir: &Path,
    raw_path: &str,
    content: &str,
    cause: &std::io::Error,
) {
    let flat_name = sanitize_component(&raw_path.replace('/', "_"));
    let marker_path = target_dir.join(format!("error_{flat_name}.txt"));
    let body = format!("Error creating {raw_path}: {cause}\n\nOriginal content:\n{content}");

    if let Err(e) = fs::write(&marker_path, body).await {
        error!(path = %marker_path.display(), error = %e, "Could not write error marker");
    } else {
        info!(path = %marker_path.display(), "Created error marker");
    }
}
