//! Input discovery for batch runs.
//!
//! Walks an input directory recursively and returns every file whose
//! extension has a compiled-in decoder, sorted by path so batch order and
//! report order are stable across runs. Hidden entries (leading `.`) are
//! skipped, which also keeps previous output directories such as `.cache`
//! out of the batch.

use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::image_handle::is_supported_image;
use crate::pipeline::PipelineError;

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.'))
}

/// Collect supported images under `root`.
///
/// A single file is accepted too and returned on its own if supported.
pub fn scan(root: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    if !root.exists() {
        return Err(PipelineError::InputNotFound(root.to_path_buf()));
    }
    let mut images = Vec::new();
    for entry in WalkDir::new(root).into_iter().filter_entry(|e| !is_hidden(e)) {
        let entry = entry.map_err(|e| {
            PipelineError::Io(
                e.into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("directory walk failed")),
            )
        })?;
        if entry.file_type().is_file() && is_supported_image(entry.path()) {
            images.push(entry.into_path());
        }
    }
    images.sort();
    debug!(root = %root.display(), count = images.len(), "scanned input");
    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ErrorKind;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn finds_supported_images_recursively_in_order() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "b.png");
        touch(tmp.path(), "a.JPG");
        touch(tmp.path(), "line-2/c.tiff");
        touch(tmp.path(), "notes.txt");
        touch(tmp.path(), "line-2/readme.md");

        let found = scan(tmp.path()).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.strip_prefix(tmp.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("a.JPG"),
                PathBuf::from("b.png"),
                PathBuf::from("line-2/c.tiff"),
            ]
        );
    }

    #[test]
    fn skips_hidden_entries() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), ".hidden.png");
        touch(tmp.path(), ".cache/x.png");
        touch(tmp.path(), "shown.png");
        assert_eq!(scan(tmp.path()).unwrap().len(), 1);
    }

    #[test]
    fn single_file_root() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "one.bmp");
        let found = scan(&tmp.path().join("one.bmp")).unwrap();
        assert_eq!(found, vec![tmp.path().join("one.bmp")]);
    }

    #[test]
    fn missing_root_is_io_error() {
        let err = scan(Path::new("/nonexistent/input")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn empty_directory() {
        let tmp = TempDir::new().unwrap();
        assert!(scan(tmp.path()).unwrap().is_empty());
    }
}
