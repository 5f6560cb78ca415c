// ============================================================
// Layer 4 — Image Folder Loader
// ============================================================
// Scans a dataset root laid out as one sub-directory per class:
//
//   dataset/
//     cover_drive/  img001.jpg img002.jpg ...
//     pull_shot/    img101.png ...
//     sweep/        nested/img201.jpeg ...
//
// Rules (matching Keras flow_from_directory):
//   - Class names are the immediate sub-directories, sorted
//   - Files directly under the root are ignored
//   - Class folders are walked recursively, in sorted order
//   - Symlinked class folders count as classes, but symlinked
//     directories inside a class folder are not followed
//   - Only known image extensions are kept (case-insensitive)
//
// Only paths are collected here; pixels are decoded lazily
// by the batcher so the whole dataset never sits in memory.
//
// Reference: Rust Book §9 (Error Handling)
//            std::fs::read_dir

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::domain::class_index::ClassIndex;
use crate::domain::image_sample::ImageFolder;
use crate::domain::traits::ImageSource;

/// File extensions accepted as images
pub const IMAGE_EXTENSIONS: [&str; 7] = ["png", "jpg", "jpeg", "bmp", "ppm", "tif", "tiff"];

/// Loads the class layout of an image dataset directory.
/// Implements the ImageSource trait from Layer 3.
pub struct ImageFolderLoader {
    root: PathBuf,
}

impl ImageFolderLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ImageSource for ImageFolderLoader {
    fn scan(&self) -> Result<ImageFolder> {
        if !self.root.is_dir() {
            anyhow::bail!(
                "Dataset directory '{}' does not exist or is not a directory",
                self.root.display()
            );
        }

        let class_dirs = sorted_entries(&self.root)?
            .into_iter()
            .filter(|p| p.is_dir())
            .collect::<Vec<_>>();

        let names: Vec<String> = class_dirs
            .iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()).map(str::to_string))
            .collect();
        let class_index = ClassIndex::from_names(names);

        let mut files_by_class = vec![Vec::new(); class_index.len()];
        for dir in &class_dirs {
            let Some(name) = dir.file_name().and_then(|n| n.to_str()) else {
                tracing::warn!("Skipping non UTF-8 class folder '{}'", dir.display());
                continue;
            };
            // from_names was built from these same names, so the lookup succeeds
            if let Some(label) = class_index.index_of(name) {
                collect_images(dir, &mut files_by_class[label])?;
                tracing::debug!("Class '{}': {} images", name, files_by_class[label].len());
            }
        }

        Ok(ImageFolder { class_index, files_by_class })
    }
}

/// Returns true when the path has one of the accepted image extensions
pub fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&e.as_str())
        })
        .unwrap_or(false)
}

/// Depth-first walk: files of a directory come before its sub-directories,
/// and both are visited in sorted order.
fn collect_images(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let entries = sorted_entries(dir)?;

    for path in entries.iter().filter(|p| p.is_file() && has_image_extension(p)) {
        out.push(path.clone());
    }
    for sub in entries.iter().filter(|p| is_real_dir(p)) {
        collect_images(sub, out)?;
    }
    Ok(())
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)
        .with_context(|| format!("Cannot read directory '{}'", dir.display()))?
    {
        paths.push(entry?.path());
    }
    paths.sort();
    Ok(paths)
}

/// A directory that is not reached through a symlink
fn is_real_dir(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .map(|m| m.file_type().is_dir())
        .unwrap_or(false)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_classes_are_sorted_subdirectories() {
        let tmp = tempfile::tempdir().unwrap();
        touch(&tmp.path().join("sweep/a.jpg"));
        touch(&tmp.path().join("cover_drive/a.jpg"));
        touch(&tmp.path().join("pull_shot/a.png"));
        touch(&tmp.path().join("stray.jpg"));

        let folder = ImageFolderLoader::new(tmp.path()).scan().unwrap();
        assert_eq!(folder.class_index.names(), ["cover_drive", "pull_shot", "sweep"]);
        assert_eq!(folder.num_images(), 3);
    }

    #[test]
    fn test_filters_extensions_and_walks_nested_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        touch(&tmp.path().join("cls/b.JPEG"));
        touch(&tmp.path().join("cls/a.png"));
        touch(&tmp.path().join("cls/notes.txt"));
        touch(&tmp.path().join("cls/deeper/c.bmp"));

        let folder = ImageFolderLoader::new(tmp.path()).scan().unwrap();
        let names: Vec<String> = folder.files_by_class[0]
            .iter()
            .map(|p| p.strip_prefix(tmp.path()).unwrap().display().to_string())
            .collect();
        assert_eq!(names, ["cls/a.png", "cls/b.JPEG", "cls/deeper/c.bmp"]);
    }

    #[test]
    fn test_empty_class_folder_still_counts_as_class() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("empty")).unwrap();
        touch(&tmp.path().join("full/x.jpg"));

        let folder = ImageFolderLoader::new(tmp.path()).scan().unwrap();
        assert_eq!(folder.num_classes(), 2);
        assert!(folder.files_by_class[0].is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_class_folder_is_a_class() {
        use std::os::unix::fs::symlink;

        let tmp  = tempfile::tempdir().unwrap();
        let root = tmp.path().join("dataset");
        touch(&root.join("pull_shot/a.jpg"));
        touch(&tmp.path().join("elsewhere/sweep/b.jpg"));
        symlink(tmp.path().join("elsewhere/sweep"), root.join("sweep")).unwrap();

        // Links inside a class folder stay unfollowed
        touch(&tmp.path().join("elsewhere/extra/c.jpg"));
        symlink(tmp.path().join("elsewhere/extra"), root.join("pull_shot/linked")).unwrap();

        let folder = ImageFolderLoader::new(&root).scan().unwrap();
        assert_eq!(folder.class_index.names(), ["pull_shot", "sweep"]);
        assert_eq!(folder.files_by_class[0], [root.join("pull_shot/a.jpg")]);
        assert_eq!(folder.files_by_class[1], [root.join("sweep/b.jpg")]);
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = ImageFolderLoader::new(tmp.path().join("nope")).scan();
        assert!(err.is_err());
    }
}
