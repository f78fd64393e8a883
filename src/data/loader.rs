// ============================================================
// Layer 4 — Sample Loaders
// ============================================================
// File-backed implementations of the domain traits.
//
//   CsvIdSource  — reads the `id` column of train.csv
//   DirIdSource  — lists `<stem>` of every *.png in a directory
//   SampleStore  — maps an id to images/<id>.png (+ masks/<id>.png)
//
// Directory layout expected under a split root:
//
//   <root>/
//     images/<id>.png
//     masks/<id>.png      (training split only)
//
// Any missing or undecodable file is a hard error; nothing is
// skipped silently.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::{fs, path::PathBuf};

use crate::data::image_io::{load_image, load_mask};
use crate::domain::sample::Sample;
use crate::domain::traits::{IdSource, SampleSource};

// ─── CsvIdSource ──────────────────────────────────────────────────────────────
pub struct CsvIdSource {
    path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct IdRow {
    id: String,
}

impl CsvIdSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl IdSource for CsvIdSource {
    fn load_ids(&self) -> Result<Vec<String>> {
        let mut reader = csv::Reader::from_path(&self.path)
            .with_context(|| format!("Cannot open '{}'", self.path.display()))?;

        let ids = reader
            .deserialize::<IdRow>()
            .map(|row| row.map(|r| r.id))
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("Malformed id column in '{}'", self.path.display()))?;

        tracing::info!("Read {} ids from '{}'", ids.len(), self.path.display());
        Ok(ids)
    }
}

// ─── DirIdSource ──────────────────────────────────────────────────────────────
/// Sorted file stems of the `.png` files in a directory.
pub struct DirIdSource {
    dir: PathBuf,
}

impl DirIdSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl IdSource for DirIdSource {
    fn load_ids(&self) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.dir)
            .with_context(|| format!("Cannot read directory '{}'", self.dir.display()))?
        {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("png") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(stem.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }
}

// ─── SampleStore ──────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct SampleStore {
    root:    PathBuf,
    is_test: bool,
}

impl SampleStore {
    /// A store whose samples carry masks.
    pub fn train(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), is_test: false }
    }

    /// A store of images only.
    pub fn test(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), is_test: true }
    }

    pub fn image_path(&self, id: &str) -> PathBuf {
        self.root.join("images").join(format!("{id}.png"))
    }

    pub fn mask_path(&self, id: &str) -> PathBuf {
        self.root.join("masks").join(format!("{id}.png"))
    }
}

impl SampleSource for SampleStore {
    fn load(&self, id: &str) -> Result<Sample> {
        let (image, padding) = load_image(&self.image_path(id))?;
        if self.is_test {
            return Ok(Sample::new(id, image, None, padding));
        }

        let (mask, mask_padding) = load_mask(&self.mask_path(id))?;
        if mask.dimensions() != image.dimensions() || mask_padding != padding {
            bail!(
                "Image and mask sizes differ for '{}': {:?} vs {:?}",
                id,
                image.dimensions(),
                mask.dimensions()
            );
        }
        Ok(Sample::new(id, image, Some(mask), padding))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    #[test]
    fn test_csv_ids_keep_file_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("train.csv");
        fs::write(&path, "id,z\nc,1\na,2\nb,3\n").unwrap();
        let ids = CsvIdSource::new(&path).load_ids().unwrap();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_csv_without_id_column_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("train.csv");
        fs::write(&path, "name\nx\n").unwrap();
        assert!(CsvIdSource::new(&path).load_ids().is_err());
    }

    #[test]
    fn test_dir_ids_are_sorted_png_stems() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.png", "a.png", "notes.txt"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        let ids = DirIdSource::new(dir.path()).load_ids().unwrap();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_store_loads_padded_pair() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("images")).unwrap();
        fs::create_dir_all(dir.path().join("masks")).unwrap();
        RgbImage::from_pixel(101, 101, Rgb([5, 6, 7]))
            .save(dir.path().join("images/s1.png"))
            .unwrap();
        GrayImage::from_pixel(101, 101, Luma([255]))
            .save(dir.path().join("masks/s1.png"))
            .unwrap();

        let sample = SampleStore::train(dir.path()).load("s1").unwrap();
        assert_eq!(sample.image.dimensions(), (128, 128));
        assert_eq!(sample.mask.as_ref().unwrap().dimensions(), (128, 128));
        assert_eq!(sample.padding.top, 13);

        let test_sample = SampleStore::test(dir.path()).load("s1").unwrap();
        assert!(test_sample.mask.is_none());
    }

    #[test]
    fn test_missing_mask_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("images")).unwrap();
        RgbImage::new(32, 32).save(dir.path().join("images/s1.png")).unwrap();
        assert!(SampleStore::train(dir.path()).load("s1").is_err());
    }
}
