// ============================================================
// Layer 2 — MergeUseCase
// ============================================================
// Averages the per-fold test predictions pixel by pixel:
//
//   <models_dir>/<model>/{0..num_folds}/test/<id>.png
//       → <subm_dir>/<model>/test_averaged/<id>.png
//
// The id list comes from fold 0. Ids are independent, so they are
// merged in parallel on a fixed-size rayon pool. The mean is cast
// back to u8 by truncation.
//
// Reference: rayon (ThreadPoolBuilder, par_iter)

use anyhow::{bail, Context, Result};
use image::GrayImage;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

use crate::data::{
    image_io::{load_gray, save_gray},
    loader::DirIdSource,
};
use crate::domain::traits::IdSource;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfig {
    pub models_dir: PathBuf,
    pub subm_dir:   PathBuf,
    pub model_name: String,
    pub num_folds:  usize,
    pub workers:    usize,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            models_dir: PathBuf::from("models"),
            subm_dir:   PathBuf::from("submissions"),
            model_name: "unet_11".to_string(),
            num_folds:  5,
            workers:    16,
        }
    }
}

impl MergeConfig {
    fn fold_dir(&self, fold: usize) -> PathBuf {
        self.models_dir.join(&self.model_name).join(fold.to_string()).join("test")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.subm_dir.join(&self.model_name).join("test_averaged")
    }
}

pub struct MergeUseCase {
    config: MergeConfig,
}

impl MergeUseCase {
    pub fn new(config: MergeConfig) -> Self {
        Self { config }
    }

    /// Returns the number of merged ids.
    pub fn execute(&self) -> Result<usize> {
        let cfg = &self.config;
        if cfg.num_folds == 0 {
            bail!("Nothing to merge: num_folds is 0");
        }

        let ids = DirIdSource::new(cfg.fold_dir(0)).load_ids()?;
        let out_dir = cfg.output_dir();
        fs::create_dir_all(&out_dir)
            .with_context(|| format!("Cannot create '{}'", out_dir.display()))?;
        tracing::info!("Merging {} ids across {} folds", ids.len(), cfg.num_folds);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(cfg.workers.max(1))
            .build()
            .context("Failed to build merge thread pool")?;

        pool.install(|| ids.par_iter().try_for_each(|id| self.merge_one(id)))?;

        tracing::info!("Wrote {} averaged masks to '{}'", ids.len(), out_dir.display());
        Ok(ids.len())
    }

    fn merge_one(&self, id: &str) -> Result<()> {
        let cfg = &self.config;
        let file = format!("{id}.png");

        let mut sum: Vec<u32> = Vec::new();
        let mut dims = (0, 0);
        for fold in 0..cfg.num_folds {
            let img = load_gray(&cfg.fold_dir(fold).join(&file))?;
            if fold == 0 {
                dims = img.dimensions();
                sum = vec![0; img.as_raw().len()];
            } else if img.dimensions() != dims {
                bail!(
                    "Fold {} prediction for '{}' is {:?}, fold 0 is {:?}",
                    fold, id, img.dimensions(), dims
                );
            }
            for (acc, &v) in sum.iter_mut().zip(img.as_raw()) {
                *acc += u32::from(v);
            }
        }

        let n = cfg.num_folds as f64;
        let mean: Vec<u8> = sum.iter().map(|&s| (s as f64 / n) as u8).collect();
        let merged = GrayImage::from_raw(dims.0, dims.1, mean)
            .with_context(|| format!("Buffer size mismatch merging '{id}'"))?;
        save_gray(&merged, &cfg.output_dir().join(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use std::path::Path;

    fn config(root: &Path) -> MergeConfig {
        MergeConfig {
            models_dir: root.join("models"),
            subm_dir:   root.join("subm"),
            workers:    4,
            ..MergeConfig::default()
        }
    }

    fn write_fold(cfg: &MergeConfig, fold: usize, id: &str, img: &GrayImage) {
        save_gray(img, &cfg.fold_dir(fold).join(format!("{id}.png"))).unwrap();
    }

    #[test]
    fn test_constant_folds_average_to_mean() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        for (fold, v) in [10u8, 20, 30, 40, 50].into_iter().enumerate() {
            for id in ["a", "b"] {
                write_fold(&cfg, fold, id, &GrayImage::from_pixel(7, 5, Luma([v])));
            }
        }

        assert_eq!(MergeUseCase::new(cfg.clone()).execute().unwrap(), 2);
        let merged = load_gray(&cfg.output_dir().join("a.png")).unwrap();
        assert_eq!(merged.dimensions(), (7, 5));
        assert!(merged.pixels().all(|p| p.0[0] == 30));
    }

    #[test]
    fn test_mean_is_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = MergeConfig { num_folds: 2, ..config(dir.path()) };
        write_fold(&cfg, 0, "x", &GrayImage::from_pixel(2, 2, Luma([0])));
        write_fold(&cfg, 1, "x", &GrayImage::from_pixel(2, 2, Luma([255])));

        MergeUseCase::new(cfg.clone()).execute().unwrap();
        let merged = load_gray(&cfg.output_dir().join("x.png")).unwrap();
        assert_eq!(merged.get_pixel(0, 0).0[0], 127);
    }

    #[test]
    fn test_dimension_mismatch_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = MergeConfig { num_folds: 2, ..config(dir.path()) };
        write_fold(&cfg, 0, "x", &GrayImage::new(4, 4));
        write_fold(&cfg, 1, "x", &GrayImage::new(4, 5));
        assert!(MergeUseCase::new(cfg).execute().is_err());
    }

    #[test]
    fn test_missing_fold_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = MergeConfig { num_folds: 3, ..config(dir.path()) };
        write_fold(&cfg, 0, "x", &GrayImage::new(4, 4));
        write_fold(&cfg, 1, "x", &GrayImage::new(4, 4));
        assert!(MergeUseCase::new(cfg).execute().is_err());
    }
}
