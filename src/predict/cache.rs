//! On-disk cache of calibrated models, one JSON file per mode
//!
//! Writes go to a temporary file in the cache directory which is then
//! renamed over the entry, so a reader sees either the old model or the new
//! one, never a partial file.

use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::{Mode, Result};

use super::CalibratedModel;

pub struct ModelCache {
    dir: PathBuf,
}

impl ModelCache {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        ModelCache {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self, mode: Mode) -> PathBuf {
        self.dir.join(format!("{}.json", mode))
    }

    /// True if an entry file exists for `mode`, usable or not
    pub fn contains(&self, mode: Mode) -> bool {
        self.path(mode).is_file()
    }

    /// Cached model for `mode`. A missing, unreadable, or mismatched entry
    /// is reported as `None` so the caller retrains.
    pub fn load<M: DeserializeOwned>(&self, mode: Mode) -> Option<CalibratedModel<M>> {
        let path = self.path(mode);
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                log::warn!("Ignoring unreadable cache entry {}: {}", path.display(), e);
                return None;
            }
        };

        match serde_json::from_reader::<_, CalibratedModel<M>>(BufReader::new(file)) {
            Ok(model) if model.mode == mode => Some(model),
            Ok(model) => {
                log::warn!(
                    "Ignoring cache entry {}: holds a {} model",
                    path.display(),
                    model.mode
                );
                None
            }
            Err(e) => {
                log::warn!("Ignoring corrupt cache entry {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Replace the entry for `model.mode`
    pub fn store<M: Serialize>(&self, model: &CalibratedModel<M>) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;

        let path = self.path(model.mode);
        let tmp = self
            .dir
            .join(format!(".{}.json.{}.tmp", model.mode, std::process::id()));

        let written = (|| -> Result<()> {
            let file = File::create(&tmp)?;
            let mut out = BufWriter::new(file);
            serde_json::to_writer(&mut out, model)?;
            out.flush()?;
            out.get_ref().sync_all()?;
            Ok(())
        })();

        if let Err(e) = written.and_then(|_| std::fs::rename(&tmp, &path).map_err(Into::into)) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e);
        }

        log::info!("Wrote {} model to {}", model.mode, path.display());
        Ok(())
    }

    /// Cached model unless `force_retrain`, otherwise train, store and
    /// return a fresh one
    pub fn get_or_train<M, F>(
        &self,
        mode: Mode,
        force_retrain: bool,
        train: F,
    ) -> Result<CalibratedModel<M>>
    where
        M: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<CalibratedModel<M>>,
    {
        if !force_retrain {
            if let Some(model) = self.load(mode) {
                log::debug!("Loaded {} model from cache", mode);
                return Ok(model);
            }
        }

        let model = train()?;
        self.store(&model)?;
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Hyperparameters;

    fn entry(mode: Mode, loss: f64) -> CalibratedModel<Vec<f64>> {
        CalibratedModel {
            mode,
            hyperparameters: Hyperparameters {
                kfactor: 0.1,
                home_field: 0.2,
                halflife: 0.1 + 0.2,
                fatigue: 1.0 / 3.0,
            },
            loss,
            model: vec![0.1, -2.5e-7, std::f64::consts::PI],
        }
    }

    #[test]
    fn test_store_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ModelCache::new(dir.path());

        assert!(cache.load::<Vec<f64>>(Mode::Spread).is_none());
        assert!(!cache.contains(Mode::Spread));

        let model = entry(Mode::Spread, 12.5);
        cache.store(&model).unwrap();
        assert!(cache.contains(Mode::Spread));
        assert!(!cache.contains(Mode::Total));

        let loaded: CalibratedModel<Vec<f64>> = cache.load(Mode::Spread).unwrap();
        assert_eq!(loaded, model);
        assert!(cache.load::<Vec<f64>>(Mode::Total).is_none());
    }

    #[test]
    fn test_store_overwrites_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ModelCache::new(dir.path());

        cache.store(&entry(Mode::Total, 20.0)).unwrap();
        cache.store(&entry(Mode::Total, 19.0)).unwrap();

        let loaded: CalibratedModel<Vec<f64>> = cache.load(Mode::Total).unwrap();
        assert_eq!(loaded.loss, 19.0);

        let files: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(files, vec!["total.json".to_string()]);
    }

    #[test]
    fn test_corrupt_entry_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ModelCache::new(dir.path());
        std::fs::write(cache.path(Mode::Spread), "{\"mode\": \"spr").unwrap();

        assert!(cache.load::<Vec<f64>>(Mode::Spread).is_none());

        let model = cache
            .get_or_train(Mode::Spread, false, || Ok(entry(Mode::Spread, 9.0)))
            .unwrap();
        assert_eq!(model.loss, 9.0);
        assert!(cache.load::<Vec<f64>>(Mode::Spread).is_some());
    }

    #[test]
    fn test_mismatched_mode_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ModelCache::new(dir.path());
        cache.store(&entry(Mode::Total, 20.0)).unwrap();
        std::fs::rename(cache.path(Mode::Total), cache.path(Mode::Spread)).unwrap();

        assert!(cache.load::<Vec<f64>>(Mode::Spread).is_none());
    }

    #[test]
    fn test_get_or_train_hits_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ModelCache::new(dir.path());
        let mut trained = 0;

        for _ in 0..2 {
            cache
                .get_or_train(Mode::Spread, false, || {
                    trained += 1;
                    Ok(entry(Mode::Spread, 10.0))
                })
                .unwrap();
        }
        assert_eq!(trained, 1);

        cache
            .get_or_train(Mode::Spread, true, || {
                trained += 1;
                Ok(entry(Mode::Spread, 8.0))
            })
            .unwrap();
        assert_eq!(trained, 2);
    }

    #[test]
    fn test_failed_training_keeps_old_entry() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ModelCache::new(dir.path());
        cache.store(&entry(Mode::Spread, 10.0)).unwrap();

        let result = cache.get_or_train::<Vec<f64>, _>(Mode::Spread, true, || {
            Err(crate::CfbError::FitFailed("diverged".to_string()))
        });
        assert!(result.is_err());

        let kept: CalibratedModel<Vec<f64>> = cache.load(Mode::Spread).unwrap();
        assert_eq!(kept.loss, 10.0);
    }
}
