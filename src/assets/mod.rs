//! Relocation of images and the logo into a run's asset directory.
//!
//! Layouts refer to assets by bare file name, resolved through the compiler's
//! search path. Relocation therefore copies each file into the asset directory
//! and hands back a question whose image points at the copied name. Files with
//! the same name overwrite each other; the last copy wins.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, error, warn};

use crate::error::AssetError;
use crate::model::Question;
use crate::selection::BlockSelection;

/// Copies an asset into a destination directory.
#[async_trait]
pub trait AssetRelocator: Send + Sync {
    /// Copies `source` into `dest_dir` and returns the relocated name.
    /// Returns `Ok(None)` when the source does not exist.
    async fn relocate(&self, source: &Path, dest_dir: &Path) -> Result<Option<String>, AssetError>;
}

/// Relocates assets on the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsAssetRelocator;

#[async_trait]
impl AssetRelocator for FsAssetRelocator {
    async fn relocate(&self, source: &Path, dest_dir: &Path) -> Result<Option<String>, AssetError> {
        match fs::metadata(source).await {
            Ok(meta) if meta.is_file() => {}
            _ => return Ok(None),
        }

        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| AssetError::InvalidPath(source.to_path_buf()))?;

        fs::create_dir_all(dest_dir).await.map_err(|e| AssetError::CopyFailed {
            path: dest_dir.to_path_buf(),
            source: e,
        })?;
        fs::copy(source, dest_dir.join(&name)).await.map_err(|e| AssetError::CopyFailed {
            path: source.to_path_buf(),
            source: e,
        })?;

        Ok(Some(name))
    }
}

/// Asset handling for one run.
#[derive(Debug, Clone)]
pub struct AssetManager<R = FsAssetRelocator> {
    assets_dir: PathBuf,
    relocator: R,
}

impl AssetManager<FsAssetRelocator> {
    pub fn new(assets_dir: impl Into<PathBuf>) -> Self {
        Self::with_relocator(assets_dir, FsAssetRelocator)
    }
}

impl<R: AssetRelocator> AssetManager<R> {
    pub fn with_relocator(assets_dir: impl Into<PathBuf>, relocator: R) -> Self {
        Self {
            assets_dir: assets_dir.into(),
            relocator,
        }
    }

    pub fn assets_dir(&self) -> &Path {
        &self.assets_dir
    }

    /// Full path of a relocated asset.
    pub fn asset_path(&self, name: &str) -> PathBuf {
        self.assets_dir.join(name)
    }

    /// Relocates the image of one question. Missing or uncopyable images are
    /// logged and the question is returned unchanged.
    pub async fn relocate_question(&self, question: &Question) -> Question {
        let Some(image) = question.image.as_ref().filter(|i| !i.path.trim().is_empty()) else {
            return question.clone();
        };

        match self.relocator.relocate(Path::new(&image.path), &self.assets_dir).await {
            Ok(Some(name)) => {
                debug!(question_id = %question.question_id, asset = %name, "Copied question image");
                question.with_image_path(name)
            }
            Ok(None) => {
                warn!(question_id = %question.question_id, path = %image.path, "Image file not found");
                question.clone()
            }
            Err(e) => {
                error!(question_id = %question.question_id, error = %e, "Failed to copy image");
                question.clone()
            }
        }
    }

    /// Returns the selections with every image relocated.
    pub async fn relocate_selections(&self, selections: &[BlockSelection]) -> Vec<BlockSelection> {
        let mut relocated = Vec::with_capacity(selections.len());
        for selection in selections {
            let mut questions = Vec::with_capacity(selection.questions.len());
            for question in &selection.questions {
                questions.push(self.relocate_question(question).await);
            }
            relocated.push(BlockSelection {
                title: selection.title.clone(),
                questions,
            });
        }
        relocated
    }

    /// Copies the logo and returns its relocated name, or `None` if it is
    /// missing or cannot be copied.
    pub async fn copy_logo(&self, logo: &Path) -> Option<String> {
        match self.relocator.relocate(logo, &self.assets_dir).await {
            Ok(Some(name)) => {
                debug!(asset = %name, "Copied logo");
                Some(name)
            }
            Ok(None) => {
                warn!(path = %logo.display(), "Logo file not found");
                None
            }
            Err(e) => {
                error!(path = %logo.display(), error = %e, "Failed to copy logo");
                None
            }
        }
    }
}
