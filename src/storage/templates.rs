//! Assessment templates stored as JSON (or YAML) files.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use super::{list_files, remove_if_exists, TemplateRepository};
use crate::error::RepositoryError;
use crate::model::AssessmentTemplate;

/// Loads a template from a `.json`, `.yaml` or `.yml` file. A template whose
/// file does not set a name is named after the file stem.
pub async fn load_template_file(path: &Path) -> Result<AssessmentTemplate, RepositoryError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(RepositoryError::NotFound(path.display().to_string()))
        }
        Err(e) => return Err(e.into()),
    };

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    let raw: serde_json::Value = match ext.as_str() {
        "json" => serde_json::from_str(&content)?,
        "yaml" | "yml" => serde_yaml::from_str(&content)?,
        _ => return Err(RepositoryError::UnsupportedFormat(path.display().to_string())),
    };

    let has_name = raw.get("name").map_or(false, |n| !n.is_null());
    let mut template: AssessmentTemplate =
        serde_json::from_value(raw).map_err(|e| RepositoryError::ParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
    if !has_name {
        if let Some(stem) = path.file_stem() {
            template.name = stem.to_string_lossy().into_owned();
        }
    }
    Ok(template)
}

/// Templates kept as `<name>.json` in one directory. The file name is the
/// template's name.
#[derive(Debug, Clone)]
pub struct JsonTemplateRepository {
    templates_dir: PathBuf,
}

impl JsonTemplateRepository {
    pub fn new(templates_dir: impl Into<PathBuf>) -> Self {
        Self {
            templates_dir: templates_dir.into(),
        }
    }

    fn template_path(&self, name: &str) -> PathBuf {
        self.templates_dir.join(format!("{}.json", name))
    }
}

#[async_trait]
impl TemplateRepository for JsonTemplateRepository {
    async fn names(&self) -> Result<Vec<String>, RepositoryError> {
        let files = list_files(&self.templates_dir, &["json"]).await?;
        Ok(files
            .iter()
            .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .collect())
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<AssessmentTemplate>, RepositoryError> {
        let path = self.template_path(name);
        if !path.is_file() {
            return Ok(None);
        }
        let mut template = load_template_file(&path).await?;
        template.name = name.to_string();
        Ok(Some(template))
    }

    async fn save(&self, template: &AssessmentTemplate) -> Result<(), RepositoryError> {
        tokio::fs::create_dir_all(&self.templates_dir).await?;
        let json = serde_json::to_string_pretty(template)?;
        tokio::fs::write(self.template_path(&template.name), json).await?;
        info!(template = %template.name, "Saved template");
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<bool, RepositoryError> {
        let deleted = remove_if_exists(&self.template_path(name)).await?;
        if deleted {
            info!(template = name, "Deleted template");
        }
        Ok(deleted)
    }
}
