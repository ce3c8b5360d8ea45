use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::observability::metrics::get_metrics;
use crate::templates::error::TemplateError;
use crate::templates::template::Template;

/// Named templates parsed from one directory tree.
#[derive(Debug, Default)]
struct TemplateSet {
    templates: HashMap<String, Template>,
}

impl TemplateSet {
    /// Every file below `dir` becomes a template named after its file name.
    /// Files are visited in name order, so a later duplicate name wins.
    fn from_dir(dir: &Path) -> Result<Self, TemplateError> {
        let mut templates = HashMap::new();
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry?;
            if entry.file_type().is_dir() {
                continue;
            }
            let path = entry.path();
            let source = fs::read_to_string(path).map_err(|source| TemplateError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            let name = entry.file_name().to_string_lossy().into_owned();
            debug!("parsed template '{}' from {}", name, path.display());
            if let Some(previous) = templates.insert(name.clone(), Template::parse(&name, &source)?) {
                warn!("template '{}' defined more than once, keeping {}", previous.name(), path.display());
            }
        }
        if templates.is_empty() {
            return Err(TemplateError::NoTemplates(dir.to_path_buf()));
        }
        Ok(Self { templates })
    }
}

/// Parse-once, render-many template registry guarded by a single lock.
#[derive(Debug, Clone, Default)]
pub struct TemplateHolder {
    inner: Arc<RwLock<Option<TemplateSet>>>,
}

impl TemplateHolder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every file under `dir`, replacing the current set only if the
    /// whole tree parses. Returns the number of templates loaded.
    pub async fn load_templates(&self, dir: impl AsRef<Path>) -> Result<usize, TemplateError> {
        let dir = dir.as_ref().to_path_buf();
        let metrics = get_metrics().await;
        let loaded = {
            let dir = dir.clone();
            tokio::task::spawn_blocking(move || TemplateSet::from_dir(&dir)).await
        };
        let set = match loaded.map_err(TemplateError::from).and_then(|result| result) {
            Ok(set) => set,
            Err(err) => {
                metrics.template_loads.with_label_values(&["error"]).inc();
                return Err(err);
            }
        };
        let count = set.templates.len();
        *self.inner.write().await = Some(set);
        metrics.template_loads.with_label_values(&["ok"]).inc();
        info!("loaded {} templates from {}", count, dir.display());
        Ok(count)
    }

    /// Renders template `name` with `data` into `out`. Nothing is written
    /// when rendering fails.
    pub async fn apply<W: Write + ?Sized>(
        &self,
        out: &mut W,
        name: &str,
        data: &Value,
    ) -> Result<(), TemplateError> {
        let rendered = {
            let guard = self.inner.read().await;
            let result = guard
                .as_ref()
                .ok_or(TemplateError::NotLoaded)
                .and_then(|set| {
                    set.templates
                        .get(name)
                        .ok_or_else(|| TemplateError::NotFound(name.to_owned()))
                })
                .and_then(|template| template.render(data));
            match result {
                Ok(rendered) => rendered,
                Err(err) => {
                    get_metrics()
                        .await
                        .template_render_failures
                        .with_label_values(&[err.reason()])
                        .inc();
                    return Err(err);
                }
            }
        };
        out.write_all(rendered.as_bytes()).map_err(TemplateError::Write)
    }

    pub async fn is_loaded(&self) -> bool {
        self.inner.read().await.is_some()
    }

    /// Loaded template names, sorted.
    pub async fn names(&self) -> Vec<String> {
        let guard = self.inner.read().await;
        let mut names: Vec<String> = guard
            .as_ref()
            .map(|set| set.templates.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }
}
