use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template holder: templates not loaded")]
    NotLoaded,
    #[error("template holder: no template named '{0}'")]
    NotFound(String),
    #[error("template holder: no template files under {}", .0.display())]
    NoTemplates(PathBuf),
    #[error("template '{template}': {reason}")]
    Parse { template: String, reason: String },
    #[error("template '{template}': field '{field}' not found in data")]
    MissingField { template: String, field: String },
    #[error("template holder: failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("template holder: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("template holder: loading task failed: {0}")]
    Load(#[from] tokio::task::JoinError),
    #[error("template holder: write failed: {0}")]
    Write(#[source] io::Error),
}

impl TemplateError {
    pub fn reason(&self) -> &'static str {
        match self {
            TemplateError::NotLoaded => "not_loaded",
            TemplateError::NotFound(_) => "not_found",
            TemplateError::NoTemplates(_) => "no_templates",
            TemplateError::Parse { .. } => "parse",
            TemplateError::MissingField { .. } => "missing_field",
            TemplateError::Io { .. } | TemplateError::Walk(_) => "io",
            TemplateError::Load(_) => "load",
            TemplateError::Write(_) => "write",
        }
    }
}
