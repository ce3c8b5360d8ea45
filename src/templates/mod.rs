//! Directory-backed text templates: parsed once on load, rendered on demand.

pub mod error;
pub mod holder;
pub mod template;

pub use error::TemplateError;
pub use holder::TemplateHolder;
pub use template::Template;
