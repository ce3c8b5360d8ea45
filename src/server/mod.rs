pub mod pages;
#[allow(clippy::module_inception)]
pub mod server;
pub mod tokens;
