pub mod error;
pub mod resolve;

pub use error::SandboxError;
pub use resolve::{resolve, resolve_absolute, visible_path};
