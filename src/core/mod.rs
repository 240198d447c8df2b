// Public modules
pub mod error;
pub mod guid;
pub mod project;
pub mod rewrite;
pub mod script;
pub mod serialized;
pub mod session;
pub mod store;

// Internal modules - not part of public API
pub(crate) mod local_files;
pub(crate) mod paths;
pub(crate) mod slugify;

// Re-export common types for convenience
pub use error::{Error, ErrorCode, Result};
pub use guid::ScriptGuid;
pub use script::{ScriptCategory, ScriptIdentifier};
