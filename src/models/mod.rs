pub mod document;
pub mod enums;
pub mod filters;
pub mod query;
pub mod user;

pub use document::{Document, DocumentId, DocumentPatch, DuplicateKey};
pub use enums::*;
pub use filters::*;
pub use query::*;
pub use user::User;
