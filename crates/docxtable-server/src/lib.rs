//! Table tool operations over cached word-processing documents.

pub mod codec;
pub mod config;
pub mod error;
pub mod store;
pub mod tools;

pub use codec::{CodecError, DocumentCodec, JsonCodec};
pub use config::Config;
pub use error::{ResponseStatus, ToolError, ToolOutput, ToolResponse};
pub use store::{DocumentHandle, DocumentStore, LoadedDocument, Resolution};
pub use tools::TableTools;
