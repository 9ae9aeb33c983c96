//! Path-addressed file manager
//!
//! Maps a slash-delimited logical namespace of folders and files onto a
//! [`RemoteStore`](crate::storage::RemoteStore): folder lifecycle, listings,
//! uploads with metadata tags, copy, rename and delete.
//!
//! Every call re-checks remote existence; nothing is cached between calls.

pub mod manager;
pub mod path;
pub mod types;

pub use manager::{FileManager, FileManagerBuilder};
pub use path::LogicalPath;
pub use types::{FileManagerEntry, FileMetadata, FileUploadMetaData};
