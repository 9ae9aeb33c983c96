// Copyright 2025 Adobe. All rights reserved.
// This file is licensed to you under the Apache License,
// Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
// or the MIT license (http://opensource.org/licenses/MIT),
// at your option.
//
// Unless required by applicable law or agreed to in writing,
// this software is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR REPRESENTATIONS OF ANY KIND, either express or
// implied. See the LICENSE-MIT and LICENSE-APACHE files for the
// specific language governing permissions and limitations under
// each license.

//! # Fileshare Manager
//!
//! A path-addressed virtual filesystem over cloud file and blob storage.
//!
//! Callers address folders and files with slash-delimited logical paths
//! (`"/media/images/logo.png"`). The manager maps them onto a remote share,
//! creating intermediate folders on demand, listing folders with child
//! hints, and copying, renaming and deleting files and whole subtrees.
//!
//! ## Features
//!
//! - **Storage backends**: Azure Storage (connection strings, SAS, service principal), AWS S3, GCS, local filesystem, in-memory
//! - **Folder emulation**: explicit folder markers plus implicit prefixes on flat object stores
//! - **Upload metadata**: upload id, declared size and upload timestamp tags on each file
//!
//! ## Quick Start
//!
//! ### Azure Storage Example
//!
//! ```rust,no_run
//! use bytes::Bytes;
//! use fileshare_manager::{FileManager, FileUploadMetaData, StorageConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let config = StorageConfig::from_connection_string(
//!     "DefaultEndpointsProtocol=https;AccountName=acme;AccountKey=a2V5;EndpointSuffix=core.windows.net",
//!     "media",
//! )?;
//!
//! let manager = FileManager::builder(config).build().await?;
//!
//! let upload = FileUploadMetaData {
//!     upload_id: "u-1".to_string(),
//!     file_name: "logo.png".to_string(),
//!     relative_path: "/images".to_string(),
//!     content_type: Some("image/png".to_string()),
//!     chunk_index: 0,
//!     total_chunks: 1,
//!     total_size: 4,
//! };
//! manager
//!     .upload_with_metadata(Bytes::from_static(b"\x89PNG"), &upload, chrono::Utc::now())
//!     .await?;
//!
//! for entry in manager.list_objects("/images").await? {
//!     println!("{} ({} bytes)", entry.name, entry.size);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### Local Filesystem Example
//!
//! ```rust,no_run
//! use fileshare_manager::{FileManager, StorageConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let config = StorageConfig::local().with_option("path", "./share");
//!
//! let manager = FileManager::builder(config).build().await?;
//! manager.create_folder("/a/b/c").await?;
//! let removed = manager.delete_folder("/a").await?;
//! println!("removed {} entries", removed);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`filemanager`] - Logical paths and the file manager operations
//! - [`storage`] - Remote storage abstraction layer
//! - [`util`] - Timing and timestamp helpers

pub mod filemanager;
pub mod storage;
pub mod util;

// Re-export commonly used types
pub use filemanager::{
    FileManager, FileManagerBuilder, FileManagerEntry, FileMetadata, FileUploadMetaData,
    LogicalPath,
};
pub use storage::{StorageConfig, StorageError, StorageResult, StorageType};
