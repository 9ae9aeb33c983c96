// Copyright 2022 Adobe. All rights reserved.
// This file is licensed to you under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License. You may obtain a copy
// of the License at http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software distributed under
// the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR REPRESENTATIONS
// OF ANY KIND, either express or implied. See the License for the specific language
// governing permissions and limitations under the License.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use object_store::path::Path as ObjectPath;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter, Result as FmtResult};

use super::error::StorageResult;

/// One immediate child of a remote directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    /// Last path segment of the child
    pub name: String,

    /// Whether the child is a directory
    pub is_directory: bool,

    /// Content length for files, zero for directories
    pub size: u64,
}

/// Properties of a remote file.
#[derive(Debug, Clone, Default)]
pub struct FileProperties {
    /// Content length in bytes
    pub content_length: u64,

    /// MIME type recorded at creation, if the backend keeps one
    pub content_type: Option<String>,

    /// Last modified timestamp maintained by the store
    pub last_modified: Option<DateTime<Utc>>,

    /// Entity tag
    pub etag: Option<String>,

    /// Custom metadata tags
    pub metadata: HashMap<String, String>,
}

/// A remote hierarchical store of directories and files.
///
/// Every path is a normalized logical path: segments joined by `/`, no
/// leading or trailing slash, the empty string naming the share root.
/// Implementations must not cache existence; each call reflects the remote
/// state at the time it is made.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Get the base URL of the share or container behind this store.
    fn base_path(&self) -> &str;

    /// Validate that the share is reachable with the configured credentials.
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// * Credentials are invalid or expired
    /// * Network connectivity issues occur
    async fn validate_connection(&self) -> StorageResult<()>;

    /// Check whether a directory exists. The root always exists.
    async fn directory_exists(&self, path: &str) -> StorageResult<bool>;

    /// Create a single directory. The parent is expected to exist.
    async fn create_directory(&self, path: &str) -> StorageResult<()>;

    /// Delete an empty directory.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::DirectoryNotEmpty` if the directory still has
    /// children.
    async fn delete_directory(&self, path: &str) -> StorageResult<()>;

    /// List the immediate children of a directory, in store order.
    ///
    /// Names are logical (decoded) names, safe to join back onto `path`.
    async fn list_directory(&self, path: &str) -> StorageResult<Vec<RemoteEntry>>;

    /// Whether a directory has at least one subdirectory.
    async fn has_subdirectories(&self, path: &str) -> StorageResult<bool> {
        let children = self.list_directory(path).await?;
        Ok(children.iter().any(|c| c.is_directory))
    }

    /// Check whether a file exists.
    async fn file_exists(&self, path: &str) -> StorageResult<bool>;

    /// Create (or truncate) a file of `size` zero bytes.
    async fn create_file(
        &self,
        path: &str,
        size: u64,
        content_type: Option<&str>,
    ) -> StorageResult<()>;

    /// Delete a file.
    async fn delete_file(&self, path: &str) -> StorageResult<()>;

    /// Write `data` into an existing file starting at `offset`. The file
    /// never grows.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the file does not exist and
    /// `StorageError::InvalidRange` if the range ends past the file length.
    async fn write_range(&self, path: &str, offset: u64, data: Bytes) -> StorageResult<()>;

    /// Download the full content of a file.
    async fn download(&self, path: &str) -> StorageResult<Bytes>;

    /// Rename a file to `new_path`, overwriting any file already there.
    async fn rename_file(&self, path: &str, new_path: &str) -> StorageResult<()>;

    /// Replace the custom metadata tags of an existing file.
    async fn set_metadata(&self, path: &str, metadata: HashMap<String, String>)
        -> StorageResult<()>;

    /// Get the properties of a file.
    async fn get_properties(&self, path: &str) -> StorageResult<FileProperties>;
}

impl Debug for dyn RemoteStore {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "RemoteStore(base_path={})", self.base_path())
    }
}

/// Helper function to create an ObjectPath from a normalized logical path
pub(crate) fn string_to_path(s: &str) -> ObjectPath {
    ObjectPath::from(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_entry_equality() {
        let dir = RemoteEntry {
            name: "images".to_string(),
            is_directory: true,
            size: 0,
        };
        assert_eq!(dir.clone(), dir);
        assert_ne!(
            dir,
            RemoteEntry {
                name: "images".to_string(),
                is_directory: false,
                size: 0,
            }
        );
    }

    #[test]
    fn test_file_properties_default() {
        let props = FileProperties::default();
        assert_eq!(props.content_length, 0);
        assert!(props.content_type.is_none());
        assert!(props.last_modified.is_none());
        assert!(props.metadata.is_empty());
    }

    #[test]
    fn test_string_to_path() {
        assert_eq!(string_to_path("a/b/c.txt").as_ref(), "a/b/c.txt");
        assert_eq!(string_to_path("").as_ref(), "");
    }
}
