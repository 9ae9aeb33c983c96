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

use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// A directory or file that the operation requires does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The operation is deliberately unsupported by this driver.
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Directory not empty: {0}")]
    DirectoryNotEmpty(String),

    /// A write would land outside the current length of the file.
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Object store error: {0}")]
    ObjectStoreError(#[from] object_store::Error),

    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),
}

impl StorageError {
    /// Whether this error means the addressed entity is absent, either as
    /// reported by this layer or by the underlying object store.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StorageError::NotFound(_)
                | StorageError::ObjectStoreError(object_store::Error::NotFound { .. })
        )
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
