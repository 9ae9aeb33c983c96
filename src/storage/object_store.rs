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

use super::config::{parse_connection_string, StorageConfig, StorageType, CLIENT_OPTION_KEYS};
use super::error::{StorageError, StorageResult};
use super::provider::{string_to_path, FileProperties, RemoteEntry, RemoteStore};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::StreamExt;
use object_store::path::Path as ObjectPath;
use percent_encoding::percent_decode_str;
use object_store::{
    aws::AmazonS3Builder, azure::MicrosoftAzureBuilder, gcp::GoogleCloudStorageBuilder,
    local::LocalFileSystem, memory::InMemory, Attribute, AttributeValue, Attributes,
    ClientOptions, GetOptions, ObjectStore, PutOptions, PutPayload, RetryConfig,
};
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Name of the zero-length object that records an explicit directory.
pub const DIRECTORY_MARKER: &str = ".folder";

/// Remote hierarchical store emulated on top of any object_store backend.
///
/// Object stores are flat: a directory exists when its marker object exists
/// or when at least one object lives under its prefix.
pub struct ObjectStoreProvider {
    pub config: StorageConfig,
    pub store: Arc<dyn ObjectStore>,
    pub base_path: String,
    supports_attributes: bool,
}

impl ObjectStoreProvider {
    /// Create a new storage provider from configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - Storage configuration specifying the storage type and options
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// * Required configuration options are missing
    /// * The storage backend cannot be created (e.g. malformed credentials)
    pub async fn new(config: StorageConfig) -> StorageResult<Self> {
        let (store, base_path) = Self::build_store(&config)?;
        // LocalFileSystem rejects custom attributes on put
        let supports_attributes = config.storage_type != StorageType::Local;

        Ok(Self {
            config,
            store: Arc::from(store),
            base_path,
            supports_attributes,
        })
    }

    /// Wrap an already constructed object store.
    pub fn from_store(
        store: Arc<dyn ObjectStore>,
        base_path: impl Into<String>,
        supports_attributes: bool,
    ) -> Self {
        Self {
            config: StorageConfig::memory(),
            store,
            base_path: base_path.into(),
            supports_attributes,
        }
    }

    fn build_store(config: &StorageConfig) -> StorageResult<(Box<dyn ObjectStore>, String)> {
        match config.storage_type {
            StorageType::Local => Self::build_local_store(config),
            StorageType::Memory => Ok((Box::new(InMemory::new()), "memory://".to_string())),
            StorageType::Aws => Self::build_aws_store(config),
            StorageType::Azure => Self::build_azure_store(config),
            StorageType::Gcs => Self::build_gcs_store(config),
        }
    }

    /// Build a local filesystem store.
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// * The 'path' option is missing from configuration
    /// * The path cannot be canonicalized (doesn't exist or permission denied)
    /// * The path is not a directory
    fn build_local_store(config: &StorageConfig) -> StorageResult<(Box<dyn ObjectStore>, String)> {
        let path = config.options.get("path").ok_or_else(|| {
            StorageError::ConfigError("Local storage requires 'path' option".to_string())
        })?;
        let base_path = PathBuf::from(path);

        let canonical_path = base_path.canonicalize().map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to resolve path '{}': {} (path must exist)",
                path, e
            ))
        })?;

        if !canonical_path.is_dir() {
            return Err(StorageError::ConfigError(format!(
                "Base path is not a directory: {}",
                canonical_path.display()
            )));
        }

        // Deleting the last object of a directory also removes the directory on disk
        let store = LocalFileSystem::new_with_prefix(&canonical_path)
            .map_err(|e| {
                StorageError::ConfigError(format!("Failed to create local store: {}", e))
            })?
            .with_automatic_cleanup(true);

        let base_path_str = canonical_path.to_string_lossy().to_string();
        Ok((Box::new(store), base_path_str))
    }

    fn build_connection_options(config: &StorageConfig) -> ClientOptions {
        let mut client_options = ClientOptions::default();
        if let Some(timeout_str) = config.options.get("timeout") {
            if timeout_str == "0" || timeout_str == "disabled" {
                client_options = client_options.with_timeout_disabled();
            } else if let Ok(sec) = timeout_str.parse::<u64>() {
                client_options = client_options.with_timeout(Duration::from_secs(sec))
            }
        };
        if let Some(connect_timeout_str) = config.options.get("connect_timeout") {
            if connect_timeout_str == "0" || connect_timeout_str == "disabled" {
                client_options = client_options.with_connect_timeout_disabled();
            } else if let Ok(sec) = connect_timeout_str.parse::<u64>() {
                client_options = client_options.with_connect_timeout(Duration::from_secs(sec))
            }
        }
        if let Some(pool_idle_timeout_str) = config.options.get("pool_idle_timeout") {
            if let Ok(sec) = pool_idle_timeout_str.parse::<u64>() {
                client_options = client_options.with_pool_idle_timeout(Duration::from_secs(sec))
            }
        }
        if let Some(pool_max_idle_per_host_str) = config.options.get("pool_max_idle_per_host") {
            if let Ok(max_idle) = pool_max_idle_per_host_str.parse::<usize>() {
                client_options = client_options.with_pool_max_idle_per_host(max_idle)
            }
        }
        client_options
    }

    /// Retry settings handed to the SDK client. This layer never retries on
    /// its own.
    fn build_retry_options(config: &StorageConfig) -> RetryConfig {
        let default_retry_config = RetryConfig::default();
        let max_retries = config
            .options
            .get("max_retries")
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(default_retry_config.max_retries);
        let retry_timeout = config
            .options
            .get("retry_timeout")
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(default_retry_config.retry_timeout);
        RetryConfig {
            backoff: Default::default(),
            max_retries,
            retry_timeout,
        }
    }

    /// Build an AWS S3 store.
    fn build_aws_store(config: &StorageConfig) -> StorageResult<(Box<dyn ObjectStore>, String)> {
        let mut builder = AmazonS3Builder::new()
            .with_client_options(Self::build_connection_options(config))
            .with_retry(Self::build_retry_options(config));
        let mut bucket: Option<&String> = None;
        let mut endpoint: Option<&String> = None;

        for (key, value) in &config.options {
            match key.as_str() {
                "bucket" => {
                    bucket = Some(value);
                    builder = builder.with_bucket_name(value);
                }
                "region" => builder = builder.with_region(value),
                "access_key_id" => builder = builder.with_access_key_id(value),
                "secret_access_key" => builder = builder.with_secret_access_key(value),
                "session_token" | "token" => builder = builder.with_token(value),
                "endpoint" => {
                    endpoint = Some(value);
                    builder = builder.with_endpoint(value);
                }
                "allow_http" => {
                    if value.to_lowercase() == "true" {
                        builder = builder.with_allow_http(true);
                    }
                }
                k if CLIENT_OPTION_KEYS.contains(&k) => (),
                _ => {
                    tracing::warn!("Unknown AWS S3 option: {}", key);
                }
            }
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(format!("Failed to create S3 store: {}", e)))?;

        let base_url = match (endpoint, bucket) {
            (Some(endpoint_url), _) => endpoint_url.trim_end_matches('/').to_string(),
            (None, Some(bucket_name)) => format!("s3://{}", bucket_name),
            (None, None) => "s3://".to_string(),
        };

        Ok((Box::new(store), base_url))
    }

    /// Build an Azure store for one share (container).
    ///
    /// Discrete options take precedence over values parsed from a
    /// `connection_string` option.
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// * Neither 'share' nor 'container' is set
    /// * No account name is configured or derivable from the connection string
    /// * The Azure store cannot be initialized (e.g. an access key that is not base64)
    fn build_azure_store(config: &StorageConfig) -> StorageResult<(Box<dyn ObjectStore>, String)> {
        let mut options = config.options.clone();
        if let Some(connection_string) = config.get_option("connection_string") {
            for (key, value) in parse_connection_string(connection_string)? {
                options.entry(key).or_insert(value);
            }
        }

        let share = config.share_name().ok_or_else(|| {
            StorageError::ConfigError("Azure requires 'share' or 'container' option".to_string())
        })?;
        let account_name = options.get("account_name").cloned().ok_or_else(|| {
            StorageError::ConfigError(
                "Azure requires 'account_name' or 'connection_string' option".to_string(),
            )
        })?;

        let mut builder = MicrosoftAzureBuilder::new()
            .with_client_options(Self::build_connection_options(config))
            .with_retry(Self::build_retry_options(config))
            .with_account(&account_name)
            .with_container_name(share);

        let mut custom_endpoint: Option<String> = None;

        for (key, value) in &options {
            match key.as_str() {
                "access_key" | "account_key" => builder = builder.with_access_key(value),
                "sas_token" => {
                    let pairs: Vec<(String, String)> = value
                        .trim_start_matches('?')
                        .split('&')
                        .filter_map(|pair| {
                            pair.split_once('=')
                                .map(|(k, v)| (k.to_string(), v.to_string()))
                        })
                        .collect();
                    builder = builder.with_sas_authorization(pairs);
                }
                "tenant_id" => builder = builder.with_tenant_id(value),
                "client_id" => builder = builder.with_client_id(value),
                "client_secret" => builder = builder.with_client_secret(value),
                "use_emulator" => {
                    builder = builder.with_use_emulator(value.eq_ignore_ascii_case("true"))
                }
                "endpoint" => {
                    custom_endpoint = Some(value.clone());
                    builder = builder.with_endpoint(value.clone());
                }
                "share" | "container" | "account_name" | "connection_string" => (),
                k if CLIENT_OPTION_KEYS.contains(&k) => (),
                _ => {
                    tracing::info!("Unknown Azure option: {}", key);
                }
            }
        }

        let store = builder.build().map_err(|e| {
            StorageError::ConfigError(format!("Failed to create Azure store: {}", e))
        })?;

        let base_url = match custom_endpoint {
            Some(endpoint) => format!("{}/{}", endpoint.trim_end_matches('/'), share),
            None => format!("https://{}.blob.core.windows.net/{}", account_name, share),
        };

        Ok((Box::new(store), base_url))
    }

    /// Build a GCS store.
    fn build_gcs_store(config: &StorageConfig) -> StorageResult<(Box<dyn ObjectStore>, String)> {
        let mut builder = GoogleCloudStorageBuilder::new()
            .with_client_options(Self::build_connection_options(config))
            .with_retry(Self::build_retry_options(config));
        let mut bucket: Option<&String> = None;

        for (key, value) in &config.options {
            match key.as_str() {
                "bucket" => {
                    bucket = Some(value);
                    builder = builder.with_bucket_name(value);
                }
                "service_account_key_path" => builder = builder.with_service_account_path(value),
                "service_account_key" => builder = builder.with_service_account_key(value),
                k if CLIENT_OPTION_KEYS.contains(&k) => (),
                _ => {
                    tracing::warn!("Unknown GCS option: {}", key);
                }
            }
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(format!("Failed to create GCS store: {}", e)))?;

        let base_url = match bucket {
            Some(bucket_name) => format!("gs://{}", bucket_name),
            None => "gs://".to_string(),
        };

        Ok((Box::new(store), base_url))
    }

    fn marker_path(path: &str) -> ObjectPath {
        if path.is_empty() {
            string_to_path(DIRECTORY_MARKER)
        } else {
            string_to_path(&format!("{}/{}", path, DIRECTORY_MARKER))
        }
    }

    fn prefix(path: &str) -> Option<ObjectPath> {
        if path.is_empty() {
            None
        } else {
            Some(string_to_path(path))
        }
    }

    fn not_found(path: &str, err: object_store::Error) -> StorageError {
        match err {
            object_store::Error::NotFound { .. } => StorageError::NotFound(path.to_string()),
            other => other.into(),
        }
    }

    async fn put_object(
        &self,
        path: &str,
        payload: Bytes,
        attributes: Attributes,
    ) -> StorageResult<()> {
        let attributes = if self.supports_attributes {
            attributes
        } else {
            if !attributes.is_empty() {
                debug!(
                    "Dropping count={} attributes for path={}, backend={} cannot store them",
                    attributes.len(),
                    path,
                    self.config.storage_type_str()
                );
            }
            Attributes::new()
        };
        let opts = PutOptions {
            attributes,
            ..Default::default()
        };
        self.store
            .put_opts(&string_to_path(path), PutPayload::from(payload), opts)
            .await?;
        Ok(())
    }

    async fn read_object(&self, path: &str) -> StorageResult<(Bytes, Attributes)> {
        let result = self
            .store
            .get(&string_to_path(path))
            .await
            .map_err(|e| Self::not_found(path, e))?;
        let attributes = result.attributes.clone();
        let bytes = result.bytes().await?;
        Ok((bytes, attributes))
    }
}

#[async_trait]
impl RemoteStore for ObjectStoreProvider {
    fn base_path(&self) -> &str {
        &self.base_path
    }

    async fn validate_connection(&self) -> StorageResult<()> {
        self.store.list_with_delimiter(None).await.map_err(|e| {
            StorageError::ConnectionError(format!(
                "Share is not accessible at {}: {}",
                self.base_path, e
            ))
        })?;
        Ok(())
    }

    async fn directory_exists(&self, path: &str) -> StorageResult<bool> {
        if path.is_empty() {
            return Ok(true);
        }

        match self.store.head(&Self::marker_path(path)).await {
            Ok(_) => return Ok(true),
            Err(object_store::Error::NotFound { .. }) => (),
            Err(e) => return Err(e.into()),
        }

        // Implicit directory: some object lives below the prefix
        let prefix = string_to_path(path);
        let mut stream = self.store.list(Some(&prefix));
        while let Some(meta) = stream.next().await {
            if meta?.location != prefix {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn create_directory(&self, path: &str) -> StorageResult<()> {
        if path.is_empty() {
            return Ok(());
        }
        let marker = Self::marker_path(path);
        self.store.put(&marker, PutPayload::new()).await?;
        debug!("Created directory path={}", path);
        Ok(())
    }

    async fn delete_directory(&self, path: &str) -> StorageResult<()> {
        if path.is_empty() {
            return Err(StorageError::InvalidPath(
                "The share root cannot be deleted".to_string(),
            ));
        }
        if !self.list_directory(path).await?.is_empty() {
            return Err(StorageError::DirectoryNotEmpty(path.to_string()));
        }
        match self.store.delete(&Self::marker_path(path)).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => {
                debug!("Deleted directory path={}", path);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list_directory(&self, path: &str) -> StorageResult<Vec<RemoteEntry>> {
        let prefix = Self::prefix(path);
        let list_result = self.store.list_with_delimiter(prefix.as_ref()).await?;

        let mut entries = Vec::new();
        for dir in &list_result.common_prefixes {
            if let Some(name) = dir.filename() {
                entries.push(RemoteEntry {
                    name: decode_name(name)?,
                    is_directory: true,
                    size: 0,
                });
            }
        }
        for meta in &list_result.objects {
            match meta.location.filename() {
                Some(name) if name != DIRECTORY_MARKER => entries.push(RemoteEntry {
                    name: decode_name(name)?,
                    is_directory: false,
                    size: meta.size,
                }),
                _ => (),
            }
        }

        debug!("Listed directory path={}, count={}", path, entries.len());
        Ok(entries)
    }

    async fn has_subdirectories(&self, path: &str) -> StorageResult<bool> {
        let prefix = Self::prefix(path);
        let list_result = self.store.list_with_delimiter(prefix.as_ref()).await?;
        Ok(!list_result.common_prefixes.is_empty())
    }

    async fn file_exists(&self, path: &str) -> StorageResult<bool> {
        if path.is_empty() {
            return Ok(false);
        }
        match self.store.head(&string_to_path(path)).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn create_file(
        &self,
        path: &str,
        size: u64,
        content_type: Option<&str>,
    ) -> StorageResult<()> {
        let len = usize::try_from(size).map_err(|_| {
            StorageError::InvalidPath(format!("File size {} is too large for {}", size, path))
        })?;
        let mut attributes = Attributes::new();
        if let Some(content_type) = content_type {
            attributes.insert(
                Attribute::ContentType,
                AttributeValue::from(content_type.to_string()),
            );
        }
        self.put_object(path, Bytes::from(vec![0u8; len]), attributes)
            .await?;
        debug!("Created file path={}, size={}", path, size);
        Ok(())
    }

    async fn delete_file(&self, path: &str) -> StorageResult<()> {
        self.store
            .delete(&string_to_path(path))
            .await
            .map_err(|e| Self::not_found(path, e))
    }

    async fn write_range(&self, path: &str, offset: u64, data: Bytes) -> StorageResult<()> {
        let (existing, attributes) = self.read_object(path).await?;
        let start = usize::try_from(offset).map_err(|_| {
            StorageError::InvalidPath(format!("Offset {} is out of range for {}", offset, path))
        })?;
        let end = start
            .checked_add(data.len())
            .filter(|end| *end <= existing.len())
            .ok_or_else(|| {
                StorageError::InvalidRange(format!(
                    "offset={} len={} is past the end of {} (size={})",
                    offset,
                    data.len(),
                    path,
                    existing.len()
                ))
            })?;

        let mut buffer = existing.to_vec();
        buffer[start..end].copy_from_slice(&data);

        self.put_object(path, Bytes::from(buffer), attributes).await?;
        debug!("Wrote range path={}, offset={}, len={}", path, offset, data.len());
        Ok(())
    }

    async fn download(&self, path: &str) -> StorageResult<Bytes> {
        let (bytes, _) = self.read_object(path).await?;
        Ok(bytes)
    }

    async fn rename_file(&self, path: &str, new_path: &str) -> StorageResult<()> {
        self.store
            .rename(&string_to_path(path), &string_to_path(new_path))
            .await
            .map_err(|e| Self::not_found(path, e))
    }

    async fn set_metadata(
        &self,
        path: &str,
        metadata: HashMap<String, String>,
    ) -> StorageResult<()> {
        let (bytes, existing) = self.read_object(path).await?;

        let mut attributes: Attributes = existing
            .iter()
            .filter(|(key, _)| !matches!(key, Attribute::Metadata(_)))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        for (key, value) in metadata {
            attributes.insert(Attribute::Metadata(key.into()), AttributeValue::from(value));
        }

        self.put_object(path, bytes, attributes).await
    }

    async fn get_properties(&self, path: &str) -> StorageResult<FileProperties> {
        let opts = GetOptions {
            head: true,
            ..Default::default()
        };
        let result = self
            .store
            .get_opts(&string_to_path(path), opts)
            .await
            .map_err(|e| Self::not_found(path, e))?;

        let mut content_type = None;
        let mut metadata = HashMap::new();
        for (key, value) in result.attributes.iter() {
            match key {
                Attribute::ContentType => content_type = Some(value.to_string()),
                Attribute::Metadata(name) => {
                    metadata.insert(name.to_string(), value.to_string());
                }
                _ => (),
            }
        }

        Ok(FileProperties {
            content_length: result.meta.size,
            content_type,
            last_modified: Some(result.meta.last_modified),
            etag: result.meta.e_tag.clone(),
            metadata,
        })
    }
}

/// Object store path parts are percent-encoded; listings hand back the
/// logical name so it can be joined and re-encoded by `string_to_path`.
fn decode_name(part: &str) -> StorageResult<String> {
    percent_decode_str(part)
        .decode_utf8()
        .map(|name| name.into_owned())
        .map_err(|e| StorageError::InvalidPath(format!("Undecodable name {}: {}", part, e)))
}

impl Debug for ObjectStoreProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "RemoteStore(type=object_store, cloud_provider={}, base_path={})",
            self.config.storage_type_str(),
            self.base_path
        )
    }
}
