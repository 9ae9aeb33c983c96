// Copyright 2022 Adobe. All rights reserved.
// This file is licensed to you under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License. You may obtain a copy
// of the License at http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software distributed under
// the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR REPRESENTATIONS
// OF ANY KIND, either express or implied. See the License for the specific language
// governing permissions and limitations under the License.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

use super::error::{StorageError, StorageResult};

/// Options that tune the SDK client rather than select an account or share.
pub(crate) const CLIENT_OPTION_KEYS: [&str; 6] = [
    "timeout",
    "connect_timeout",
    "max_retries",
    "retry_timeout",
    "pool_idle_timeout",
    "pool_max_idle_per_host",
];

/// Storage provider type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    /// Local filesystem storage
    Local,
    /// Process-local in-memory storage, mostly useful for tests
    Memory,
    /// AWS S3 storage
    Aws,
    /// Azure storage (blob container or file share)
    Azure,
    /// Google Cloud Storage
    Gcs,
}

impl FromStr for StorageType {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" | "file" => Ok(StorageType::Local),
            "memory" | "inmemory" => Ok(StorageType::Memory),
            "aws" | "s3" => Ok(StorageType::Aws),
            "azure" => Ok(StorageType::Azure),
            "gcs" | "gcp" => Ok(StorageType::Gcs),
            _ => Err(StorageError::ConfigError(format!(
                "Unknown storage type: {}",
                s
            ))),
        }
    }
}

/// Configuration for the remote store behind a file manager.
///
/// Provider-specific options are kept in a flat map and handed to the
/// `object_store` builders as-is.
///
/// # Examples
///
/// ## Azure, from a connection string
/// ```
/// use fileshare_manager::storage::StorageConfig;
///
/// let config = StorageConfig::from_connection_string(
///     "DefaultEndpointsProtocol=https;AccountName=myaccount;AccountKey=a2V5;EndpointSuffix=core.windows.net",
///     "media",
/// )
/// .unwrap();
/// assert_eq!(config.get_option("account_name"), Some(&"myaccount".to_string()));
/// ```
///
/// ## Local filesystem
/// ```
/// use fileshare_manager::storage::StorageConfig;
///
/// let config = StorageConfig::local().with_option("path", "/srv/media");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage provider type
    #[serde(rename = "type")]
    pub storage_type: StorageType,

    /// Provider-specific configuration options
    ///
    /// Azure:
    /// - share / container: File share or container name
    /// - connection_string: Storage account connection string
    /// - account_name: Storage account name
    /// - access_key: Account key
    /// - sas_token: SAS token
    /// - tenant_id / client_id / client_secret: Azure AD credentials
    /// - endpoint: Custom endpoint URL (e.g. Azurite)
    ///
    /// AWS S3:
    /// - bucket, region, access_key_id, secret_access_key, session_token, endpoint, allow_http
    ///
    /// GCS:
    /// - bucket, service_account_key_path, service_account_key
    ///
    /// Local:
    /// - path: Base path
    #[serde(default)]
    pub options: HashMap<String, String>,
}

impl StorageConfig {
    /// Create a new storage configuration with the default client options.
    pub fn new(storage_type: StorageType) -> Self {
        let options = match storage_type {
            StorageType::Local | StorageType::Memory => HashMap::new(),
            _ => Self::default_options(),
        };
        Self {
            storage_type,
            options,
        }
    }

    /// Create a local filesystem storage configuration.
    pub fn local() -> Self {
        Self::new(StorageType::Local)
    }

    /// Create an in-memory storage configuration.
    pub fn memory() -> Self {
        Self::new(StorageType::Memory)
    }

    /// Create an AWS S3 storage configuration.
    pub fn aws() -> Self {
        Self::new(StorageType::Aws)
    }

    /// Create an Azure storage configuration.
    pub fn azure() -> Self {
        Self::new(StorageType::Azure)
    }

    /// Create a GCS storage configuration.
    pub fn gcs() -> Self {
        Self::new(StorageType::Gcs)
    }

    /// Create an Azure configuration from a storage account connection string
    /// and a share (container) name.
    ///
    /// # Arguments
    ///
    /// * `connection_string` - `Key=Value;` pairs as issued by the Azure portal
    /// * `share` - The file share or container holding the managed files
    ///
    /// # Errors
    ///
    /// Returns `StorageError::ConfigError` if the connection string has no
    /// `AccountName`, or `StorageError::UrlParseError` if an endpoint in it is
    /// not a valid URL.
    pub fn from_connection_string(
        connection_string: &str,
        share: impl Into<String>,
    ) -> StorageResult<Self> {
        let parsed = parse_connection_string(connection_string)?;
        Ok(Self::azure()
            .with_options(parsed)
            .with_option("share", share))
    }

    /// Get default SDK client options: timeouts, retries and connection pool.
    pub fn default_options() -> HashMap<String, String> {
        [
            ("timeout", "300"),
            ("connect_timeout", "30"),
            ("max_retries", "5"),
            ("retry_timeout", "300"),
            ("pool_idle_timeout", "15"),
            ("pool_max_idle_per_host", "5"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    /// Add a configuration option.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Add multiple configuration options.
    pub fn with_options(mut self, options: HashMap<String, String>) -> Self {
        self.options.extend(options);
        self
    }

    /// Get a configuration option.
    pub fn get_option(&self, key: &str) -> Option<&String> {
        self.options.get(key)
    }

    /// The share or container name, whichever option is set.
    pub fn share_name(&self) -> Option<&String> {
        self.get_option("share")
            .or_else(|| self.get_option("container"))
    }

    /// Get the storage type as a string.
    pub fn storage_type_str(&self) -> &str {
        match self.storage_type {
            StorageType::Local => "local",
            StorageType::Memory => "memory",
            StorageType::Aws => "aws",
            StorageType::Azure => "azure",
            StorageType::Gcs => "gcs",
        }
    }

    /// Load a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<std::path::Path>) -> StorageResult<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        serde_json::from_str(&raw).map_err(|e| {
            StorageError::ConfigError(format!(
                "Invalid configuration file {}: {}",
                path.as_ref().display(),
                e
            ))
        })
    }
}

/// Translate an Azure connection string into `StorageConfig` option keys.
///
/// Recognized keys are `AccountName`, `AccountKey`, `SharedAccessSignature`,
/// `DefaultEndpointsProtocol`, `EndpointSuffix` and `BlobEndpoint`. When
/// `UseDevelopmentStorage=true` is present the Azurite emulator is targeted.
pub fn parse_connection_string(connection_string: &str) -> StorageResult<HashMap<String, String>> {
    let mut options = HashMap::new();
    let mut protocol = "https".to_string();
    let mut suffix: Option<String> = None;

    for pair in connection_string.split(';').map(str::trim) {
        if pair.is_empty() {
            continue;
        }
        // Values (account keys, signatures) may legitimately contain '='
        let Some((key, value)) = pair.split_once('=') else {
            return Err(StorageError::ConfigError(format!(
                "Malformed connection string segment: {}",
                pair
            )));
        };
        match key.trim() {
            "AccountName" => {
                options.insert("account_name".to_string(), value.to_string());
            }
            "AccountKey" => {
                options.insert("access_key".to_string(), value.to_string());
            }
            "SharedAccessSignature" => {
                options.insert("sas_token".to_string(), value.to_string());
            }
            "DefaultEndpointsProtocol" => protocol = value.to_string(),
            "EndpointSuffix" => suffix = Some(value.to_string()),
            "BlobEndpoint" => {
                url::Url::parse(value)?;
                options.insert("endpoint".to_string(), value.to_string());
            }
            "UseDevelopmentStorage" if value.eq_ignore_ascii_case("true") => {
                options.insert("use_emulator".to_string(), "true".to_string());
                options
                    .entry("account_name".to_string())
                    .or_insert_with(|| "devstoreaccount1".to_string());
            }
            other => {
                tracing::debug!("Ignoring connection string key={}", other);
            }
        }
    }

    let account = options.get("account_name").cloned().ok_or_else(|| {
        StorageError::ConfigError("Connection string requires 'AccountName'".to_string())
    })?;

    if !options.contains_key("endpoint") {
        if let Some(suffix) = suffix {
            let endpoint = format!("{}://{}.blob.{}", protocol, account, suffix);
            url::Url::parse(&endpoint)?;
            if suffix != "core.windows.net" {
                options.insert("endpoint".to_string(), endpoint);
            }
        }
    }

    Ok(options)
}

impl From<StorageConfig> for String {
    fn from(config: StorageConfig) -> Self {
        config.storage_type_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_type_serialization() {
        assert_eq!(
            serde_json::to_string(&StorageType::Local).unwrap(),
            "\"local\""
        );
        assert_eq!(
            serde_json::to_string(&StorageType::Memory).unwrap(),
            "\"memory\""
        );
        assert_eq!(
            serde_json::to_string(&StorageType::Azure).unwrap(),
            "\"azure\""
        );
    }

    #[test]
    fn test_storage_type_from_str() {
        assert_eq!("AZURE".parse::<StorageType>().unwrap(), StorageType::Azure);
        assert_eq!("s3".parse::<StorageType>().unwrap(), StorageType::Aws);
        assert_eq!("gcp".parse::<StorageType>().unwrap(), StorageType::Gcs);
        assert_eq!("memory".parse::<StorageType>().unwrap(), StorageType::Memory);
        assert_eq!("file".parse::<StorageType>().unwrap(), StorageType::Local);
    }

    #[test]
    fn test_storage_type_from_str_invalid() {
        let err = "ftp".parse::<StorageType>().unwrap_err();
        assert!(matches!(err, StorageError::ConfigError(_)));
        assert!(err.to_string().contains("Unknown storage type"));
    }

    #[test]
    fn test_cloud_configs_carry_default_options() {
        let config = StorageConfig::azure();
        assert_eq!(config.get_option("timeout"), Some(&"300".to_string()));
        assert_eq!(config.get_option("max_retries"), Some(&"5".to_string()));
        assert!(StorageConfig::memory().options.is_empty());
        assert!(StorageConfig::local().options.is_empty());
    }

    #[test]
    fn test_with_option_and_override() {
        let config = StorageConfig::azure()
            .with_option("share", "media")
            .with_option("timeout", "60")
            .with_option("timeout", "90");

        assert_eq!(config.share_name(), Some(&"media".to_string()));
        assert_eq!(config.get_option("timeout"), Some(&"90".to_string()));
    }

    #[test]
    fn test_share_name_falls_back_to_container() {
        let config = StorageConfig::azure().with_option("container", "assets");
        assert_eq!(config.share_name(), Some(&"assets".to_string()));
        assert_eq!(StorageConfig::azure().share_name(), None);
    }

    #[test]
    fn test_parse_connection_string() {
        let options = parse_connection_string(
            "DefaultEndpointsProtocol=https;AccountName=acme;AccountKey=c2VjcmV0==;EndpointSuffix=core.windows.net",
        )
        .unwrap();

        assert_eq!(options.get("account_name"), Some(&"acme".to_string()));
        assert_eq!(options.get("access_key"), Some(&"c2VjcmV0==".to_string()));
        // Public cloud suffix needs no explicit endpoint
        assert!(!options.contains_key("endpoint"));
    }

    #[test]
    fn test_parse_connection_string_sovereign_cloud_endpoint() {
        let options = parse_connection_string(
            "DefaultEndpointsProtocol=https;AccountName=acme;AccountKey=a2V5;EndpointSuffix=core.chinacloudapi.cn",
        )
        .unwrap();

        assert_eq!(
            options.get("endpoint"),
            Some(&"https://acme.blob.core.chinacloudapi.cn".to_string())
        );
    }

    #[test]
    fn test_parse_connection_string_explicit_blob_endpoint() {
        let options = parse_connection_string(
            "AccountName=devstoreaccount1;AccountKey=a2V5;BlobEndpoint=http://127.0.0.1:10000/devstoreaccount1;",
        )
        .unwrap();

        assert_eq!(
            options.get("endpoint"),
            Some(&"http://127.0.0.1:10000/devstoreaccount1".to_string())
        );
    }

    #[test]
    fn test_parse_connection_string_development_storage() {
        let options = parse_connection_string("UseDevelopmentStorage=true").unwrap();
        assert_eq!(options.get("use_emulator"), Some(&"true".to_string()));
        assert_eq!(
            options.get("account_name"),
            Some(&"devstoreaccount1".to_string())
        );
    }

    #[test]
    fn test_parse_connection_string_missing_account() {
        let err = parse_connection_string("AccountKey=a2V5").unwrap_err();
        assert!(matches!(err, StorageError::ConfigError(_)));
    }

    #[test]
    fn test_parse_connection_string_malformed_segment() {
        let err = parse_connection_string("AccountName=acme;garbage").unwrap_err();
        assert!(err.to_string().contains("Malformed"));
    }

    #[test]
    fn test_parse_connection_string_bad_endpoint() {
        let err = parse_connection_string("AccountName=acme;BlobEndpoint=not a url").unwrap_err();
        assert!(matches!(err, StorageError::UrlParseError(_)));
    }

    #[test]
    fn test_from_connection_string() {
        let config = StorageConfig::from_connection_string(
            "AccountName=acme;AccountKey=a2V5",
            "media",
        )
        .unwrap();

        assert_eq!(config.storage_type, StorageType::Azure);
        assert_eq!(config.share_name(), Some(&"media".to_string()));
        assert_eq!(config.get_option("access_key"), Some(&"a2V5".to_string()));
        assert_eq!(config.get_option("timeout"), Some(&"300".to_string()));
    }

    #[test]
    fn test_config_deserialization() {
        let json = r#"{"type":"azure","options":{"share":"media","account_name":"acme"}}"#;
        let config: StorageConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.storage_type, StorageType::Azure);
        assert_eq!(config.share_name(), Some(&"media".to_string()));
    }

    #[test]
    fn test_config_deserialization_without_options() {
        let config: StorageConfig = serde_json::from_str(r#"{"type":"memory"}"#).unwrap();
        assert_eq!(config.storage_type, StorageType::Memory);
        assert!(config.options.is_empty());
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("storage.json");
        std::fs::write(&file, r#"{"type":"local","options":{"path":"/srv/media"}}"#).unwrap();

        let config = StorageConfig::from_json_file(&file).unwrap();
        assert_eq!(config.storage_type, StorageType::Local);
        assert_eq!(config.get_option("path"), Some(&"/srv/media".to_string()));
    }

    #[test]
    fn test_from_json_file_invalid() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("storage.json");
        std::fs::write(&file, "{not json").unwrap();

        let err = StorageConfig::from_json_file(&file).unwrap_err();
        assert!(matches!(err, StorageError::ConfigError(_)));
    }

    #[test]
    fn test_from_storage_config_to_string() {
        let azure: String = StorageConfig::azure().into();
        let memory: String = StorageConfig::memory().into();
        assert_eq!(azure, "azure");
        assert_eq!(memory, "memory");
    }
}
