use std::sync::Arc;

use super::config::StorageConfig;
use super::error::StorageResult;
use super::object_store::ObjectStoreProvider;
use super::provider::RemoteStore;

/// Factory for creating remote stores
pub struct StorageProviderFactory;

impl StorageProviderFactory {
    /// Create a remote store from a configuration.
    ///
    /// Every storage type is served by the object_store backed provider,
    /// which emulates directories on top of the flat key space.
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// * Required configuration options are missing
    /// * The storage backend cannot be initialized
    pub async fn from_config(config: StorageConfig) -> StorageResult<Arc<dyn RemoteStore>> {
        let provider = ObjectStoreProvider::new(config).await?;
        Ok(Arc::new(provider))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_from_config_memory() {
        let store = StorageProviderFactory::from_config(StorageConfig::memory())
            .await
            .unwrap();
        assert_eq!(store.base_path(), "memory://");
        assert!(format!("{:?}", store).contains("RemoteStore"));
    }

    #[tokio::test]
    async fn test_from_config_invalid() {
        let result = StorageProviderFactory::from_config(StorageConfig::azure()).await;
        assert!(result.is_err());
    }
}
