use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::path::LogicalPath;
use super::types::{
    resolve_timestamp, FileManagerEntry, FileMetadata, FileUploadMetaData, TOTAL_SIZE_KEY,
    UPLOAD_ID_KEY, UPLOAD_TIMESTAMP_KEY,
};
use crate::storage::{
    FileProperties, RemoteStore, StorageConfig, StorageError, StorageProviderFactory,
    StorageResult,
};
use crate::util::util::{measure_dur_async, to_ticks};

/// Builder for constructing a `FileManager` instance.
///
/// # Examples
///
/// ```no_run
/// use fileshare_manager::{FileManager, StorageConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
/// let config = StorageConfig::from_connection_string(
///     "DefaultEndpointsProtocol=https;AccountName=acme;AccountKey=a2V5;EndpointSuffix=core.windows.net",
///     "media",
/// )?;
///
/// let manager = FileManager::builder(config)
///     .with_connection_validation(true)
///     .build()
///     .await?;
/// manager.create_folder("/images/2025").await?;
/// # Ok(())
/// # }
/// ```
pub struct FileManagerBuilder {
    config: StorageConfig,
    validate_connection: bool,
}

impl FileManagerBuilder {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            validate_connection: false,
        }
    }

    /// Check the share once while building, so bad credentials surface
    /// before the first operation.
    pub fn with_connection_validation(mut self, validate: bool) -> Self {
        self.validate_connection = validate;
        self
    }

    /// Builds the `FileManager` instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote store cannot be initialized, or if
    /// connection validation was requested and the share is not reachable.
    pub async fn build(self) -> StorageResult<FileManager> {
        let store = StorageProviderFactory::from_config(self.config).await?;
        if self.validate_connection {
            store.validate_connection().await?;
            info!("Validated connection to base_path={}", store.base_path());
        }
        Ok(FileManager::new(store))
    }
}

/// File manager over a remote hierarchical store.
///
/// Paths are slash-delimited logical paths; leading and trailing slashes are
/// ignored and the empty path is the share root. Operations are independent:
/// each one re-queries the store for every directory and file it touches.
/// Recursive operations walk one subtree at a time and stop at the first
/// failure, leaving already processed entries changed.
#[derive(Clone)]
pub struct FileManager {
    store: Arc<dyn RemoteStore>,
}

fn describe_count(count: &usize) -> String {
    format!("count={}", count)
}

fn describe_paths(paths: &Vec<String>) -> String {
    format!("count={}", paths.len())
}

impl FileManager {
    pub fn builder(config: StorageConfig) -> FileManagerBuilder {
        FileManagerBuilder::new(config)
    }

    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn RemoteStore> {
        &self.store
    }

    /// Whether a folder exists. The root always does.
    pub async fn folder_exists(&self, path: &str) -> StorageResult<bool> {
        self.store
            .directory_exists(LogicalPath::new(path).as_str())
            .await
    }

    /// Create a folder together with every missing ancestor.
    ///
    /// Existing folders are left untouched, so the call is idempotent. The
    /// root always exists and creating it is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidPath` if the path or one of its
    /// ancestors already names a file.
    pub async fn create_folder(&self, path: &str) -> StorageResult<()> {
        self.ensure_folder(&LogicalPath::new(path)).await
    }

    async fn ensure_folder(&self, path: &LogicalPath) -> StorageResult<()> {
        if path.is_root() {
            debug!("Folder path={} is the root, nothing to create", path);
            return Ok(());
        }
        for ancestor in path.ancestors() {
            if !self.store.directory_exists(ancestor.as_str()).await? {
                if self.store.file_exists(ancestor.as_str()).await? {
                    return Err(StorageError::InvalidPath(format!(
                        "{} is a file, not a folder",
                        ancestor
                    )));
                }
                self.store.create_directory(ancestor.as_str()).await?;
                info!("Created folder path={}", ancestor);
            }
        }
        Ok(())
    }

    /// Delete a folder and everything beneath it, depth-first.
    ///
    /// Returns the number of removed entries (files and folders, including
    /// the folder itself). A missing folder yields 0.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidPath` for the root. A failure part way
    /// through leaves the already deleted entries deleted.
    pub async fn delete_folder(&self, path: &str) -> StorageResult<usize> {
        let root = LogicalPath::new(path);
        if root.is_root() {
            return Err(StorageError::InvalidPath(
                "The share root cannot be deleted".to_string(),
            ));
        }
        let metric = format!("delete_folder path={}", root);
        measure_dur_async(&metric, || self.delete_tree(&root), Some(describe_count)).await
    }

    async fn delete_tree(&self, root: &LogicalPath) -> StorageResult<usize> {
        if !self.store.directory_exists(root.as_str()).await? {
            debug!("Folder path={} does not exist, nothing to delete", root);
            return Ok(0);
        }

        let mut removed = 0;
        // (folder, children already removed)
        let mut stack = vec![(root.clone(), false)];
        while let Some((dir, emptied)) = stack.pop() {
            if emptied {
                self.store.delete_directory(dir.as_str()).await?;
                removed += 1;
                continue;
            }
            stack.push((dir.clone(), true));
            for entry in self.store.list_directory(dir.as_str()).await? {
                let child = dir.join(&entry.name);
                if entry.is_directory {
                    stack.push((child, false));
                } else {
                    self.store.delete_file(child.as_str()).await?;
                    removed += 1;
                }
            }
        }

        info!("Deleted folder path={}, removed count={}", root, removed);
        Ok(removed)
    }

    /// List the immediate children of a folder, sorted by name.
    ///
    /// A missing folder lists as empty. Files that disappear between the
    /// listing and the property fetch are skipped.
    pub async fn list_objects(&self, path: &str) -> StorageResult<Vec<FileManagerEntry>> {
        let dir = LogicalPath::new(path);
        if !self.store.directory_exists(dir.as_str()).await? {
            debug!("Folder path={} does not exist, listing as empty", dir);
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for child in self.store.list_directory(dir.as_str()).await? {
            let child_path = dir.join(&child.name);
            if child.is_directory {
                let has_children = self.has_child_directories(&child_path).await?;
                entries.push(FileManagerEntry::directory(&dir, &child.name, has_children));
                continue;
            }

            match self.store.get_properties(child_path.as_str()).await {
                Ok(props) => entries.push(FileManagerEntry::file(
                    &dir,
                    &child.name,
                    props.content_length,
                    resolve_timestamp(&props),
                )),
                Err(e) if e.is_not_found() => {
                    warn!("File path={} vanished while listing, skipping", child_path);
                }
                Err(e) => return Err(e),
            }
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        debug!("Listed folder path={}, count={}", dir, entries.len());
        Ok(entries)
    }

    async fn has_child_directories(&self, dir: &LogicalPath) -> StorageResult<bool> {
        self.store.has_subdirectories(dir.as_str()).await
    }

    /// Every file below a folder as full logical paths, depth-first with
    /// subfolders explored before the files of their parent.
    pub async fn list_all_paths(&self, path: &str) -> StorageResult<Vec<String>> {
        let root = LogicalPath::new(path);
        let metric = format!("list_all_paths path={}", root);
        measure_dur_async(&metric, || self.walk_files(&root), Some(describe_paths)).await
    }

    async fn walk_files(&self, root: &LogicalPath) -> StorageResult<Vec<String>> {
        enum Step {
            Visit(LogicalPath),
            Emit(Vec<String>),
        }

        let mut paths = Vec::new();
        if !self.store.directory_exists(root.as_str()).await? {
            return Ok(paths);
        }

        let mut stack = vec![Step::Visit(root.clone())];
        while let Some(step) = stack.pop() {
            match step {
                Step::Emit(files) => paths.extend(files),
                Step::Visit(dir) => {
                    let (dirs, files): (Vec<_>, Vec<_>) = self
                        .store
                        .list_directory(dir.as_str())
                        .await?
                        .into_iter()
                        .partition(|entry| entry.is_directory);

                    stack.push(Step::Emit(
                        files
                            .iter()
                            .map(|f| dir.join(&f.name).as_str().to_string())
                            .collect(),
                    ));
                    // Reversed so the first subfolder is popped first
                    for sub in dirs.iter().rev() {
                        stack.push(Step::Visit(dir.join(&sub.name)));
                    }
                }
            }
        }
        Ok(paths)
    }

    /// Properties of a file, or `None` when its folder or the file is absent.
    pub async fn get_file(&self, path: &str) -> StorageResult<Option<FileProperties>> {
        let file = LogicalPath::new(path);
        if file.is_root() {
            return Ok(None);
        }
        if !self.store.directory_exists(file.parent().as_str()).await? {
            return Ok(None);
        }
        if !self.store.file_exists(file.as_str()).await? {
            return Ok(None);
        }
        match self.store.get_properties(file.as_str()).await {
            Ok(props) => Ok(Some(props)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Resolved metadata of a file, or `None` when it is absent.
    pub async fn get_file_metadata(&self, path: &str) -> StorageResult<Option<FileMetadata>> {
        let file = LogicalPath::new(path);
        Ok(self
            .get_file(path)
            .await?
            .map(|props| FileMetadata::from_properties(&file, &props)))
    }

    /// Download the full content of a file.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` when the folder or the file is absent.
    pub async fn read_file(&self, path: &str) -> StorageResult<Bytes> {
        let file = self.require_file(path).await?;
        self.store.download(file.as_str()).await
    }

    async fn require_file(&self, path: &str) -> StorageResult<LogicalPath> {
        let file = LogicalPath::new(path);
        if file.is_root() || !self.store.directory_exists(file.parent().as_str()).await? {
            return Err(StorageError::NotFound(format!("folder {}", file.parent())));
        }
        if !self.store.file_exists(file.as_str()).await? {
            return Err(StorageError::NotFound(file.to_string()));
        }
        Ok(file)
    }

    /// Write an upload as one complete payload.
    ///
    /// Creates the destination folder chain, then the file sized to the
    /// declared total size when it does not exist yet, then writes `data`
    /// from offset 0. Returns the logical path written to.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidRange` if `data` is longer than the
    /// declared total size (the file is never grown past it), and
    /// `StorageError::InvalidPath` if the target or an ancestor conflicts
    /// with an existing folder or file.
    pub async fn upload_or_append(
        &self,
        data: Bytes,
        meta: &FileUploadMetaData,
    ) -> StorageResult<LogicalPath> {
        let target = self.prepare_upload(meta, data.len()).await?;
        self.write_payload(&target, data).await?;
        Ok(target)
    }

    /// Like [`upload_or_append`](Self::upload_or_append), but first tags the
    /// file with the upload id, the declared total size and `uploaded_at`
    /// as a tick count.
    pub async fn upload_with_metadata(
        &self,
        data: Bytes,
        meta: &FileUploadMetaData,
        uploaded_at: DateTime<Utc>,
    ) -> StorageResult<LogicalPath> {
        let ticks = to_ticks(uploaded_at).ok_or_else(|| {
            StorageError::InvalidPath(format!(
                "Upload timestamp {} cannot be stored as ticks",
                uploaded_at
            ))
        })?;
        let target = self.prepare_upload(meta, data.len()).await?;

        let tags = HashMap::from([
            (UPLOAD_ID_KEY.to_string(), meta.upload_id.clone()),
            (TOTAL_SIZE_KEY.to_string(), meta.total_size.to_string()),
            (UPLOAD_TIMESTAMP_KEY.to_string(), ticks.to_string()),
        ]);
        self.store.set_metadata(target.as_str(), tags).await?;

        self.write_payload(&target, data).await?;
        Ok(target)
    }

    async fn prepare_upload(
        &self,
        meta: &FileUploadMetaData,
        payload_len: usize,
    ) -> StorageResult<LogicalPath> {
        let target = meta.target_path()?;
        if payload_len as u64 > meta.total_size {
            return Err(StorageError::InvalidRange(format!(
                "Payload of {} bytes exceeds declared total_size={} for {}",
                payload_len, meta.total_size, target
            )));
        }
        if meta.total_chunks > 1 {
            debug!(
                "Upload id={} declares chunk {}/{}, writing it as a complete file",
                meta.upload_id,
                meta.chunk_index + 1,
                meta.total_chunks
            );
        }

        self.ensure_not_folder(&target).await?;
        self.ensure_folder(&target.parent()).await?;
        if !self.store.file_exists(target.as_str()).await? {
            self.store
                .create_file(target.as_str(), meta.total_size, meta.content_type.as_deref())
                .await?;
        }
        Ok(target)
    }

    async fn ensure_not_folder(&self, file: &LogicalPath) -> StorageResult<()> {
        if self.store.directory_exists(file.as_str()).await? {
            return Err(StorageError::InvalidPath(format!(
                "{} is a folder, not a file",
                file
            )));
        }
        Ok(())
    }

    async fn write_payload(&self, target: &LogicalPath, data: Bytes) -> StorageResult<()> {
        let len = data.len();
        self.store.write_range(target.as_str(), 0, data).await?;
        info!("Uploaded file path={}, bytes={}", target, len);
        Ok(())
    }

    /// Copy a file, replacing any file at the destination.
    ///
    /// Not atomic: the destination is recreated empty before the content
    /// is written.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` when the source folder or file is
    /// absent.
    pub async fn copy_file(&self, source: &str, destination: &str) -> StorageResult<()> {
        let src = self.require_file(source).await?;
        let dst = LogicalPath::new(destination);
        if dst.is_root() {
            return Err(StorageError::InvalidPath(
                "Copy destination must name a file".to_string(),
            ));
        }
        if src == dst {
            debug!("Copy source and destination are both path={}", src);
            return Ok(());
        }

        self.ensure_not_folder(&dst).await?;
        let props = self.store.get_properties(src.as_str()).await?;
        self.ensure_folder(&dst.parent()).await?;
        if self.store.file_exists(dst.as_str()).await? {
            self.store.delete_file(dst.as_str()).await?;
        }
        self.store
            .create_file(
                dst.as_str(),
                props.content_length,
                props.content_type.as_deref(),
            )
            .await?;

        let content = self.store.download(src.as_str()).await?;
        self.store.write_range(dst.as_str(), 0, content).await?;
        info!("Copied file from={} to={}", src, dst);
        Ok(())
    }

    /// Rename a file within its current folder.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidPath` if `new_name` is empty or contains
    /// a slash, and `StorageError::NotFound` if the file is absent.
    pub async fn rename(&self, path: &str, new_name: &str) -> StorageResult<()> {
        let new_name = new_name.trim();
        if new_name.is_empty() || new_name.contains('/') {
            return Err(StorageError::InvalidPath(format!(
                "Invalid file name: {:?}",
                new_name
            )));
        }
        let file = self.require_file(path).await?;
        let renamed = file.parent().join(new_name);
        if renamed == file {
            return Ok(());
        }
        self.ensure_not_folder(&renamed).await?;
        self.store
            .rename_file(file.as_str(), renamed.as_str())
            .await?;
        info!("Renamed file from={} to={}", file, renamed);
        Ok(())
    }

    /// Move a file to another path, across folders if needed.
    pub async fn move_file(&self, source: &str, destination: &str) -> StorageResult<()> {
        let src = LogicalPath::new(source);
        let dst = LogicalPath::new(destination);
        if src.parent() == dst.parent() && !dst.is_root() {
            return self.rename(source, dst.name()).await;
        }
        self.copy_file(source, destination).await?;
        self.store.delete_file(src.as_str()).await?;
        info!("Moved file from={} to={}", src, dst);
        Ok(())
    }

    /// Whether a file exists; an absent folder simply yields `false`.
    pub async fn blob_exists(&self, path: &str) -> StorageResult<bool> {
        let file = LogicalPath::new(path);
        if file.is_root() || !self.store.directory_exists(file.parent().as_str()).await? {
            return Ok(false);
        }
        self.store.file_exists(file.as_str()).await
    }

    /// Delete a file if present. Returns whether a file was deleted.
    pub async fn delete_if_exists(&self, path: &str) -> StorageResult<bool> {
        if !self.blob_exists(path).await? {
            return Ok(false);
        }
        let file = LogicalPath::new(path);
        match self.store.delete_file(file.as_str()).await {
            Ok(()) => {
                info!("Deleted file path={}", file);
                Ok(true)
            }
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Inventory retrieval is not offered by this driver.
    pub async fn get_inventory(&self) -> StorageResult<Vec<FileMetadata>> {
        Err(StorageError::NotImplemented(
            "inventory retrieval is not supported by this storage driver".to_string(),
        ))
    }
}
