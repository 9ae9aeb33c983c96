use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

use super::path::LogicalPath;
use crate::storage::{FileProperties, StorageError, StorageResult};
use crate::util::util::from_ticks;

/// Metadata tag holding the upload identifier.
pub const UPLOAD_ID_KEY: &str = "upload_id";
/// Metadata tag holding the declared total size in bytes.
pub const TOTAL_SIZE_KEY: &str = "total_size";
/// Metadata tag holding the application upload time as a tick count.
pub const UPLOAD_TIMESTAMP_KEY: &str = "upload_timestamp";

/// Description of an incoming upload.
///
/// `chunk_index` and `total_chunks` are carried for callers that track
/// chunked transfers, but every upload is written as one complete payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FileUploadMetaData {
    pub upload_id: String,
    pub file_name: String,
    /// Destination folder of the file
    pub relative_path: String,
    pub content_type: Option<String>,
    #[serde(default)]
    pub chunk_index: u32,
    #[serde(default)]
    pub total_chunks: u32,
    pub total_size: u64,
}

impl FileUploadMetaData {
    /// The full logical path the upload is written to.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidPath` if the file name is empty or
    /// contains a slash.
    pub fn target_path(&self) -> StorageResult<LogicalPath> {
        let name = self.file_name.trim();
        if name.is_empty() || name.contains('/') {
            return Err(StorageError::InvalidPath(format!(
                "Invalid upload file name: {:?}",
                self.file_name
            )));
        }
        Ok(LogicalPath::new(&self.relative_path).join(name))
    }
}

/// One row of a folder listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileManagerEntry {
    pub name: String,
    /// Parent folder of the entry
    pub path: String,
    pub is_directory: bool,
    pub has_child_directories: bool,
    pub size: u64,
    pub created: Option<DateTime<Local>>,
    pub created_utc: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Local>>,
    pub updated_utc: Option<DateTime<Utc>>,
}

impl FileManagerEntry {
    pub fn directory(parent: &LogicalPath, name: &str, has_child_directories: bool) -> Self {
        Self {
            name: name.to_string(),
            path: parent.to_string(),
            is_directory: true,
            has_child_directories,
            size: 0,
            created: None,
            created_utc: None,
            updated: None,
            updated_utc: None,
        }
    }

    /// The store keeps no creation time, so both timestamp pairs carry the
    /// resolved modification time.
    pub fn file(parent: &LogicalPath, name: &str, size: u64, timestamp: Option<DateTime<Utc>>) -> Self {
        let local = timestamp.map(|ts| ts.with_timezone(&Local));
        Self {
            name: name.to_string(),
            path: parent.to_string(),
            is_directory: false,
            has_child_directories: false,
            size,
            created: local,
            created_utc: timestamp,
            updated: local,
            updated_utc: timestamp,
        }
    }
}

/// Resolved attributes of a single file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub name: String,
    /// Full logical path of the file
    pub path: String,
    pub size: u64,
    pub content_type: Option<String>,
    pub etag: Option<String>,
    pub upload_id: Option<String>,
    /// Upload timestamp tag when present, otherwise the store's last-modified
    pub last_modified: Option<DateTime<Utc>>,
}

impl FileMetadata {
    pub fn from_properties(path: &LogicalPath, props: &FileProperties) -> Self {
        Self {
            name: path.name().to_string(),
            path: path.to_string(),
            size: props.content_length,
            content_type: props.content_type.clone(),
            etag: props.etag.clone(),
            upload_id: props.metadata.get(UPLOAD_ID_KEY).cloned(),
            last_modified: resolve_timestamp(props),
        }
    }
}

/// Pick the display timestamp of a file: the upload timestamp tag if it is
/// present and parses, otherwise the store's native last-modified.
pub fn resolve_timestamp(props: &FileProperties) -> Option<DateTime<Utc>> {
    props
        .metadata
        .get(UPLOAD_TIMESTAMP_KEY)
        .and_then(|raw| raw.trim().parse::<i64>().ok())
        .and_then(from_ticks)
        .or(props.last_modified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::util::to_ticks;
    use chrono::TimeZone;
    use std::collections::HashMap;

    fn props_with(metadata: HashMap<String, String>) -> FileProperties {
        FileProperties {
            content_length: 10,
            content_type: Some("image/png".to_string()),
            last_modified: Some(Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap()),
            etag: Some("\"0x1\"".to_string()),
            metadata,
        }
    }

    #[test]
    fn test_target_path() {
        let meta = FileUploadMetaData {
            file_name: "logo.png".to_string(),
            relative_path: "/media/images/".to_string(),
            ..Default::default()
        };
        assert_eq!(meta.target_path().unwrap().as_str(), "media/images/logo.png");
    }

    #[test]
    fn test_target_path_at_root() {
        let meta = FileUploadMetaData {
            file_name: "logo.png".to_string(),
            ..Default::default()
        };
        assert_eq!(meta.target_path().unwrap().as_str(), "logo.png");
    }

    #[test]
    fn test_target_path_rejects_bad_names() {
        for name in ["", "  ", "a/b.png"] {
            let meta = FileUploadMetaData {
                file_name: name.to_string(),
                ..Default::default()
            };
            assert!(matches!(
                meta.target_path(),
                Err(StorageError::InvalidPath(_))
            ));
        }
    }

    #[test]
    fn test_upload_metadata_deserialization() {
        let json = r#"{
            "uploadId": "u-42",
            "fileName": "report.pdf",
            "relativePath": "docs",
            "contentType": "application/pdf",
            "chunkIndex": 0,
            "totalChunks": 1,
            "totalSize": 2048
        }"#;
        let meta: FileUploadMetaData = serde_json::from_str(json).unwrap();
        assert_eq!(meta.upload_id, "u-42");
        assert_eq!(meta.total_size, 2048);
        assert_eq!(meta.content_type.as_deref(), Some("application/pdf"));
    }

    #[test]
    fn test_resolve_timestamp_prefers_tag() {
        let uploaded = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let props = props_with(HashMap::from([(
            UPLOAD_TIMESTAMP_KEY.to_string(),
            to_ticks(uploaded).unwrap().to_string(),
        )]));
        assert_eq!(resolve_timestamp(&props), Some(uploaded));
    }

    #[test]
    fn test_resolve_timestamp_falls_back_when_absent() {
        let props = props_with(HashMap::new());
        assert_eq!(resolve_timestamp(&props), props.last_modified);
    }

    #[test]
    fn test_resolve_timestamp_falls_back_when_unparsable() {
        let props = props_with(HashMap::from([(
            UPLOAD_TIMESTAMP_KEY.to_string(),
            "yesterday".to_string(),
        )]));
        assert_eq!(resolve_timestamp(&props), props.last_modified);
    }

    #[test]
    fn test_file_metadata_from_properties() {
        let props = props_with(HashMap::from([(
            UPLOAD_ID_KEY.to_string(),
            "u-1".to_string(),
        )]));
        let meta = FileMetadata::from_properties(&LogicalPath::new("media/logo.png"), &props);

        assert_eq!(meta.name, "logo.png");
        assert_eq!(meta.path, "/media/logo.png");
        assert_eq!(meta.size, 10);
        assert_eq!(meta.upload_id.as_deref(), Some("u-1"));
    }

    #[test]
    fn test_entry_serializes_camel_case() {
        let entry = FileManagerEntry::directory(&LogicalPath::new("media"), "images", true);
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"isDirectory\":true"));
        assert!(json.contains("\"hasChildDirectories\":true"));
        assert!(json.contains("\"path\":\"/media\""));
    }

    #[test]
    fn test_file_entry_timestamps() {
        let ts = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
        let entry = FileManagerEntry::file(&LogicalPath::root(), "a.txt", 3, Some(ts));
        assert_eq!(entry.created_utc, Some(ts));
        assert_eq!(entry.updated_utc, Some(ts));
        assert_eq!(entry.updated.map(|t| t.with_timezone(&Utc)), Some(ts));
        assert!(!entry.has_child_directories);
    }
}
