use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

use crate::error::FileStateError;

/// Organization status of a discovered file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileStatus {
    /// No decision yet
    Pending,
    /// A destination was suggested and is waiting for execution
    Ready,
    /// The decision was executed
    Completed,
    /// The user chose to leave the file where it is
    Skipped,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Pending => "pending",
            FileStatus::Ready => "ready",
            FileStatus::Completed => "completed",
            FileStatus::Skipped => "skipped",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(FileStatus::Pending),
            "ready" => Some(FileStatus::Ready),
            "completed" => Some(FileStatus::Completed),
            "skipped" => Some(FileStatus::Skipped),
            _ => None,
        }
    }
}

/// Where a file should end up
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Destination {
    /// Deletion (moved to the recoverable holding area)
    Trash,
    /// A user-granted folder
    Folder {
        /// Opaque grant resolved by a `FileAccessGrantor`
        access_token: String,
        /// Human readable folder name, e.g. "Documents/Finance"
        display_name: String,
    },
}

impl Destination {
    /// Shorthand for a folder destination
    pub fn folder(access_token: impl Into<String>, display_name: impl Into<String>) -> Self {
        Destination::Folder {
            access_token: access_token.into(),
            display_name: display_name.into(),
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Destination::Trash => "Trash",
            Destination::Folder { display_name, .. } => display_name,
        }
    }

    pub fn is_trash(&self) -> bool {
        matches!(self, Destination::Trash)
    }
}

/// Which decision stage produced a suggestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SuggestionSource {
    Rule,
    Pattern,
    Prediction,
}

impl SuggestionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionSource::Rule => "rule",
            SuggestionSource::Pattern => "pattern",
            SuggestionSource::Prediction => "prediction",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "rule" => Some(SuggestionSource::Rule),
            "pattern" => Some(SuggestionSource::Pattern),
            "prediction" => Some(SuggestionSource::Prediction),
            _ => None,
        }
    }
}

/// A decision produced by one of the pipeline stages
#[derive(Debug, Clone, PartialEq)]
pub struct Suggestion {
    pub destination: Destination,
    pub confidence: f64,
    pub source: SuggestionSource,
    pub reason: String,
    pub rule_id: Option<uuid::Uuid>,
}

/// Read-only view of the file attributes conditions are evaluated against.
///
/// Implemented by `OrganizedFile`; tests and callers with their own file
/// records can implement it directly.
pub trait FileView {
    /// Full file name including extension
    fn name(&self) -> &str;
    /// Lowercase extension without the dot
    fn extension(&self) -> Option<&str>;
    fn size(&self) -> u64;
    fn created_at(&self) -> Option<DateTime<Utc>>;
    fn modified_at(&self) -> Option<DateTime<Utc>>;
    fn accessed_at(&self) -> Option<DateTime<Utc>>;
    /// Coarse kind such as "image" or "document"
    fn kind(&self) -> &str;
    /// Tag of the location the file was discovered in, e.g. "downloads"
    fn source_location(&self) -> &str;
}

/// A discovered file moving through the decision pipeline.
///
/// Fields are private; name and extension are always derived from the
/// current path and a `Ready` file always carries a destination.
#[derive(Debug, Clone, PartialEq)]
pub struct OrganizedFile {
    id: String,
    path: PathBuf,
    name: String,
    extension: Option<String>,
    size: u64,
    created_at: Option<DateTime<Utc>>,
    modified_at: Option<DateTime<Utc>>,
    accessed_at: Option<DateTime<Utc>>,
    kind: String,
    source_location: String,
    status: FileStatus,
    destination: Option<Destination>,
    match_reason: Option<String>,
    confidence: Option<f64>,
    matched_rule_id: Option<uuid::Uuid>,
    suggestion_source: Option<SuggestionSource>,
}

impl OrganizedFile {
    /// Create a pending file. The initial path becomes the file's identity.
    pub fn new(path: impl Into<PathBuf>, size: u64) -> Result<Self, FileStateError> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(FileStateError::EmptyPath);
        }
        let (name, extension) = derive_name(&path);
        let kind = kind_for_extension(extension.as_deref()).to_string();

        Ok(Self {
            id: path.to_string_lossy().to_string(),
            path,
            name,
            extension,
            size,
            created_at: None,
            modified_at: None,
            accessed_at: None,
            kind,
            source_location: String::new(),
            status: FileStatus::Pending,
            destination: None,
            match_reason: None,
            confidence: None,
            matched_rule_id: None,
            suggestion_source: None,
        })
    }

    /// Build from on-disk metadata without following symlinks
    pub fn from_path(path: &Path, source_location: &str) -> std::io::Result<Self> {
        let metadata = std::fs::symlink_metadata(path)?;
        let mut file = Self::new(path, if metadata.is_file() { metadata.len() } else { 0 })
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

        file.created_at = metadata.created().ok().map(DateTime::<Utc>::from);
        file.modified_at = metadata.modified().ok().map(DateTime::<Utc>::from);
        file.accessed_at = metadata.accessed().ok().map(DateTime::<Utc>::from);
        file.source_location = source_location.to_string();
        Ok(file)
    }

    pub fn with_timestamps(
        mut self,
        created_at: Option<DateTime<Utc>>,
        modified_at: Option<DateTime<Utc>>,
        accessed_at: Option<DateTime<Utc>>,
    ) -> Self {
        self.created_at = created_at;
        self.modified_at = modified_at;
        self.accessed_at = accessed_at;
        self
    }

    pub fn with_source_location(mut self, source_location: impl Into<String>) -> Self {
        self.source_location = source_location.into();
        self
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn status(&self) -> FileStatus {
        self.status
    }

    pub fn destination(&self) -> Option<&Destination> {
        self.destination.as_ref()
    }

    pub fn match_reason(&self) -> Option<&str> {
        self.match_reason.as_deref()
    }

    pub fn confidence(&self) -> Option<f64> {
        self.confidence
    }

    pub fn matched_rule_id(&self) -> Option<uuid::Uuid> {
        self.matched_rule_id
    }

    pub fn suggestion_source(&self) -> Option<SuggestionSource> {
        self.suggestion_source
    }

    /// Move the file to a new path, re-deriving name and extension
    pub fn set_path(&mut self, path: impl Into<PathBuf>) -> Result<(), FileStateError> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(FileStateError::EmptyPath);
        }
        let (name, extension) = derive_name(&path);
        self.path = path;
        self.name = name;
        self.extension = extension;
        Ok(())
    }

    /// Record a pipeline decision and mark the file ready
    pub fn apply_suggestion(&mut self, suggestion: Suggestion) {
        self.destination = Some(suggestion.destination);
        self.confidence = Some(clamp_confidence(suggestion.confidence));
        self.suggestion_source = Some(suggestion.source);
        self.match_reason = Some(suggestion.reason);
        self.matched_rule_id = suggestion.rule_id;
        self.status = FileStatus::Ready;
    }

    /// Manually choose a destination (user override)
    pub fn set_destination(&mut self, destination: Option<Destination>) {
        if destination.is_none() && self.status == FileStatus::Ready {
            self.status = FileStatus::Pending;
        }
        self.destination = destination;
    }

    pub fn set_confidence(&mut self, confidence: f64) {
        self.confidence = Some(clamp_confidence(confidence));
    }

    /// Change status, refusing `Ready` without a destination
    pub fn set_status(&mut self, status: FileStatus) -> Result<(), FileStateError> {
        if status == FileStatus::Ready && self.destination.is_none() {
            return Err(FileStateError::ReadyWithoutDestination(self.id.clone()));
        }
        self.status = status;
        Ok(())
    }

    /// Restore a previously recorded status and destination pair
    pub fn restore(
        &mut self,
        status: FileStatus,
        destination: Option<Destination>,
    ) -> Result<(), FileStateError> {
        self.destination = destination;
        self.set_status(status)
    }

    /// Clear any suggestion and return to `Pending`
    pub fn reset(&mut self) {
        self.status = FileStatus::Pending;
        self.destination = None;
        self.match_reason = None;
        self.confidence = None;
        self.matched_rule_id = None;
        self.suggestion_source = None;
    }

    /// Rebuild a file from persisted fields
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        id: String,
        path: PathBuf,
        size: u64,
        timestamps: [Option<DateTime<Utc>>; 3],
        kind: String,
        source_location: String,
        status: FileStatus,
        destination: Option<Destination>,
        match_reason: Option<String>,
        confidence: Option<f64>,
        matched_rule_id: Option<uuid::Uuid>,
        suggestion_source: Option<SuggestionSource>,
    ) -> Result<Self, FileStateError> {
        if status == FileStatus::Ready && destination.is_none() {
            return Err(FileStateError::ReadyWithoutDestination(id));
        }
        let mut file = Self::new(path, size)?;
        let [created_at, modified_at, accessed_at] = timestamps;
        file.id = id;
        file.created_at = created_at;
        file.modified_at = modified_at;
        file.accessed_at = accessed_at;
        file.kind = kind;
        file.source_location = source_location;
        file.status = status;
        file.destination = destination;
        file.match_reason = match_reason;
        file.confidence = confidence.map(clamp_confidence);
        file.matched_rule_id = matched_rule_id;
        file.suggestion_source = suggestion_source;
        Ok(file)
    }
}

impl FileView for OrganizedFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn extension(&self) -> Option<&str> {
        self.extension.as_deref()
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    fn modified_at(&self) -> Option<DateTime<Utc>> {
        self.modified_at
    }

    fn accessed_at(&self) -> Option<DateTime<Utc>> {
        self.accessed_at
    }

    fn kind(&self) -> &str {
        &self.kind
    }

    fn source_location(&self) -> &str {
        &self.source_location
    }
}

fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

fn derive_name(path: &Path) -> (String, Option<String>) {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .filter(|e| !e.is_empty());
    (name, extension)
}

/// Map an extension to a coarse file kind.
///
/// Falls back to the MIME top-level type for anything not in the table.
pub fn kind_for_extension(extension: Option<&str>) -> &'static str {
    let Some(ext) = extension else {
        return "other";
    };
    let ext = ext.to_lowercase();
    match ext.as_str() {
        "pdf" | "doc" | "docx" | "odt" | "rtf" | "txt" | "md" | "pages" | "xls" | "xlsx"
        | "csv" | "numbers" | "ppt" | "pptx" | "key" | "epub" => "document",
        "zip" | "rar" | "7z" | "tar" | "gz" | "bz2" | "xz" => "archive",
        "dmg" | "pkg" | "exe" | "msi" | "deb" | "rpm" | "appimage" => "installer",
        "rs" | "py" | "js" | "ts" | "swift" | "go" | "java" | "c" | "cpp" | "h" | "json"
        | "yaml" | "yml" | "toml" | "sh" => "code",
        _ => match mime_guess::from_ext(&ext).first() {
            Some(m) if m.type_() == mime_guess::mime::IMAGE => "image",
            Some(m) if m.type_() == mime_guess::mime::VIDEO => "video",
            Some(m) if m.type_() == mime_guess::mime::AUDIO => "audio",
            Some(m) if m.type_() == mime_guess::mime::TEXT => "document",
            _ => "other",
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_and_extension_follow_path() {
        let mut file = OrganizedFile::new("/Users/me/Downloads/Invoice.PDF", 10).unwrap();
        assert_eq!(file.name(), "Invoice.PDF");
        assert_eq!(file.extension(), Some("pdf"));
        assert_eq!(file.kind(), "document");

        file.set_path("/Users/me/Documents/report.docx").unwrap();
        assert_eq!(file.name(), "report.docx");
        assert_eq!(file.extension(), Some("docx"));
        // identity does not change with the path
        assert_eq!(file.id(), "/Users/me/Downloads/Invoice.PDF");
    }

    #[test]
    fn test_ready_requires_destination() {
        let mut file = OrganizedFile::new("/tmp/a.pdf", 1).unwrap();
        assert!(file.set_status(FileStatus::Ready).is_err());

        file.set_destination(Some(Destination::folder("tok", "Documents")));
        file.set_status(FileStatus::Ready).unwrap();
        assert_eq!(file.status(), FileStatus::Ready);

        file.set_destination(None);
        assert_eq!(file.status(), FileStatus::Pending);
    }

    #[test]
    fn test_confidence_is_clamped() {
        let mut file = OrganizedFile::new("/tmp/a.pdf", 1).unwrap();
        file.set_confidence(1.7);
        assert_eq!(file.confidence(), Some(1.0));
        file.set_confidence(-0.2);
        assert_eq!(file.confidence(), Some(0.0));
        file.set_confidence(f64::NAN);
        assert_eq!(file.confidence(), Some(0.0));
    }

    #[test]
    fn test_empty_path_rejected() {
        assert_eq!(OrganizedFile::new("", 0), Err(FileStateError::EmptyPath));
    }

    #[test]
    fn test_kind_for_extension() {
        assert_eq!(kind_for_extension(Some("png")), "image");
        assert_eq!(kind_for_extension(Some("MP4")), "video");
        assert_eq!(kind_for_extension(Some("mp3")), "audio");
        assert_eq!(kind_for_extension(Some("zip")), "archive");
        assert_eq!(kind_for_extension(Some("dmg")), "installer");
        assert_eq!(kind_for_extension(Some("css")), "document");
        assert_eq!(kind_for_extension(Some("qqxz")), "other");
        assert_eq!(kind_for_extension(None), "other");
    }

    #[test]
    fn test_from_path_reads_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.jpg");
        std::fs::write(&path, b"12345").unwrap();

        let file = OrganizedFile::from_path(&path, "downloads").unwrap();
        assert_eq!(file.size(), 5);
        assert_eq!(file.kind(), "image");
        assert_eq!(file.source_location(), "downloads");
        assert!(file.modified_at().is_some());
    }
}
