use std::path::PathBuf;

/// Errors that can occur while archiving or cleaning up log files.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Invalid archive path pattern '{0}': {1}")]
    InvalidPattern(String, String),
    #[error("Failed to list directory '{0}': {1}")]
    ListDirectoryFailed(PathBuf, String),
    #[error("Failed to create directory '{0}': {1}")]
    CreateDirectoryFailed(PathBuf, String),
    #[error("Failed to rename file from '{from}' to '{to}': {error}")]
    RenameFileError { from: PathBuf, to: PathBuf, error: String },
    #[error("Failed to delete file '{path}': {error}")]
    DeleteFileError { path: PathBuf, error: String },
    #[error("Failed to compress '{from}' into '{to}': {error}")]
    CompressFileError { from: PathBuf, to: PathBuf, error: String },
    #[error("Failed to set file permissions for '{path}': {error}")]
    SetFilePermissionsError { path: PathBuf, error: String },
    #[error("Archive file '{0}' already exists")]
    ArchiveExists(PathBuf),
    #[error("Archives '{first}' and '{second}' resolve to the same date and sequence")]
    DuplicateArchiveSlot { first: PathBuf, second: PathBuf },
    #[error("File IO error: {0}")]
    FileIOError(#[from] std::io::Error),
}
