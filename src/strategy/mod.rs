//! Archive numbering strategies.
//!
//! A strategy knows how archives of one path pattern are named: how to find
//! the ones already on disk, how to name the next one and which ones a
//! retention policy should remove. The filesystem is the only source of
//! truth; strategies keep no archive lists between calls.

mod date;
mod date_sequence;
mod rolling;
mod sequence;

pub use {
    date::DateStrategy, date_sequence::DateAndSequenceStrategy, rolling::RollingStrategy,
    sequence::SequenceStrategy,
};

use {
    crate::{
        archive_file::ArchiveFile,
        compression::Compressor,
        error::ArchiveError,
        pattern::{mask_regex, ArchivePattern},
        retention::RetentionPolicy,
    },
    chrono::{DateTime, FixedOffset, Utc},
    std::{
        cmp::Ordering,
        collections::HashMap,
        fmt::Debug,
        fs::{self, Metadata, OpenOptions},
        io::{self, Write as _},
        path::{Path, PathBuf},
    },
};

/// Naming, discovery and cleanup selection for one numbering scheme.
pub trait ArchiveStrategy: Debug + Send + Sync {
    /// The strftime format used to render archive dates.
    fn date_format(&self) -> &str;

    /// The offset archive dates are rendered and parsed in.
    fn time_zone(&self) -> FixedOffset;

    /// Whether count and age based cleanup applies to this scheme at all.
    fn is_cleanup_enabled(&self) -> bool {
        true
    }

    /// Whether a cleanup pass should run when a new active log file is
    /// opened, before any rotation happened.
    fn should_cleanup_on_file_open(&self, _pattern: &ArchivePattern, max_files: i32, max_days: i32) -> bool {
        self.is_cleanup_enabled() && !RetentionPolicy::new(max_files, max_days).is_unlimited()
    }

    /// A wildcard mask matching the file name of every archive of `pattern`.
    fn build_discovery_mask(&self, pattern: &ArchivePattern) -> String {
        pattern.mask()
    }

    /// Turn a file matching the discovery mask into an archive descriptor.
    /// `value` is the part of the file name that stands in for the
    /// placeholder and `modified` the file's modification time. Returns
    /// `None` when the name does not parse.
    fn parse_archive(
        &self,
        pattern: &ArchivePattern,
        path: &Path,
        value: &str,
        modified: DateTime<FixedOffset>,
    ) -> Option<ArchiveFile>;

    /// List the archives of `pattern` on disk, oldest first.
    fn discover_existing_archives(&self, pattern: &ArchivePattern) -> Result<Vec<ArchiveFile>, ArchiveError> {
        discover(self, pattern)
    }

    /// Chronological order of two archives: by date period, then sequence,
    /// then path.
    fn compare(&self, a: &ArchiveFile, b: &ArchiveFile) -> Ordering {
        a.period()
            .cmp(&b.period())
            .then_with(|| a.sequence().cmp(&b.sequence()))
            .then_with(|| a.path().cmp(b.path()))
    }

    /// Compute the descriptor of the archive about to be created.
    ///
    /// The default picks the highest sequence among archives whose formatted
    /// date matches `rotation_date`, plus one, or 0 when none match.
    fn next_archive_name(
        &self,
        pattern: &ArchivePattern,
        rotation_date: DateTime<FixedOffset>,
        existing: &[ArchiveFile],
    ) -> Result<ArchiveFile, ArchiveError>;

    /// Select the archives the retention limits ask to delete, oldest first.
    fn select_for_cleanup(
        &self,
        pattern: &ArchivePattern,
        existing: &[ArchiveFile],
        max_files: i32,
        max_days: i32,
    ) -> Vec<ArchiveFile> {
        let now = Utc::now().with_timezone(&self.time_zone());
        self.select_for_cleanup_at(pattern, existing, max_files, max_days, now)
    }

    /// [`ArchiveStrategy::select_for_cleanup`] against a fixed clock.
    fn select_for_cleanup_at(
        &self,
        _pattern: &ArchivePattern,
        existing: &[ArchiveFile],
        max_files: i32,
        max_days: i32,
        now: DateTime<FixedOffset>,
    ) -> Vec<ArchiveFile> {
        let mut ordered = existing.to_vec();
        ordered.sort_by(|a, b| self.compare(a, b));
        RetentionPolicy::new(max_files, max_days).select(&ordered, now)
    }

    /// Turn the active log file into the archive described by `next`,
    /// compressing it when a compressor is given. Returns the archive path.
    fn archive(
        &self,
        active: &Path,
        _pattern: &ArchivePattern,
        next: &ArchiveFile,
        compressor: Option<&dyn Compressor>,
    ) -> Result<PathBuf, ArchiveError> {
        if next.path().exists() {
            return Err(ArchiveError::ArchiveExists(next.path().to_path_buf()));
        }
        move_archive(active, next.path(), compressor)?;
        Ok(next.path().to_path_buf())
    }
}

/// Highest sequence among archives sharing the formatted date of
/// `rotation_date`, plus one; 0 when there is none.
pub fn next_sequence_for_date(rotation_date: &DateTime<FixedOffset>, existing: &[ArchiveFile]) -> u32 {
    existing
        .iter()
        .filter(|archive| archive.has_same_formatted_date(rotation_date))
        .map(|archive| archive.sequence().saturating_add(1))
        .max()
        .unwrap_or(0)
}

/// Parse a placeholder value made only of ASCII digits.
fn parse_sequence(value: &str) -> Option<u32> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

/// Parse a placeholder value holding a number exactly as `pattern` pads it,
/// so `app.01.log` is no archive of `app.{#}.log`.
pub(crate) fn parse_padded_sequence(pattern: &ArchivePattern, value: &str) -> Option<u32> {
    parse_sequence(value).filter(|number| pattern.pad(*number) == value)
}

fn discover<S: ArchiveStrategy + ?Sized>(
    strategy: &S,
    pattern: &ArchivePattern,
) -> Result<Vec<ArchiveFile>, ArchiveError> {
    let mask = strategy.build_discovery_mask(pattern);
    let matcher = mask_regex(&mask)?;
    let directory = pattern.directory();

    let entries = match fs::read_dir(directory) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            tracing::debug!("Archive directory '{}' does not exist yet", directory.display());
            return Ok(Vec::new());
        }
        Err(err) => return Err(ArchiveError::ListDirectoryFailed(directory.to_path_buf(), err.to_string())),
    };

    let mut archives = Vec::new();
    for entry in entries.flatten() {
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        let Some(value) = matcher.captures(name).and_then(|c| c.get(1)) else {
            continue;
        };
        // The entry may vanish between listing and stat.
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }

        let path = entry.path();
        let modified = modified_time(&metadata, strategy.time_zone());
        match strategy.parse_archive(pattern, &path, value.as_str(), modified) {
            Some(archive) => archives.push(archive),
            None => tracing::debug!("Skipping '{}': name does not parse as an archive", path.display()),
        }
    }

    archives.sort_by(|a, b| strategy.compare(a, b));
    ensure_distinct_slots(&archives)?;
    tracing::debug!(
        "Found {} archives matching '{}' in '{}'",
        archives.len(),
        mask,
        directory.display()
    );
    Ok(archives)
}

fn ensure_distinct_slots(archives: &[ArchiveFile]) -> Result<(), ArchiveError> {
    let mut seen = HashMap::with_capacity(archives.len());
    for archive in archives {
        let slot = (archive.formatted_date(), archive.sequence());
        if let Some(first) = seen.insert(slot, archive.path()) {
            return Err(ArchiveError::DuplicateArchiveSlot {
                first: first.to_path_buf(),
                second: archive.path().to_path_buf(),
            });
        }
    }
    Ok(())
}

fn modified_time(metadata: &Metadata, time_zone: FixedOffset) -> DateTime<FixedOffset> {
    match metadata.modified() {
        Ok(time) => DateTime::<Utc>::from(time).with_timezone(&time_zone),
        Err(err) => {
            tracing::debug!("File modification time unavailable, using now: {}", err);
            Utc::now().with_timezone(&time_zone)
        }
    }
}

/// Move `from` to `to`, compressing on the way when a compressor is given.
///
/// When the destination directory is missing it is created and the move is
/// retried exactly once. Any other failure is returned as is.
pub(crate) fn move_archive(from: &Path, to: &Path, compressor: Option<&dyn Compressor>) -> Result<(), ArchiveError> {
    match transfer(from, to, compressor) {
        Err(err) if is_missing_directory(to) => {
            let Some(parent) = to.parent() else {
                return Err(err);
            };
            tracing::warn!(
                "Archive directory '{}' is missing, creating it and retrying: {}",
                parent.display(),
                err
            );
            fs::create_dir_all(parent)
                .map_err(|err| ArchiveError::CreateDirectoryFailed(parent.to_path_buf(), err.to_string()))?;
            transfer(from, to, compressor)
        }
        result => result,
    }
}

fn transfer(from: &Path, to: &Path, compressor: Option<&dyn Compressor>) -> Result<(), ArchiveError> {
    match compressor {
        Some(compressor) => {
            tracing::trace!("Compressing '{}' into '{}'", from.display(), to.display());
            compressor.compress(from, to)?;
            fs::remove_file(from).map_err(|err| ArchiveError::DeleteFileError {
                path: from.to_path_buf(),
                error: err.to_string(),
            })
        }
        None => {
            tracing::trace!("Renaming '{}' to '{}'", from.display(), to.display());
            fs::rename(from, to).map_err(|err| ArchiveError::RenameFileError {
                from: from.to_path_buf(),
                to: to.to_path_buf(),
                error: err.to_string(),
            })
        }
    }
}

fn is_missing_directory(path: &Path) -> bool {
    path.parent()
        .is_some_and(|parent| !parent.as_os_str().is_empty() && !parent.exists())
}

/// Append the content of `from` to the existing archive `to`, then delete
/// `from`. Fails without touching `from` when `to` cannot be opened.
pub(crate) fn append_archive(from: &Path, to: &Path) -> Result<(), ArchiveError> {
    tracing::trace!("Appending '{}' to '{}'", from.display(), to.display());
    {
        let mut source = fs::File::open(from)?;
        let mut destination = OpenOptions::new().append(true).open(to)?;
        io::copy(&mut source, &mut destination)?;
        destination.flush()?;
    }
    fs::remove_file(from).map_err(|err| ArchiveError::DeleteFileError {
        path: from.to_path_buf(),
        error: err.to_string(),
    })
}

/// Delete an archive. A file that is already gone counts as deleted.
pub(crate) fn remove_archive(path: &Path) -> Result<(), ArchiveError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            tracing::debug!("Archive '{}' was already removed", path.display());
            Ok(())
        }
        Err(err) => Err(ArchiveError::DeleteFileError {
            path: path.to_path_buf(),
            error: err.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use {super::*, chrono::TimeZone};

    fn at(d: u32, h: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 1, d, h, 0, 0)
            .unwrap()
    }

    #[test]
    fn next_sequence_follows_matching_date() {
        let existing = [0, 1, 2]
            .into_iter()
            .map(|seq| ArchiveFile::new(format!("/logs/app.{seq}.log"), at(5, seq + 1), "%Y%m%d", seq).unwrap())
            .chain([ArchiveFile::new("/logs/old.log", at(4, 3), "%Y%m%d", 9).unwrap()])
            .collect::<Vec<_>>();

        assert_eq!(next_sequence_for_date(&at(5, 20), &existing), 3);
        assert_eq!(next_sequence_for_date(&at(6, 0), &existing), 0);
    }

    #[test]
    fn parses_only_digit_sequences() {
        assert_eq!(parse_sequence("007"), Some(7));
        assert_eq!(parse_sequence(""), None);
        assert_eq!(parse_sequence("+7"), None);
        assert_eq!(parse_sequence("7a"), None);
    }

    #[test]
    fn padded_sequence_must_match_pattern_width() {
        let narrow = ArchivePattern::new("/logs/app.{#}.log").unwrap();
        assert_eq!(parse_padded_sequence(&narrow, "1"), Some(1));
        assert_eq!(parse_padded_sequence(&narrow, "12"), Some(12));
        assert_eq!(parse_padded_sequence(&narrow, "01"), None);

        let wide = ArchivePattern::new("/logs/app.{###}.log").unwrap();
        assert_eq!(parse_padded_sequence(&wide, "007"), Some(7));
        assert_eq!(parse_padded_sequence(&wide, "7"), None);
        assert_eq!(parse_padded_sequence(&wide, "1234"), Some(1234));
    }

    #[test]
    fn distinct_slots_are_enforced() {
        let first = ArchiveFile::new("/logs/a.log", at(5, 1), "%Y%m%d", 1).unwrap();
        let second = ArchiveFile::new("/logs/b.log", at(5, 9), "%Y%m%d", 1).unwrap();
        let other_day = ArchiveFile::new("/logs/c.log", at(6, 1), "%Y%m%d", 1).unwrap();

        assert!(ensure_distinct_slots(&[first.clone(), other_day]).is_ok());
        assert!(matches!(
            ensure_distinct_slots(&[first, second]),
            Err(ArchiveError::DuplicateArchiveSlot { .. })
        ));
    }

    #[test]
    fn move_creates_missing_directory_once() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("app.log");
        let to = dir.path().join("archive").join("nested").join("app.0.log");
        fs::write(&from, "content").unwrap();

        move_archive(&from, &to, None).unwrap();

        assert!(!from.exists());
        assert_eq!(fs::read_to_string(&to).unwrap(), "content");
    }

    #[test]
    fn move_of_missing_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = move_archive(&dir.path().join("absent.log"), &dir.path().join("app.0.log"), None).unwrap_err();
        assert!(matches!(err, ArchiveError::RenameFileError { .. }));
    }

    #[test]
    fn append_extends_archive_and_removes_source() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("app.log");
        let to = dir.path().join("app.20240105.log");
        fs::write(&from, "second\n").unwrap();
        fs::write(&to, "first\n").unwrap();

        append_archive(&from, &to).unwrap();

        assert!(!from.exists());
        assert_eq!(fs::read_to_string(&to).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn append_to_missing_archive_keeps_source() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("app.log");
        fs::write(&from, "content").unwrap();

        let err = append_archive(&from, &dir.path().join("absent.log")).unwrap_err();

        assert!(matches!(err, ArchiveError::FileIOError(_)));
        assert_eq!(fs::read_to_string(&from).unwrap(), "content");
    }

    #[test]
    fn removing_missing_archive_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        remove_archive(&dir.path().join("gone.log")).unwrap();
    }
}
