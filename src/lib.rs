//! # LogArchiver
//!
//! LogArchiver turns closed log files into archives and keeps the archive
//! directory tidy. Given an archive path pattern such as `./logs/app.{#}.log`
//! it names, moves, optionally compresses and finally cleans up archived log
//! files. **Deciding when to rotate is left to the caller**: a log appender
//! detects that its active file grew too large or crossed a time boundary,
//! closes it and asks the [`Archiver`] to archive it.
//!
//! Four numbering schemes are supported:
//!
//! * [`ArchiveNumbering::Sequence`] - `app.0.log`, `app.1.log`, ... with the
//!   newest archive carrying the highest number.
//! * [`ArchiveNumbering::Rolling`] - the newest archive always lives in
//!   `app.0.log` and older archives are shifted up one slot per rotation.
//! * [`ArchiveNumbering::Date`] - `app.20250401.log`, one archive per
//!   date. Later rotations of the same date are appended to it.
//! * [`ArchiveNumbering::DateAndSequence`] - `app.20250401.0.log`,
//!   `app.20250401.1.log`, ... any number of archives per date.
//!
//! Archives are discovered from the directory listing on every call, so a
//! rotation interrupted halfway is picked up again by the next one.
//!
//! ## Example
//!
//! ```rust,no_run
//! use logarchiver::{ArchiveNumbering, ArchiverBuilder, Compression, TimeZone};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let archiver = ArchiverBuilder::new("./logs/archive/app.{###}.log.gz")
//!         .numbering(ArchiveNumbering::Rolling(5)) // Keep app.000.log.gz to app.004.log.gz
//!         .time_zone(TimeZone::UTC)
//!         .compression(Compression::Gzip) // Compress the freshly closed log file
//!         .build()?;
//!
//!     // The active log file was closed by the appender.
//!     if let Some(archive) = archiver.archive("./logs/app.log")? {
//!         tracing::info!("Archived into {}", archive.display());
//!     }
//!     Ok(())
//! }
//! ```
mod archive_file;
mod compression;
mod error;
mod pattern;
mod retention;
pub mod strategy;

pub use {
    archive_file::ArchiveFile,
    compression::{Compression, Compressor},
    error::ArchiveError,
    pattern::{ArchivePattern, WILDCARD},
    retention::RetentionPolicy,
    strategy::{
        ArchiveStrategy, DateAndSequenceStrategy, DateStrategy, RollingStrategy, SequenceStrategy,
    },
};

use {
    chrono::{DateTime, FixedOffset, Local, Utc},
    std::{
        fs,
        path::{Path, PathBuf},
        sync::{Mutex, PoisonError},
    },
};

#[cfg(unix)]
use {std::fs::Permissions, std::os::unix::fs::PermissionsExt};

/// The date format used when none is configured, e.g. `20250401`.
pub const DEFAULT_DATE_FORMAT: &str = "%Y%m%d";

/// Selects how archives are numbered.
///
/// # Examples
/// ```
/// use logarchiver::{ArchiveNumbering, ArchiverBuilder};
///
/// // app.0.log is always the newest archive, at most 10 archives are kept
/// let archiver = ArchiverBuilder::new("./logs/app.{#}.log")
///     .numbering(ArchiveNumbering::Rolling(10))
///     .build()
///     .unwrap();
///
/// // app.2025-04-01.0.log, app.2025-04-01.1.log, ...
/// let archiver = ArchiverBuilder::new("./logs/app.{#}.log")
///     .numbering(ArchiveNumbering::DateAndSequence)
///     .date_format("%Y-%m-%d")
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveNumbering {
    /// Ever increasing numbers, the newest archive has the highest one.
    Sequence,
    /// Slot 0 always holds the newest archive. Archives shifted to the given
    /// capacity are deleted; a capacity of zero or below keeps them all and
    /// leaves bounding the archive count to the retention limits.
    Rolling(i32),
    /// The formatted rotation date. Later rotations of the same date are
    /// appended to the existing uncompressed archive.
    Date,
    /// The formatted rotation date followed by a sequence restarting at 0 for
    /// every date.
    DateAndSequence,
}

impl ArchiveNumbering {
    /// Build the strategy implementing this numbering scheme.
    fn strategy(&self, date_format: &str, time_zone: FixedOffset) -> Result<Box<dyn ArchiveStrategy>, ArchiveError> {
        Ok(match self {
            ArchiveNumbering::Sequence => Box::new(SequenceStrategy::new(date_format, time_zone)?),
            ArchiveNumbering::Rolling(capacity) => Box::new(RollingStrategy::new(*capacity, date_format, time_zone)?),
            ArchiveNumbering::Date => Box::new(DateStrategy::new(date_format, time_zone)?),
            ArchiveNumbering::DateAndSequence => Box::new(DateAndSequenceStrategy::new(date_format, time_zone)?),
        })
    }
}

/// Represents the time zone archive dates are rendered and parsed in.
///
/// # Examples
/// ```
/// use {chrono::FixedOffset, logarchiver::TimeZone};
///
/// let utc = TimeZone::UTC;
/// let local = TimeZone::Local;
///
/// // Use a fixed offset for a specific region (e.g., UTC+8 for China)
/// let china = TimeZone::Fix(FixedOffset::east_opt(8 * 3600).unwrap());
/// ```
#[derive(Debug, Clone)]
pub enum TimeZone {
    /// Use UTC time zone. Best for consistent archive names across hosts.
    UTC,
    /// Use the system's local time zone, captured when the archiver is built.
    Local,
    /// Use a fixed time zone offset.
    Fix(FixedOffset),
}

impl TimeZone {
    fn offset(&self) -> FixedOffset {
        match self {
            TimeZone::UTC => Utc::now().fixed_offset().offset().to_owned(),
            TimeZone::Local => Local::now().offset().to_owned(),
            TimeZone::Fix(fixed_offset) => *fixed_offset,
        }
    }
}

/// Configuration collected by [`ArchiverBuilder`].
#[derive(Debug)]
struct ArchiverMeta {
    /// The archive path pattern, e.g. `./logs/app.{#}.log`.
    pattern: PathBuf,
    numbering: ArchiveNumbering,
    /// A chrono strftime format used for archive dates.
    date_format: String,
    time_zone: TimeZone,
    /// Replaces the plain rename of the active file into its archive.
    compressor: Option<Box<dyn Compressor>>,
    /// The maximum number of archives to keep, zero or below for no limit.
    max_archive_files: i32,
    /// The maximum archive age in days, zero or below for no limit.
    max_archive_days: i32,
    /// The file permissions to set on newly created archives (Unix-like
    /// systems only), in octal notation (e.g., 0o640 for rw-r-----).
    file_mode: Option<u32>,
}

impl ArchiverMeta {
    fn new<P: AsRef<Path>>(pattern: P) -> Self {
        ArchiverMeta {
            pattern: pattern.as_ref().to_path_buf(),
            numbering: ArchiveNumbering::Sequence,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            time_zone: TimeZone::Local,
            compressor: None,
            max_archive_files: 0,
            max_archive_days: 0,
            file_mode: None,
        }
    }
}

/// Provides a fluent interface for configuring [`Archiver`] instances.
///
/// # Default Configuration
///
/// * Sequence numbering
/// * `%Y%m%d` date format
/// * Local system time zone
/// * No compression
/// * Keep all archives
/// * Standard file permissions
///
/// # Examples
///
/// Daily archives, one week of history:
/// ```rust
/// use logarchiver::{ArchiveNumbering, ArchiverBuilder, Compression, TimeZone};
///
/// let archiver = ArchiverBuilder::new("./logs/app.{#}.log.gz")
///     .numbering(ArchiveNumbering::DateAndSequence)
///     .time_zone(TimeZone::UTC)
///     .compression(Compression::Gzip)
///     .max_archive_days(7)
///     .build()
///     .unwrap();
/// ```
pub struct ArchiverBuilder {
    meta: ArchiverMeta,
}

impl ArchiverBuilder {
    /// Create a new archiver builder.
    /// # Arguments
    /// * `pattern` - The archive path pattern. Its file name may contain
    ///   one `{#}` placeholder; more `#` characters widen the zero-padding
    ///   of numbers (`{###}` renders 7 as `007`). Without a placeholder one
    ///   is inserted before the extension, so `app.log` becomes `app.{#}.log`.
    pub fn new<P: AsRef<Path>>(pattern: P) -> Self {
        ArchiverBuilder {
            meta: ArchiverMeta::new(pattern),
        }
    }

    /// Set the numbering scheme.
    pub fn numbering(self, numbering: ArchiveNumbering) -> Self {
        Self {
            meta: ArchiverMeta { numbering, ..self.meta },
        }
    }

    /// Set the chrono strftime format used to render archive dates.
    pub fn date_format(self, date_format: &str) -> Self {
        Self {
            meta: ArchiverMeta {
                date_format: date_format.to_string(),
                ..self.meta
            },
        }
    }

    /// Set the time zone for archive dates.
    pub fn time_zone(self, time_zone: TimeZone) -> Self {
        Self {
            meta: ArchiverMeta { time_zone, ..self.meta },
        }
    }

    /// Compress freshly archived files with a built-in algorithm.
    pub fn compression(self, compression: Compression) -> Self {
        self.compressor(Box::new(compression))
    }

    /// Compress freshly archived files with a custom [`Compressor`].
    pub fn compressor(self, compressor: Box<dyn Compressor>) -> Self {
        Self {
            meta: ArchiverMeta {
                compressor: Some(compressor),
                ..self.meta
            },
        }
    }

    /// Set the maximum number of archives to keep.
    pub fn max_archive_files(self, max_archive_files: i32) -> Self {
        Self {
            meta: ArchiverMeta {
                max_archive_files,
                ..self.meta
            },
        }
    }

    /// Set the maximum age of archives in days.
    pub fn max_archive_days(self, max_archive_days: i32) -> Self {
        Self {
            meta: ArchiverMeta {
                max_archive_days,
                ..self.meta
            },
        }
    }

    /// Set the file permissions for archives (Unix-like systems only).
    /// This sets the file mode bits in octal notation like when using chmod.
    /// For example, 0o640 for rw-r----- permissions.
    pub fn file_mode(self, mode: u32) -> Self {
        Self {
            meta: ArchiverMeta {
                file_mode: Some(mode),
                ..self.meta
            },
        }
    }

    /// Build the archiver.
    /// # Errors
    /// Fails when the pattern or the date format is invalid.
    pub fn build(self) -> Result<Archiver, ArchiveError> {
        let meta = self.meta;
        let pattern = ArchivePattern::new(&meta.pattern)?;
        let time_zone = meta.time_zone.offset();
        let strategy = meta.numbering.strategy(&meta.date_format, time_zone)?;
        Ok(Archiver {
            pattern,
            strategy,
            compressor: meta.compressor,
            retention: RetentionPolicy::new(meta.max_archive_files, meta.max_archive_days),
            time_zone,
            file_mode: meta.file_mode,
            lock: Mutex::new(()),
        })
    }
}

/// Archives closed log files and cleans up old archives of one path pattern.
///
/// All operations on one `Archiver` are serialized, so it can be shared
/// between threads. Archivers of different patterns are independent; two
/// archivers of the same pattern must not be used concurrently.
#[derive(Debug)]
pub struct Archiver {
    pattern: ArchivePattern,
    strategy: Box<dyn ArchiveStrategy>,
    compressor: Option<Box<dyn Compressor>>,
    retention: RetentionPolicy,
    time_zone: FixedOffset,
    file_mode: Option<u32>,
    lock: Mutex<()>,
}

impl Archiver {
    pub fn pattern(&self) -> &ArchivePattern {
        &self.pattern
    }

    pub fn strategy(&self) -> &dyn ArchiveStrategy {
        &*self.strategy
    }

    pub fn retention(&self) -> RetentionPolicy {
        self.retention
    }

    /// The wildcard mask matching every archive file name of this archiver.
    pub fn discovery_mask(&self) -> String {
        self.strategy.build_discovery_mask(&self.pattern)
    }

    /// List the archives currently on disk, oldest first.
    pub fn discover(&self) -> Result<Vec<ArchiveFile>, ArchiveError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.strategy.discover_existing_archives(&self.pattern)
    }

    /// Archive `active` now. See [`Archiver::archive_at`].
    pub fn archive<P: AsRef<Path>>(&self, active: P) -> Result<Option<PathBuf>, ArchiveError> {
        self.archive_at(active, self.now())
    }

    /// Turn the closed log file `active` into the next archive.
    ///
    /// The archive name is derived from `rotation_date` and the archives on
    /// disk. Once the archive is in place its file mode is applied and, when
    /// the numbering scheme allows it, the retention limits are enforced with
    /// `rotation_date` as the current time.
    /// # Returns
    /// The path of the new archive, or `None` when `active` does not exist.
    /// # Errors
    /// Any I/O failure other than a missing archive directory aborts the
    /// rotation. The active file may be left in place, so the caller should
    /// try again on the next rotation.
    pub fn archive_at<P: AsRef<Path>>(
        &self,
        active: P,
        rotation_date: DateTime<FixedOffset>,
    ) -> Result<Option<PathBuf>, ArchiveError> {
        let active = active.as_ref();
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        if !active.is_file() {
            tracing::debug!("Nothing to archive, '{}' does not exist", active.display());
            return Ok(None);
        }

        let existing = self.discover_excluding(Some(active))?;
        let next = self
            .strategy
            .next_archive_name(&self.pattern, rotation_date, &existing)?;
        let archive = self
            .strategy
            .archive(active, &self.pattern, &next, self.compressor.as_deref())?;
        tracing::info!("Archived '{}' to '{}'", active.display(), archive.display());
        self.set_permissions(&archive)?;

        if self.is_cleanup_enabled() {
            self.cleanup_locked(rotation_date, Some(active))?;
        }
        Ok(Some(archive))
    }

    /// Delete the archives exceeding the retention limits now. See
    /// [`Archiver::cleanup_at`].
    pub fn cleanup(&self) -> Result<Vec<PathBuf>, ArchiveError> {
        self.cleanup_at(self.now())
    }

    /// Delete the archives exceeding the retention limits at `now`.
    /// # Returns
    /// The deleted archive paths, oldest first. Archives that vanished
    /// before they could be deleted are reported as deleted.
    pub fn cleanup_at(&self, now: DateTime<FixedOffset>) -> Result<Vec<PathBuf>, ArchiveError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        if !self.is_cleanup_enabled() {
            return Ok(Vec::new());
        }
        self.cleanup_locked(now, None)
    }

    /// Run a cleanup pass if the numbering scheme asks for one when the
    /// active log file `active` is opened. `active` itself is never deleted,
    /// even when its name matches the archive pattern.
    pub fn cleanup_on_file_open<P: AsRef<Path>>(&self, active: P) -> Result<Vec<PathBuf>, ArchiveError> {
        let run = self.strategy.should_cleanup_on_file_open(
            &self.pattern,
            self.retention.max_files(),
            self.retention.max_days(),
        );
        if !run {
            return Ok(Vec::new());
        }
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.cleanup_locked(self.now(), Some(active.as_ref()))
    }

    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.time_zone)
    }

    fn is_cleanup_enabled(&self) -> bool {
        self.strategy.is_cleanup_enabled() && !self.retention.is_unlimited()
    }

    fn discover_excluding(&self, active: Option<&Path>) -> Result<Vec<ArchiveFile>, ArchiveError> {
        let mut archives = self.strategy.discover_existing_archives(&self.pattern)?;
        if let Some(active) = active {
            archives.retain(|archive| !is_same_file(archive.path(), active));
        }
        Ok(archives)
    }

    fn cleanup_locked(
        &self,
        now: DateTime<FixedOffset>,
        active: Option<&Path>,
    ) -> Result<Vec<PathBuf>, ArchiveError> {
        let existing = self.discover_excluding(active)?;
        let doomed = self.strategy.select_for_cleanup_at(
            &self.pattern,
            &existing,
            self.retention.max_files(),
            self.retention.max_days(),
            now,
        );

        let mut deleted = Vec::with_capacity(doomed.len());
        for archive in doomed {
            tracing::info!("Deleting old archive '{}'", archive.path().display());
            strategy::remove_archive(archive.path())?;
            deleted.push(archive.path().to_path_buf());
        }
        Ok(deleted)
    }

    /// Set the file permissions for a new archive.
    ///
    /// Only on Unix-like systems; elsewhere a configured mode is ignored
    /// with a warning.
    fn set_permissions(&self, path: &Path) -> Result<(), ArchiveError> {
        if let Some(mode) = self.file_mode {
            #[cfg(unix)]
            {
                let perms = Permissions::from_mode(mode);
                fs::set_permissions(path, perms).map_err(|err| ArchiveError::SetFilePermissionsError {
                    path: path.to_path_buf(),
                    error: err.to_string(),
                })?
            }
            #[cfg(not(unix))]
            {
                tracing::warn!(
                    "Ignoring file mode {:o} for '{}': not supported on this platform",
                    mode,
                    path.display()
                );
            }
        }
        Ok(())
    }
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
