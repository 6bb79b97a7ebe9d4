use {
    super::{append_archive, move_archive, next_sequence_for_date, ArchiveStrategy},
    crate::{
        archive_file::{parse_exact_date, render_date, validate_date_format, ArchiveFile},
        compression::Compressor,
        error::ArchiveError,
        pattern::ArchivePattern,
    },
    chrono::{DateTime, FixedOffset},
    std::path::{Path, PathBuf},
};

/// Names archives after the rotation date alone: `app.20240105.log`.
///
/// Only one archive per formatted date exists. Further rotations within the
/// same date period are appended to that archive. Compressed archives cannot
/// be appended to, so there a second rotation fails with
/// [`ArchiveError::ArchiveExists`]; use [`super::DateAndSequenceStrategy`]
/// to get one compressed archive per rotation.
#[derive(Debug, Clone)]
pub struct DateStrategy {
    date_format: String,
    time_zone: FixedOffset,
}

impl DateStrategy {
    pub fn new(date_format: &str, time_zone: FixedOffset) -> Result<Self, ArchiveError> {
        validate_date_format(date_format)?;
        Ok(DateStrategy {
            date_format: date_format.to_string(),
            time_zone,
        })
    }
}

impl ArchiveStrategy for DateStrategy {
    fn date_format(&self) -> &str {
        &self.date_format
    }

    fn time_zone(&self) -> FixedOffset {
        self.time_zone
    }

    fn parse_archive(
        &self,
        _pattern: &ArchivePattern,
        path: &Path,
        value: &str,
        _modified: DateTime<FixedOffset>,
    ) -> Option<ArchiveFile> {
        let date = parse_exact_date(value, &self.date_format, self.time_zone)?;
        ArchiveFile::new(path, date, &self.date_format, 0).ok()
    }

    fn next_archive_name(
        &self,
        pattern: &ArchivePattern,
        rotation_date: DateTime<FixedOffset>,
        existing: &[ArchiveFile],
    ) -> Result<ArchiveFile, ArchiveError> {
        let rotation_date = rotation_date.with_timezone(&self.time_zone);
        let sequence = next_sequence_for_date(&rotation_date, existing);
        let path = pattern.substitute(&render_date(&rotation_date, &self.date_format));
        ArchiveFile::new(path, rotation_date, &self.date_format, sequence)
    }

    fn archive(
        &self,
        active: &Path,
        _pattern: &ArchivePattern,
        next: &ArchiveFile,
        compressor: Option<&dyn Compressor>,
    ) -> Result<PathBuf, ArchiveError> {
        let destination = next.path();
        match compressor {
            None if destination.is_file() => {
                tracing::info!(
                    "Archive '{}' already exists, appending '{}'",
                    destination.display(),
                    active.display()
                );
                append_archive(active, destination)?;
            }
            _ if destination.exists() => {
                return Err(ArchiveError::ArchiveExists(destination.to_path_buf()));
            }
            _ => move_archive(active, destination, compressor)?,
        }
        Ok(destination.to_path_buf())
    }
}
