use {
    super::{parse_padded_sequence, ArchiveStrategy},
    crate::{
        archive_file::{validate_date_format, ArchiveFile},
        error::ArchiveError,
        pattern::ArchivePattern,
    },
    chrono::{DateTime, FixedOffset},
    std::path::Path,
};

/// Numbers archives with an ever increasing sequence: `app.0.log`,
/// `app.1.log`, ... The newest archive carries the highest number.
///
/// Archive dates come from the file modification time since the name holds
/// no date.
#[derive(Debug, Clone)]
pub struct SequenceStrategy {
    date_format: String,
    time_zone: FixedOffset,
}

impl SequenceStrategy {
    pub fn new(date_format: &str, time_zone: FixedOffset) -> Result<Self, ArchiveError> {
        validate_date_format(date_format)?;
        Ok(SequenceStrategy {
            date_format: date_format.to_string(),
            time_zone,
        })
    }
}

impl ArchiveStrategy for SequenceStrategy {
    fn date_format(&self) -> &str {
        &self.date_format
    }

    fn time_zone(&self) -> FixedOffset {
        self.time_zone
    }

    fn parse_archive(
        &self,
        pattern: &ArchivePattern,
        path: &Path,
        value: &str,
        modified: DateTime<FixedOffset>,
    ) -> Option<ArchiveFile> {
        let sequence = parse_padded_sequence(pattern, value)?;
        ArchiveFile::new(path, modified, &self.date_format, sequence).ok()
    }

    /// Sequence numbers are shared by all archives regardless of their date,
    /// so the next number follows the highest one on disk.
    fn next_archive_name(
        &self,
        pattern: &ArchivePattern,
        rotation_date: DateTime<FixedOffset>,
        existing: &[ArchiveFile],
    ) -> Result<ArchiveFile, ArchiveError> {
        let sequence = existing
            .iter()
            .map(|archive| archive.sequence().saturating_add(1))
            .max()
            .unwrap_or(0);
        ArchiveFile::new(
            pattern.substitute_number(sequence),
            rotation_date,
            &self.date_format,
            sequence,
        )
    }
}
