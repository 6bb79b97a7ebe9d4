use {
    super::{next_sequence_for_date, parse_padded_sequence, ArchiveStrategy},
    crate::{
        archive_file::{parse_exact_date, render_date, validate_date_format, ArchiveFile},
        error::ArchiveError,
        pattern::ArchivePattern,
    },
    chrono::{DateTime, FixedOffset},
    std::path::Path,
};

/// Names archives after the rotation date and a per-date sequence:
/// `app.20240105.0.log`, `app.20240105.1.log`, `app.20240106.0.log`.
///
/// The sequence restarts at 0 for every new formatted date, so any number of
/// rotations per date period get distinct names.
#[derive(Debug, Clone)]
pub struct DateAndSequenceStrategy {
    date_format: String,
    time_zone: FixedOffset,
}

impl DateAndSequenceStrategy {
    pub fn new(date_format: &str, time_zone: FixedOffset) -> Result<Self, ArchiveError> {
        validate_date_format(date_format)?;
        Ok(DateAndSequenceStrategy {
            date_format: date_format.to_string(),
            time_zone,
        })
    }
}

impl ArchiveStrategy for DateAndSequenceStrategy {
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
        _modified: DateTime<FixedOffset>,
    ) -> Option<ArchiveFile> {
        // The date format may itself contain dots, the sequence never does.
        let (date, sequence) = value.rsplit_once('.')?;
        let sequence = parse_padded_sequence(pattern, sequence)?;
        let date = parse_exact_date(date, &self.date_format, self.time_zone)?;
        ArchiveFile::new(path, date, &self.date_format, sequence).ok()
    }

    fn next_archive_name(
        &self,
        pattern: &ArchivePattern,
        rotation_date: DateTime<FixedOffset>,
        existing: &[ArchiveFile],
    ) -> Result<ArchiveFile, ArchiveError> {
        let rotation_date = rotation_date.with_timezone(&self.time_zone);
        let sequence = next_sequence_for_date(&rotation_date, existing);
        let value = format!(
            "{}.{}",
            render_date(&rotation_date, &self.date_format),
            pattern.pad(sequence)
        );
        ArchiveFile::new(pattern.substitute(&value), rotation_date, &self.date_format, sequence)
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        chrono::TimeZone,
        std::fs,
    };

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn strategy() -> DateAndSequenceStrategy {
        DateAndSequenceStrategy::new("%Y%m%d", utc()).unwrap()
    }

    #[test]
    fn sequence_continues_within_the_same_date() {
        let dir = tempfile::tempdir().unwrap();
        for seq in 0..3 {
            fs::write(dir.path().join(format!("app.20240105.{seq}.log")), "x").unwrap();
        }
        let pattern = ArchivePattern::new(dir.path().join("app.{#}.log")).unwrap();
        let existing = strategy().discover_existing_archives(&pattern).unwrap();

        let rotation = utc().with_ymd_and_hms(2024, 1, 5, 20, 0, 0).unwrap();
        let next = strategy().next_archive_name(&pattern, rotation, &existing).unwrap();

        assert_eq!(next.sequence(), 3);
        assert_eq!(next.path(), dir.path().join("app.20240105.3.log"));
    }

    #[test]
    fn sequence_restarts_on_a_new_date() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("app.20240105.4.log"), "x").unwrap();
        let pattern = ArchivePattern::new(dir.path().join("app.{#}.log")).unwrap();
        let existing = strategy().discover_existing_archives(&pattern).unwrap();

        let rotation = utc().with_ymd_and_hms(2024, 1, 6, 0, 5, 0).unwrap();
        let next = strategy().next_archive_name(&pattern, rotation, &existing).unwrap();
        assert_eq!(next.sequence(), 0);
        assert_eq!(next.path(), dir.path().join("app.20240106.0.log"));

        let first = strategy().next_archive_name(&pattern, rotation, &[]).unwrap();
        assert_eq!(first.sequence(), 0);
    }

    #[test]
    fn pads_sequence_to_placeholder_width() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = ArchivePattern::new(dir.path().join("app_{###}.log")).unwrap();
        let rotation = utc().with_ymd_and_hms(2024, 7, 1, 9, 0, 0).unwrap();

        let next = strategy().next_archive_name(&pattern, rotation, &[]).unwrap();

        assert_eq!(next.path(), dir.path().join("app_20240701.000.log"));
    }

    #[test]
    fn orders_by_date_then_sequence() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "app.20240106.0.log",
            "app.20240105.10.log",
            "app.20240105.2.log",
            "app.20240105.log",
            "app.garbage.1.log",
        ] {
            fs::write(dir.path().join(name), name).unwrap();
        }
        let pattern = ArchivePattern::new(dir.path().join("app.{#}.log")).unwrap();

        let archives = strategy().discover_existing_archives(&pattern).unwrap();

        let names = archives
            .iter()
            .map(|a| a.path().file_name().unwrap().to_string_lossy().to_string())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["app.20240105.2.log", "app.20240105.10.log", "app.20240106.0.log"]);
    }

    #[test]
    fn dotted_date_formats_parse() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("app.2024.01.05.7.log"), "x").unwrap();
        let pattern = ArchivePattern::new(dir.path().join("app.{#}.log")).unwrap();
        let strategy = DateAndSequenceStrategy::new("%Y.%m.%d", utc()).unwrap();

        let archives = strategy.discover_existing_archives(&pattern).unwrap();

        assert_eq!(archives.len(), 1);
        assert_eq!(archives[0].formatted_date(), "2024.01.05");
        assert_eq!(archives[0].sequence(), 7);
    }

    #[test]
    fn non_canonical_names_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["app.20240105.1.log", "app.20240105.01.log", "app.2024015.1.log"] {
            fs::write(dir.path().join(name), "x").unwrap();
        }
        let pattern = ArchivePattern::new(dir.path().join("app.{#}.log")).unwrap();

        let archives = strategy().discover_existing_archives(&pattern).unwrap();

        assert_eq!(archives.len(), 1);
        assert_eq!(archives[0].path(), dir.path().join("app.20240105.1.log"));
    }
}
