use {
    super::{move_archive, parse_padded_sequence, remove_archive, ArchiveStrategy},
    crate::{
        archive_file::{validate_date_format, ArchiveFile},
        compression::Compressor,
        error::ArchiveError,
        pattern::ArchivePattern,
    },
    chrono::{DateTime, FixedOffset},
    std::{
        cmp::Ordering,
        path::{Path, PathBuf},
    },
};

/// Keeps the newest archive in slot 0 and shifts every older archive one
/// slot up on each rotation: `app.0.log` is always the latest archive,
/// `app.1.log` the one before, and so on.
///
/// With a capacity above zero the archive that would be shifted to slot
/// `capacity` is deleted instead, which bounds the number of archives on its
/// own. Count and age based cleanup is then disabled.
#[derive(Debug, Clone)]
pub struct RollingStrategy {
    capacity: i32,
    date_format: String,
    time_zone: FixedOffset,
}

/// One rename of a roll forward chain.
struct Shift {
    from: PathBuf,
    to: PathBuf,
    slot: u32,
}

impl RollingStrategy {
    /// Create a rolling strategy keeping at most `capacity` archives, or an
    /// unbounded number when `capacity <= 0`.
    pub fn new(capacity: i32, date_format: &str, time_zone: FixedOffset) -> Result<Self, ArchiveError> {
        validate_date_format(date_format)?;
        Ok(RollingStrategy {
            capacity,
            date_format: date_format.to_string(),
            time_zone,
        })
    }

    pub fn capacity(&self) -> i32 {
        self.capacity
    }

    fn is_beyond_capacity(&self, slot: u32) -> bool {
        self.capacity > 0 && i64::from(slot) >= i64::from(self.capacity)
    }

    /// Move `file_name` into slot `archive_number`, first shifting whatever
    /// occupies that slot (and the slots after it) one slot further.
    ///
    /// The chain of occupied slots is collected first and then executed
    /// from the deepest slot back to `archive_number`, so no rename ever
    /// lands on an occupied slot. A file reaching the capacity is deleted.
    /// Only the move into slot 0 is compressed, since that is the one
    /// closing the active log file.
    ///
    /// A failure leaves the chain partially shifted; the next rotation
    /// rediscovers the slots from disk and continues from there.
    pub fn roll_forward(
        &self,
        file_name: &Path,
        pattern: &ArchivePattern,
        archive_number: u32,
        compressor: Option<&dyn Compressor>,
    ) -> Result<(), ArchiveError> {
        let mut shifts = Vec::new();
        let mut evicted = None;
        let mut from = file_name.to_path_buf();
        let mut slot = archive_number;

        loop {
            if self.is_beyond_capacity(slot) {
                evicted = Some(from);
                break;
            }
            if !from.exists() {
                break;
            }
            let to = pattern.substitute_number(slot);
            let occupied = to.exists();
            shifts.push(Shift {
                from,
                to: to.clone(),
                slot,
            });
            if !occupied {
                break;
            }
            from = to;
            slot = match slot.checked_add(1) {
                Some(next) => next,
                None => break,
            };
        }

        if let Some(path) = evicted {
            tracing::debug!("Deleting '{}' as it rolled past capacity {}", path.display(), self.capacity);
            remove_archive(&path)?;
        }

        for shift in shifts.into_iter().rev() {
            tracing::trace!("Renaming {} to {}", shift.from.display(), shift.to.display());
            let shift_compressor = if shift.slot == 0 { compressor } else { None };
            move_archive(&shift.from, &shift.to, shift_compressor)?;
        }
        Ok(())
    }
}

impl ArchiveStrategy for RollingStrategy {
    fn date_format(&self) -> &str {
        &self.date_format
    }

    fn time_zone(&self) -> FixedOffset {
        self.time_zone
    }

    fn is_cleanup_enabled(&self) -> bool {
        self.capacity <= 0
    }

    fn parse_archive(
        &self,
        pattern: &ArchivePattern,
        path: &Path,
        value: &str,
        modified: DateTime<FixedOffset>,
    ) -> Option<ArchiveFile> {
        let slot = parse_padded_sequence(pattern, value)?;
        ArchiveFile::new(path, modified, &self.date_format, slot).ok()
    }

    /// A higher slot is an older archive, whatever the file times say.
    fn compare(&self, a: &ArchiveFile, b: &ArchiveFile) -> Ordering {
        b.sequence()
            .cmp(&a.sequence())
            .then_with(|| a.path().cmp(b.path()))
    }

    /// The next archive always goes to slot 0.
    fn next_archive_name(
        &self,
        pattern: &ArchivePattern,
        rotation_date: DateTime<FixedOffset>,
        _existing: &[ArchiveFile],
    ) -> Result<ArchiveFile, ArchiveError> {
        ArchiveFile::new(pattern.substitute_number(0), rotation_date, &self.date_format, 0)
    }

    fn archive(
        &self,
        active: &Path,
        pattern: &ArchivePattern,
        next: &ArchiveFile,
        compressor: Option<&dyn Compressor>,
    ) -> Result<PathBuf, ArchiveError> {
        self.roll_forward(active, pattern, next.sequence(), compressor)?;
        Ok(next.path().to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::compression::Compression,
        chrono::Utc,
        flate2::read::GzDecoder,
        std::{fs, io::Read as _},
    };

    fn strategy(capacity: i32) -> RollingStrategy {
        RollingStrategy::new(capacity, "%Y%m%d", FixedOffset::east_opt(0).unwrap()).unwrap()
    }

    fn rotate(strategy: &RollingStrategy, active: &Path, pattern: &ArchivePattern, content: &str) {
        fs::write(active, content).unwrap();
        let next = strategy
            .next_archive_name(pattern, Utc::now().fixed_offset(), &[])
            .unwrap();
        strategy.archive(active, pattern, &next, None).unwrap();
    }

    fn slot(pattern: &ArchivePattern, n: u32) -> Option<String> {
        fs::read_to_string(pattern.substitute_number(n)).ok()
    }

    #[test]
    fn rotations_shift_archives_up_to_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let active = dir.path().join("app.log");
        let pattern = ArchivePattern::new(dir.path().join("app.{#}.log")).unwrap();
        let strategy = strategy(3);

        rotate(&strategy, &active, &pattern, "first");
        assert_eq!(slot(&pattern, 0).as_deref(), Some("first"));

        rotate(&strategy, &active, &pattern, "second");
        rotate(&strategy, &active, &pattern, "third");
        assert_eq!(slot(&pattern, 0).as_deref(), Some("third"));
        assert_eq!(slot(&pattern, 1).as_deref(), Some("second"));
        assert_eq!(slot(&pattern, 2).as_deref(), Some("first"));
        assert!(!active.exists());

        rotate(&strategy, &active, &pattern, "fourth");
        assert_eq!(slot(&pattern, 0).as_deref(), Some("fourth"));
        assert_eq!(slot(&pattern, 1).as_deref(), Some("third"));
        assert_eq!(slot(&pattern, 2).as_deref(), Some("second"));
        assert_eq!(slot(&pattern, 3), None);
    }

    #[test]
    fn unbounded_capacity_keeps_every_archive() {
        let dir = tempfile::tempdir().unwrap();
        let active = dir.path().join("app.log");
        let pattern = ArchivePattern::new(dir.path().join("app.{##}.log")).unwrap();
        let strategy = strategy(0);

        for n in 0..5 {
            rotate(&strategy, &active, &pattern, &format!("rotation {n}"));
        }

        for k in 0..5 {
            assert_eq!(slot(&pattern, k), Some(format!("rotation {}", 4 - k)));
        }
        assert!(strategy.is_cleanup_enabled());
    }

    #[test]
    fn shift_stops_at_first_free_slot() {
        let dir = tempfile::tempdir().unwrap();
        let active = dir.path().join("app.log");
        let pattern = ArchivePattern::new(dir.path().join("app.{#}.log")).unwrap();
        fs::write(pattern.substitute_number(0), "zero").unwrap();
        fs::write(pattern.substitute_number(2), "two").unwrap();

        rotate(&strategy(5), &active, &pattern, "new");

        assert_eq!(slot(&pattern, 0).as_deref(), Some("new"));
        assert_eq!(slot(&pattern, 1).as_deref(), Some("zero"));
        assert_eq!(slot(&pattern, 2).as_deref(), Some("two"));
        assert_eq!(slot(&pattern, 3), None);
    }

    #[test]
    fn missing_active_file_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = ArchivePattern::new(dir.path().join("app.{#}.log")).unwrap();
        fs::write(pattern.substitute_number(0), "zero").unwrap();

        strategy(3)
            .roll_forward(&dir.path().join("app.log"), &pattern, 0, None)
            .unwrap();

        assert_eq!(slot(&pattern, 0).as_deref(), Some("zero"));
        assert_eq!(slot(&pattern, 1), None);
    }

    #[test]
    fn compresses_only_into_slot_zero() {
        let dir = tempfile::tempdir().unwrap();
        let active = dir.path().join("app.log");
        let pattern = ArchivePattern::new(dir.path().join("app.{#}.log.gz")).unwrap();
        let strategy = strategy(2);

        for content in ["older", "newer"] {
            fs::write(&active, content).unwrap();
            strategy
                .roll_forward(&active, &pattern, 0, Some(&Compression::Gzip))
                .unwrap();
        }

        let decode = |n: u32| {
            let mut out = String::new();
            GzDecoder::new(fs::File::open(pattern.substitute_number(n)).unwrap())
                .read_to_string(&mut out)
                .unwrap();
            out
        };
        assert_eq!(decode(0), "newer");
        assert_eq!(decode(1), "older");
        assert!(!active.exists());
    }

    #[test]
    fn creates_missing_archive_directory() {
        let dir = tempfile::tempdir().unwrap();
        let active = dir.path().join("app.log");
        let pattern = ArchivePattern::new(dir.path().join("archive").join("app.{#}.log")).unwrap();

        rotate(&strategy(3), &active, &pattern, "content");

        assert_eq!(slot(&pattern, 0).as_deref(), Some("content"));
    }

    #[test]
    fn orders_higher_slots_as_older() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = ArchivePattern::new(dir.path().join("app.{#}.log")).unwrap();
        for n in [0, 1, 2] {
            fs::write(pattern.substitute_number(n), n.to_string()).unwrap();
        }
        let strategy = strategy(0);

        let archives = strategy.discover_existing_archives(&pattern).unwrap();
        assert_eq!(archives.iter().map(|a| a.sequence()).collect::<Vec<_>>(), vec![2, 1, 0]);

        let doomed = strategy.select_for_cleanup(&pattern, &archives, 1, 0);
        assert_eq!(doomed.iter().map(|a| a.sequence()).collect::<Vec<_>>(), vec![2, 1]);
    }

    #[test]
    fn capacity_disables_cleanup() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = ArchivePattern::new(dir.path().join("app.{#}.log")).unwrap();
        assert!(!strategy(3).is_cleanup_enabled());
        assert!(!strategy(3).should_cleanup_on_file_open(&pattern, 5, 7));
        assert!(strategy(0).should_cleanup_on_file_open(&pattern, 5, 0));
        assert!(!strategy(0).should_cleanup_on_file_open(&pattern, 0, 0));
    }
}
