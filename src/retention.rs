use {
    crate::archive_file::ArchiveFile,
    chrono::{DateTime, Duration, FixedOffset},
};

/// Count and age limits for archive cleanup.
///
/// A limit of zero or below means "unlimited" for that dimension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetentionPolicy {
    max_files: i32,
    max_days: i32,
}

impl RetentionPolicy {
    pub fn new(max_files: i32, max_days: i32) -> Self {
        RetentionPolicy { max_files, max_days }
    }

    pub fn max_files(&self) -> i32 {
        self.max_files
    }

    pub fn max_days(&self) -> i32 {
        self.max_days
    }

    pub fn is_count_limited(&self) -> bool {
        self.max_files > 0
    }

    pub fn is_age_limited(&self) -> bool {
        self.max_days > 0
    }

    pub fn is_unlimited(&self) -> bool {
        !self.is_count_limited() && !self.is_age_limited()
    }

    /// Select the archives that exceed this policy.
    ///
    /// `archives` must be ordered oldest first. Ranking newest first, every
    /// archive at rank `max_files` or beyond is selected, as is every archive
    /// dated before `now - max_days`. The newest archive is never selected by
    /// the age rule alone. The result is ordered oldest first and contains
    /// each archive at most once.
    pub fn select(&self, archives: &[ArchiveFile], now: DateTime<FixedOffset>) -> Vec<ArchiveFile> {
        if self.is_unlimited() || archives.is_empty() {
            return Vec::new();
        }

        // A cutoff before the representable range means nothing is old enough.
        let cutoff = self
            .is_age_limited()
            .then(|| Duration::try_days(i64::from(self.max_days)))
            .flatten()
            .and_then(|max_age| now.checked_sub_signed(max_age));

        let mut selected = archives
            .iter()
            .rev()
            .enumerate()
            .filter(|(rank, archive)| {
                let over_count = self.is_count_limited() && *rank >= self.max_files as usize;
                let over_age = *rank > 0 && cutoff.is_some_and(|cutoff| archive.date() < cutoff);
                over_count || over_age
            })
            .map(|(_, archive)| archive.clone())
            .collect::<Vec<_>>();
        selected.reverse();
        selected
    }
}
