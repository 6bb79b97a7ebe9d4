use {
    crate::error::ArchiveError,
    chrono::{
        format::{Item, StrftimeItems},
        DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone as _,
    },
    std::path::{Path, PathBuf},
};

/// One archive file on disk, identified by its path, the point in time it
/// belongs to and its sequence number among archives sharing the same
/// formatted date.
///
/// An `ArchiveFile` never owns the underlying file. It is built either while
/// discovering existing archives or when computing the name of the archive
/// about to be created, and it is never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveFile {
    path: PathBuf,
    date: DateTime<FixedOffset>,
    date_format: String,
    formatted_date: String,
    /// `date` truncated to the granularity of `date_format`.
    period: DateTime<FixedOffset>,
    sequence: u32,
}

impl ArchiveFile {
    /// Create a new archive descriptor.
    /// # Arguments
    /// * `path` - The path of the archive file.
    /// * `date` - The point in time the archive corresponds to.
    /// * `date_format` - A chrono strftime format used to render `date`.
    /// * `sequence` - Disambiguates archives sharing the same formatted date.
    /// # Errors
    /// Fails with [`ArchiveError::InvalidArgument`] when `path` is empty or
    /// `date_format` is empty or not a valid strftime format.
    pub fn new<P: AsRef<Path>>(
        path: P,
        date: DateTime<FixedOffset>,
        date_format: &str,
        sequence: u32,
    ) -> Result<Self, ArchiveError> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(ArchiveError::InvalidArgument(
                "archive file name must not be empty".to_string(),
            ));
        }
        validate_date_format(date_format)?;

        let formatted_date = render_date(&date, date_format);
        let period = parse_date(&formatted_date, date_format, *date.offset()).unwrap_or(date);
        Ok(ArchiveFile {
            path: path.to_path_buf(),
            date,
            date_format: date_format.to_string(),
            formatted_date,
            period,
            sequence,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn date(&self) -> DateTime<FixedOffset> {
        self.date
    }

    pub fn date_format(&self) -> &str {
        &self.date_format
    }

    /// The archive date rendered through its date format.
    pub fn formatted_date(&self) -> &str {
        &self.formatted_date
    }

    /// The archive date truncated to the granularity of the date format, e.g.
    /// midnight for `%Y%m%d`. Used to order archives without letting
    /// sub-format differences win over the sequence number.
    pub fn period(&self) -> DateTime<FixedOffset> {
        self.period
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    /// Check whether `date`, rendered through this archive's date format in
    /// this archive's offset, equals the cached formatted date.
    pub fn has_same_formatted_date(&self, date: &DateTime<FixedOffset>) -> bool {
        render_date(&date.with_timezone(self.date.offset()), &self.date_format) == self.formatted_date
    }
}

/// Validate a chrono strftime format.
pub fn validate_date_format(date_format: &str) -> Result<(), ArchiveError> {
    if date_format.is_empty() {
        return Err(ArchiveError::InvalidArgument(
            "date format must not be empty".to_string(),
        ));
    }
    if StrftimeItems::new(date_format).any(|item| matches!(item, Item::Error)) {
        return Err(ArchiveError::InvalidArgument(format!(
            "invalid date format '{date_format}'"
        )));
    }
    Ok(())
}

/// Render `date` through a format that has already been validated.
pub(crate) fn render_date(date: &DateTime<FixedOffset>, date_format: &str) -> String {
    date.format(date_format).to_string()
}

/// Parse a date rendered through `date_format` back into a point in time.
///
/// Fields the format does not carry are filled with their lowest value:
/// date-only formats parse to midnight, hour formats to the full hour and
/// month formats to the first day of the month.
pub(crate) fn parse_date(text: &str, date_format: &str, offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    let midnight = |date: NaiveDate| date.and_hms_opt(0, 0, 0);
    let naive = NaiveDateTime::parse_from_str(text, date_format)
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(&format!("{text}00"), &format!("{date_format}%M")).ok())
        .or_else(|| NaiveDate::parse_from_str(text, date_format).ok().and_then(midnight))
        .or_else(|| {
            NaiveDate::parse_from_str(&format!("{text}01"), &format!("{date_format}%d"))
                .ok()
                .and_then(midnight)
        })?;
    offset.from_local_datetime(&naive).single()
}

/// Parse a date only when `date_format` renders it back to exactly `text`.
///
/// Names this format would never produce, such as `2024015` for `%Y%m%d`,
/// are rejected instead of being read as another archive's date.
pub(crate) fn parse_exact_date(text: &str, date_format: &str, offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    parse_date(text, date_format, offset).filter(|date| render_date(date, date_format) == text)
}
