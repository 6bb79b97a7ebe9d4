use {
    crate::error::ArchiveError,
    regex::Regex,
    std::path::{Path, PathBuf},
};

/// Wildcard token substituted into the placeholder to build discovery masks.
pub const WILDCARD: &str = "*";

/// An archive path pattern such as `./logs/app.{###}.log`.
///
/// The file name component contains at most one placeholder made of `{`,
/// one or more `#` and `}`. The number of `#` characters is the minimum
/// zero-padded width of numbers substituted into the placeholder. A file
/// name without placeholder gets `.{#}` inserted before its extension, so
/// `./logs/trace.log` archives to `trace.0.log`, `trace.1.log`, ...
/// Apart from that the pattern is opaque: it is only ever used to substitute
/// a value for the placeholder or to build a wildcard mask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivePattern {
    directory: PathBuf,
    prefix: String,
    suffix: String,
    width: usize,
}

impl ArchivePattern {
    /// Parse an archive path pattern.
    /// # Errors
    /// Fails with [`ArchiveError::InvalidPattern`] when the pattern has no
    /// file name, has a malformed or more than one placeholder, or has a
    /// placeholder in its directory component.
    pub fn new<P: AsRef<Path>>(pattern: P) -> Result<Self, ArchiveError> {
        let pattern = pattern.as_ref();
        let raw = pattern.to_string_lossy().to_string();
        let invalid = |reason: &str| ArchiveError::InvalidPattern(raw.clone(), reason.to_string());

        let placeholder = Regex::new(r"\{(#+)\}").map_err(|err| invalid(&err.to_string()))?;
        let file_name = pattern
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| invalid("missing or non UTF-8 file name"))?;

        let directory = pattern
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        if placeholder.is_match(&directory.to_string_lossy()) {
            return Err(invalid("placeholder is only allowed in the file name"));
        }

        let mut captures = placeholder.captures_iter(file_name);
        let Some(token) = captures.next() else {
            return Self::with_inserted_placeholder(directory, file_name)
                .ok_or_else(|| invalid("malformed '{#}' placeholder"));
        };
        if captures.next().is_some() {
            return Err(invalid("more than one placeholder"));
        }

        let (whole, hashes) = match (token.get(0), token.get(1)) {
            (Some(whole), Some(hashes)) => (whole, hashes),
            _ => return Err(invalid("malformed placeholder")),
        };
        Ok(ArchivePattern {
            directory: directory.to_path_buf(),
            prefix: file_name[..whole.start()].to_string(),
            suffix: file_name[whole.end()..].to_string(),
            width: hashes.as_str().len(),
        })
    }

    fn with_inserted_placeholder(directory: &Path, file_name: &str) -> Option<Self> {
        if file_name.contains(|c| c == '{' || c == '}') {
            return None;
        }
        let (stem, extension) = match file_name.rfind('.') {
            Some(dot) if dot > 0 => file_name.split_at(dot),
            _ => (file_name, ""),
        };
        tracing::debug!("No placeholder in '{}', archiving as '{}.{{#}}{}'", file_name, stem, extension);
        Some(ArchivePattern {
            directory: directory.to_path_buf(),
            prefix: format!("{stem}."),
            suffix: extension.to_string(),
            width: 1,
        })
    }

    /// The directory holding every archive of this pattern.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Minimum zero-padded width of substituted numbers.
    pub fn width(&self) -> usize {
        self.width
    }

    /// The file name with `value` in place of the placeholder.
    pub fn file_name_with(&self, value: &str) -> String {
        format!("{}{}{}", self.prefix, value, self.suffix)
    }

    /// The full path with `value` in place of the placeholder.
    pub fn substitute(&self, value: &str) -> PathBuf {
        self.directory.join(self.file_name_with(value))
    }

    /// The full path with a zero-padded `number` in place of the placeholder.
    pub fn substitute_number(&self, number: u32) -> PathBuf {
        self.substitute(&self.pad(number))
    }

    pub fn pad(&self, number: u32) -> String {
        format!("{:0width$}", number, width = self.width)
    }

    /// The file name with [`WILDCARD`] in place of the placeholder.
    pub fn mask(&self) -> String {
        self.file_name_with(WILDCARD)
    }
}

/// Compile a wildcard mask into an anchored regex. Every wildcard becomes a
/// non-empty capture group; everything else matches literally.
pub(crate) fn mask_regex(mask: &str) -> Result<Regex, ArchiveError> {
    let body = mask.split(WILDCARD).map(regex::escape).collect::<Vec<_>>().join("(.+)");
    Regex::new(&format!("^{body}$")).map_err(|err| ArchiveError::InvalidPattern(mask.to_string(), err.to_string()))
}
