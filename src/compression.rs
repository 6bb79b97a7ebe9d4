use {
    crate::error::ArchiveError,
    flate2::write::GzEncoder,
    std::{
        fmt::Debug,
        fs,
        io::{self, Write as _},
        path::Path,
    },
};

/// Produces a compressed archive from a closed log file.
///
/// Compression replaces the plain rename of a freshly closed log file into
/// its first archive slot. Implementations must only write `destination`;
/// the source file is removed by the caller once `compress` succeeded.
pub trait Compressor: Debug + Send + Sync {
    fn compress(&self, source: &Path, destination: &Path) -> Result<(), ArchiveError>;
}

/// Specifies the compression algorithm to use for archived log files.
///
/// The archive path pattern decides the archive file name, so include the
/// matching [`Compression::extension`] in the pattern (e.g.
/// `app.{#}.log.gz`) to keep names meaningful.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compression {
    /// Gzip compression, which provides a good balance of compression ratio
    /// and speed.
    Gzip,
    /// XZ compression, slower than Gzip with a better ratio. Requires the
    /// `xz` feature.
    #[cfg(feature = "xz")]
    XZ,
}

impl Compression {
    /// Get the conventional extension for the compressed archive.
    pub fn extension(&self) -> &'static str {
        match self {
            Compression::Gzip => "gz",
            #[cfg(feature = "xz")]
            Compression::XZ => "xz",
        }
    }

    fn encode(&self, source: &Path, destination: &Path) -> io::Result<()> {
        let infile = fs::File::open(source)?;
        let mut reader = io::BufReader::new(infile);

        let outfile = fs::File::create(destination)?;
        let writer = io::BufWriter::new(outfile);

        match self {
            Compression::Gzip => {
                let mut encoder = GzEncoder::new(writer, flate2::Compression::default());
                io::copy(&mut reader, &mut encoder)?;
                encoder.finish()?.flush()?;
            }
            #[cfg(feature = "xz")]
            Compression::XZ => {
                let mut writer = writer;
                lzma_rs::xz_compress(&mut reader, &mut writer)?;
                writer.flush()?;
            }
        }
        Ok(())
    }
}

impl Compressor for Compression {
    fn compress(&self, source: &Path, destination: &Path) -> Result<(), ArchiveError> {
        self.encode(source, destination).map_err(|err| {
            // Leave no truncated archive behind.
            if let Err(cleanup_err) = fs::remove_file(destination) {
                if cleanup_err.kind() != io::ErrorKind::NotFound {
                    tracing::warn!(
                        "Failed to remove partial archive '{}': {}",
                        destination.display(),
                        cleanup_err
                    );
                }
            }
            ArchiveError::CompressFileError {
                from: source.to_path_buf(),
                to: destination.to_path_buf(),
                error: err.to_string(),
            }
        })
    }
}
