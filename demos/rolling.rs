use {
    logarchiver::{ArchiveNumbering, ArchiverBuilder, Compression, TimeZone},
    std::{fs, io::Write},
    tracing_subscriber::util::SubscriberInitExt,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_target(false)
        .finish()
        .try_init()?;

    let archiver = ArchiverBuilder::new("./logs/archive/rolling.{##}.log.gz")
        .numbering(ArchiveNumbering::Rolling(3)) // Keep rolling.00.log.gz to rolling.02.log.gz
        .time_zone(TimeZone::UTC)
        .compression(Compression::Gzip) // Only the newest slot is compressed, older slots are renamed
        .build()?;

    fs::create_dir_all("./logs")?;
    for rotation in 0..5 {
        let mut active = fs::File::create("./logs/rolling.log")?;
        writeln!(active, "Log lines of rotation {rotation}")?;
        drop(active);

        if let Some(archive) = archiver.archive("./logs/rolling.log")? {
            tracing::info!("Rotation {} archived into {}", rotation, archive.display());
        }
    }

    for archive in archiver.discover()? {
        tracing::info!("Slot {} holds {}", archive.sequence(), archive.path().display());
    }
    Ok(())
}
