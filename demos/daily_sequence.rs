use {
    chrono::{Duration, Utc},
    logarchiver::{ArchiveNumbering, ArchiverBuilder, TimeZone},
    std::{fs, io::Write},
    tracing_subscriber::util::SubscriberInitExt,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_target(false)
        .finish()
        .try_init()?;

    let archiver = ArchiverBuilder::new("./logs/daily/app.{#}.log")
        .numbering(ArchiveNumbering::DateAndSequence)
        .date_format("%Y-%m-%d")
        .time_zone(TimeZone::UTC) // Use UTC for consistent archive names across regions
        .max_archive_files(10)
        .max_archive_days(7) // Keep one week of logs
        .file_mode(0o640)
        .build()?;

    // Drop archives that aged out while the application was down.
    for deleted in archiver.cleanup_on_file_open("./logs/app.log")? {
        tracing::info!("Removed stale archive {}", deleted.display());
    }

    // Simulate two weeks of rotations, three per day.
    fs::create_dir_all("./logs")?;
    let start = Utc::now().fixed_offset() - Duration::days(14);
    for day in 0..14 {
        for hour in [6, 12, 18] {
            let mut active = fs::File::create("./logs/app.log")?;
            writeln!(active, "Day {day}, hour {hour}")?;
            drop(active);

            let rotation_date = start + Duration::days(day) + Duration::hours(hour);
            archiver.archive_at("./logs/app.log", rotation_date)?;
        }
    }

    tracing::info!("Archives matching '{}':", archiver.discovery_mask());
    for archive in archiver.discover()? {
        tracing::info!("  {}", archive.path().display());
    }
    Ok(())
}
