use std::env;
use std::path::PathBuf;

use library::Library;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: import_scan <db_path> <root>... (or INDEX_PATH / MUSIC_ROOT)";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut args = env::args().skip(1);
    let index_path = args
        .next()
        .or_else(|| env::var("INDEX_PATH").ok())
        .unwrap_or_else(|| "data/library.db".to_string());
    let mut roots: Vec<PathBuf> = args.map(PathBuf::from).collect();
    if roots.is_empty() {
        let root = env::var("MUSIC_ROOT").map_err(|_| USAGE)?;
        roots.push(PathBuf::from(root));
    }

    let library = Library::open(&PathBuf::from(&index_path))?;
    library.initialize()?;
    for root in roots {
        library.add_library_path(root);
    }

    let report = library.scan();
    let stats = library.stats()?;
    library.close();

    println!(
        "Scanned {} files ({} ingested, {} failed)",
        report.files_seen, report.ingested, report.failed
    );
    println!(
        "Catalog: {} artists, {} albums, {} tracks",
        stats.artists, stats.albums, stats.tracks
    );

    Ok(())
}
