mod archive;
mod error;
mod ingest;
mod resolver;
mod scan;
mod search;
mod store;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use common::{LibraryStats, SearchResult};
use metadata::{LoftyTagReader, TagReader};
use parking_lot::RwLock;
use tracing::warn;

pub use archive::ArchiveSummary;
pub use error::LibraryError;
pub use ingest::IngestedIds;
pub use resolver::IdentityResolver;
pub use scan::ScanReport;
pub use store::{CatalogStore, NewTrack};

/// The media catalog: a SQLite store plus the library roots it indexes.
///
/// Cloning is cheap and every clone shares the same store handle, so closing or
/// truncating through one clone affects all of them.
#[derive(Clone)]
pub struct Library {
    store: CatalogStore,
    paths: Arc<RwLock<Vec<PathBuf>>>,
    tags: Arc<dyn TagReader>,
}

impl Library {
    pub fn open(db_path: &Path) -> Result<Self, LibraryError> {
        Self::open_with_reader(db_path, Arc::new(LoftyTagReader))
    }

    pub fn open_with_reader(
        db_path: &Path,
        tags: Arc<dyn TagReader>,
    ) -> Result<Self, LibraryError> {
        let store = CatalogStore::open(db_path)?;
        Ok(Self {
            store,
            paths: Arc::new(RwLock::new(Vec::new())),
            tags,
        })
    }

    pub fn initialize(&self) -> Result<(), LibraryError> {
        self.store.initialize()
    }

    pub fn add_library_path(&self, path: impl Into<PathBuf>) {
        self.paths.write().push(path.into());
    }

    pub fn library_paths(&self) -> Vec<PathBuf> {
        self.paths.read().clone()
    }

    pub fn scan(&self) -> ScanReport {
        let roots = self.library_paths();
        scan::scan_roots(&roots, |path| self.add_media(path))
    }

    pub fn add_media(&self, path: &Path) -> Result<IngestedIds, LibraryError> {
        ingest::add_media(&self.store, self.tags.as_ref(), path)
    }

    pub fn search(&self, term: &str) -> Vec<SearchResult> {
        search::search(&self.store, term)
    }

    pub fn get_file_path(&self, track_id: i64) -> Option<PathBuf> {
        match self.store.track(track_id) {
            Ok(track) => track.map(|track| track.fs_path),
            Err(err) => {
                warn!("Failed to look up file for track {}: {}", track_id, err);
                None
            }
        }
    }

    pub fn get_album_files(&self, album_id: i64) -> Vec<SearchResult> {
        match archive::album_files(&self.store, album_id) {
            Ok(tracks) => tracks,
            Err(err) => {
                warn!("Failed to list files for album {}: {}", album_id, err);
                Vec::new()
            }
        }
    }

    pub fn build_album_archive<W: Write>(
        &self,
        album_id: i64,
        sink: &mut W,
    ) -> Result<ArchiveSummary, LibraryError> {
        archive::build_album_archive(&self.store, album_id, sink)
    }

    /// Like [`Library::build_album_archive`], but hands back the staged zip
    /// (rewound) instead of copying it.
    pub fn stage_album_archive(
        &self,
        album_id: i64,
    ) -> Result<(ArchiveSummary, File), LibraryError> {
        archive::stage_album_archive(&self.store, album_id)
    }

    pub fn stats(&self) -> Result<LibraryStats, LibraryError> {
        self.store.stats()
    }

    pub fn close(&self) {
        self.store.close();
    }

    pub fn truncate(&self) -> Result<(), LibraryError> {
        self.store.truncate()
    }

    pub fn db_path(&self) -> &Path {
        self.store.path()
    }

    pub fn store(&self) -> &CatalogStore {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::{test_library, write_media};
    use crate::LibraryError;

    #[test]
    fn unknown_track_has_no_path() {
        let (_dir, library) = test_library();
        assert_eq!(library.get_file_path(12345), None);
    }

    #[test]
    fn truncate_invalidates_every_clone() {
        let (dir, library) = test_library();
        let path = write_media(dir.path(), "a.mp3", "One", "Nova", "Dawn", 1);
        let ids = library.add_media(&path).unwrap();
        let other = library.clone();

        library.truncate().unwrap();
        assert!(!library.db_path().exists());
        assert!(matches!(other.stats(), Err(LibraryError::Closed)));
        assert_eq!(other.get_file_path(ids.track_id), None);
        assert!(other.get_album_files(ids.album_id).is_empty());
        assert!(other.search("One").is_empty());
    }

    #[test]
    fn library_paths_keep_insertion_order() {
        let (_dir, library) = test_library();
        library.add_library_path("/music/a");
        library.add_library_path("/music/b");
        let paths = library.library_paths();
        assert_eq!(paths.len(), 2);
        assert!(paths[0].ends_with("a"));
        assert!(paths[1].ends_with("b"));
    }
}
