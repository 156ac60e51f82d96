use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::{Album, LibraryStats, Track};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::error::LibraryError;

const SCHEMA: &str = include_str!("../sql/library_schema.sql");
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to the SQLite catalog file. Clones share one connection; closing any
/// clone closes them all.
#[derive(Clone)]
pub struct CatalogStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    path: PathBuf,
    initialized: AtomicBool,
    conn: Mutex<Option<Connection>>,
}

#[derive(Clone, Debug)]
pub struct NewTrack<'a> {
    pub name: &'a str,
    pub artist_id: i64,
    pub album_id: i64,
    pub fs_path: &'a Path,
    pub number: i64,
}

impl CatalogStore {
    pub fn open(path: &Path) -> Result<Self, LibraryError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|err| {
                    LibraryError::StorageUnavailable(format!("{}: {}", parent.display(), err))
                })?;
            }
        }

        // SQLite creates the file on open, so presence has to be sampled first.
        let existed = path.exists();
        let conn = Connection::open(path).map_err(|err| {
            LibraryError::StorageUnavailable(format!("{}: {}", path.display(), err))
        })?;
        conn.busy_timeout(BUSY_TIMEOUT)
            .and_then(|_| conn.pragma_update(None, "foreign_keys", "ON"))
            .map_err(|err| {
                LibraryError::StorageUnavailable(format!("{}: {}", path.display(), err))
            })?;

        debug!("Opened catalog {:?} (existing: {})", path, existed);
        Ok(Self {
            inner: Arc::new(StoreInner {
                path: path.to_path_buf(),
                initialized: AtomicBool::new(existed),
                conn: Mutex::new(Some(conn)),
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Creates the schema unless the catalog file was already present when opened.
    /// An existing file is trusted as-is, even if it is empty.
    pub fn initialize(&self) -> Result<(), LibraryError> {
        if self.inner.initialized.load(Ordering::Acquire) {
            return Ok(());
        }
        self.with_conn(|conn| conn.execute_batch(SCHEMA).map_err(LibraryError::Schema))?;
        self.inner.initialized.store(true, Ordering::Release);
        info!("Created catalog schema at {:?}", self.inner.path);
        Ok(())
    }

    pub fn close(&self) {
        if let Some(conn) = self.inner.conn.lock().take() {
            drop(conn);
            debug!("Closed catalog {:?}", self.inner.path);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.conn.lock().is_none()
    }

    pub fn truncate(&self) -> Result<(), LibraryError> {
        self.close();
        fs::remove_file(&self.inner.path)?;
        info!("Removed catalog {:?}", self.inner.path);
        Ok(())
    }

    pub(crate) fn with_conn<T>(
        &self,
        op: impl FnOnce(&Connection) -> Result<T, LibraryError>,
    ) -> Result<T, LibraryError> {
        let guard = self.inner.conn.lock();
        match guard.as_ref() {
            Some(conn) => op(conn),
            None => Err(LibraryError::Closed),
        }
    }

    pub fn find_artist_id(&self, name: &str) -> Result<Option<i64>, LibraryError> {
        self.with_conn(|conn| {
            let id = conn
                .query_row(
                    "SELECT id FROM artists WHERE name = ?1",
                    params![name],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(id)
        })
    }

    pub fn insert_artist(&self, name: &str) -> Result<i64, LibraryError> {
        self.with_conn(|conn| {
            conn.execute("INSERT INTO artists (name) VALUES (?1)", params![name])?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn find_album_id(&self, name: &str, artist_id: i64) -> Result<Option<i64>, LibraryError> {
        self.with_conn(|conn| {
            let id = conn
                .query_row(
                    "SELECT id FROM albums WHERE name = ?1 AND artist_id = ?2",
                    params![name, artist_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(id)
        })
    }

    pub fn insert_album(&self, name: &str, artist_id: i64) -> Result<i64, LibraryError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO albums (name, artist_id) VALUES (?1, ?2)",
                params![name, artist_id],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn find_track_id(
        &self,
        name: &str,
        artist_id: i64,
        album_id: i64,
    ) -> Result<Option<i64>, LibraryError> {
        self.with_conn(|conn| {
            let id = conn
                .query_row(
                    "SELECT id FROM tracks WHERE name = ?1 AND artist_id = ?2 AND album_id = ?3",
                    params![name, artist_id, album_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(id)
        })
    }

    pub fn insert_track(&self, track: &NewTrack<'_>) -> Result<i64, LibraryError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO tracks (name, album_id, artist_id, fs_path, number)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    track.name,
                    track.album_id,
                    track.artist_id,
                    path_to_blob(track.fs_path),
                    track.number
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn track(&self, track_id: i64) -> Result<Option<Track>, LibraryError> {
        self.with_conn(|conn| {
            let track = conn
                .query_row(
                    "SELECT id, name, album_id, artist_id, fs_path, number
                     FROM tracks WHERE id = ?1",
                    params![track_id],
                    |row| {
                        Ok(Track {
                            id: row.get(0)?,
                            name: row.get(1)?,
                            album_id: row.get(2)?,
                            artist_id: row.get(3)?,
                            fs_path: path_from_blob(row.get(4)?),
                            number: row.get(5)?,
                        })
                    },
                )
                .optional()?;
            Ok(track)
        })
    }

    pub fn album(&self, album_id: i64) -> Result<Option<Album>, LibraryError> {
        self.with_conn(|conn| {
            let album = conn
                .query_row(
                    "SELECT id, name, artist_id FROM albums WHERE id = ?1",
                    params![album_id],
                    |row| {
                        Ok(Album {
                            id: row.get(0)?,
                            name: row.get(1)?,
                            artist_id: row.get(2)?,
                        })
                    },
                )
                .optional()?;
            Ok(album)
        })
    }

    pub fn stats(&self) -> Result<LibraryStats, LibraryError> {
        self.with_conn(|conn| {
            let count = |table: &str| -> Result<usize, LibraryError> {
                let sql = format!("SELECT COUNT(*) FROM {}", table);
                let value: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
                Ok(value.max(0) as usize)
            };
            Ok(LibraryStats {
                artists: count("artists")?,
                albums: count("albums")?,
                tracks: count("tracks")?,
            })
        })
    }
}

// Paths are stored as raw OS bytes so names that are not UTF-8 survive the trip.
#[cfg(unix)]
fn path_to_blob(path: &Path) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    path.as_os_str().as_bytes().to_vec()
}

#[cfg(unix)]
fn path_from_blob(bytes: Vec<u8>) -> PathBuf {
    use std::os::unix::ffi::OsStringExt;
    PathBuf::from(OsString::from_vec(bytes))
}

#[cfg(not(unix))]
fn path_to_blob(path: &Path) -> Vec<u8> {
    path.to_string_lossy().into_owned().into_bytes()
}

#[cfg(not(unix))]
fn path_from_blob(bytes: Vec<u8>) -> PathBuf {
    PathBuf::from(OsString::from(String::from_utf8_lossy(&bytes).into_owned()))
}
