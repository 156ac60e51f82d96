use tracing::debug;

use crate::error::LibraryError;
use crate::store::{CatalogStore, NewTrack};

/// Get-or-create over the catalog's unique keys: artist name, then album within
/// an artist, then track within an artist and album.
pub struct IdentityResolver<'a> {
    store: &'a CatalogStore,
}

impl<'a> IdentityResolver<'a> {
    pub fn new(store: &'a CatalogStore) -> Self {
        Self { store }
    }

    pub fn artist_id(&self, name: &str) -> Result<i64, LibraryError> {
        get_or_create(
            || self.store.find_artist_id(name),
            || self.store.insert_artist(name),
        )
    }

    pub fn album_id(&self, name: &str, artist_id: i64) -> Result<i64, LibraryError> {
        get_or_create(
            || self.store.find_album_id(name, artist_id),
            || self.store.insert_album(name, artist_id),
        )
    }

    /// `fs_path` and `number` are only written when the track row is created.
    pub fn track_id(&self, track: &NewTrack<'_>) -> Result<i64, LibraryError> {
        get_or_create(
            || {
                self.store
                    .find_track_id(track.name, track.artist_id, track.album_id)
            },
            || self.store.insert_track(track),
        )
    }
}

// Lookup and insert are separate store calls, so a concurrent writer can commit
// the same key in between. The unique constraint turns that into a conflict and
// the second lookup then sees the winner's row.
fn get_or_create<L, I>(mut lookup: L, insert: I) -> Result<i64, LibraryError>
where
    L: FnMut() -> Result<Option<i64>, LibraryError>,
    I: FnOnce() -> Result<i64, LibraryError>,
{
    if let Some(id) = lookup()? {
        return Ok(id);
    }

    match insert() {
        Ok(id) => Ok(id),
        Err(err) if err.is_unique_conflict() => {
            debug!("Insert lost a race ({}); retrying lookup", err);
            match lookup()? {
                Some(id) => Ok(id),
                None => Err(err),
            }
        }
        Err(err) => Err(err),
    }
}
