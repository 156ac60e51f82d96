use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use common::file_stem;
use metadata::{TagInfo, TagReader};
use serde::Serialize;
use tracing::debug;

use crate::error::LibraryError;
use crate::resolver::IdentityResolver;
use crate::store::{CatalogStore, NewTrack};

const UNKNOWN_ARTIST: &str = "Unknown Artist";
const UNKNOWN_ALBUM: &str = "Unknown Album";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct IngestedIds {
    pub artist_id: i64,
    pub album_id: i64,
    pub track_id: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct MediaTags {
    title: String,
    artist: String,
    album: String,
    number: i64,
}

impl MediaTags {
    fn from_tags(tags: TagInfo, path: &Path) -> Self {
        Self {
            title: tags.title.unwrap_or_else(|| file_stem(path)),
            artist: tags.artist.unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
            album: tags.album.unwrap_or_else(|| UNKNOWN_ALBUM.to_string()),
            number: tags.track_no.map(i64::from).unwrap_or(0),
        }
    }
}

pub fn add_media(
    store: &CatalogStore,
    reader: &dyn TagReader,
    path: &Path,
) -> Result<IngestedIds, LibraryError> {
    let path = absolute_path(path)?;
    if let Err(err) = fs::metadata(&path) {
        return Err(match err.kind() {
            ErrorKind::NotFound => LibraryError::NotFound(path.display().to_string()),
            _ => LibraryError::Io(err),
        });
    }

    let tags = reader
        .read_tags(&path)
        .map_err(|source| LibraryError::UnreadableMedia {
            path: path.display().to_string(),
            source,
        })?;
    let media = MediaTags::from_tags(tags, &path);

    let resolver = IdentityResolver::new(store);
    let artist_id = resolver.artist_id(&media.artist)?;
    let album_id = resolver.album_id(&media.album, artist_id)?;
    let track_id = resolver.track_id(&NewTrack {
        name: &media.title,
        artist_id,
        album_id,
        fs_path: &path,
        number: media.number,
    })?;

    debug!(
        "Ingested {:?} as track {} (album {}, artist {})",
        path, track_id, album_id, artist_id
    );
    Ok(IngestedIds {
        artist_id,
        album_id,
        track_id,
    })
}

fn absolute_path(path: &Path) -> Result<PathBuf, LibraryError> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
