use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use metadata::{parse_track_number, MetadataError, TagInfo, TagReader};
use tempfile::TempDir;

use crate::Library;

/// Reads `key=value` lines instead of real audio tags. A file without any
/// recognised key is rejected like an unreadable media file.
pub struct FakeTagReader;

impl TagReader for FakeTagReader {
    fn read_tags(&self, path: &Path) -> Result<TagInfo, MetadataError> {
        let contents = fs::read_to_string(path)?;
        let mut info = TagInfo::default();
        let mut recognised = false;
        for line in contents.lines() {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            recognised = true;
            let value = metadata::clean_text(value);
            match key.trim() {
                "title" => info.title = value,
                "artist" => info.artist = value,
                "album" => info.album = value,
                "track" => info.track_no = value.as_deref().and_then(parse_track_number),
                _ => {}
            }
        }
        if !recognised {
            return Err(MetadataError::Malformed(format!("no tags in {}", path.display())));
        }
        Ok(info)
    }
}

/// Writes a fake media file at `root/relpath` that [`FakeTagReader`] understands.
pub fn write_media(
    root: &Path,
    relpath: &str,
    title: &str,
    artist: &str,
    album: &str,
    track: u16,
) -> PathBuf {
    let path = root.join(relpath);
    write_media_at(&path, title, artist, album, track);
    path
}

pub fn write_media_at(path: &Path, title: &str, artist: &str, album: &str, track: u16) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let body = format!(
        "title={}\nartist={}\nalbum={}\ntrack={}\n",
        title, artist, album, track
    );
    fs::write(path, body).unwrap();
}

/// A fresh, initialized library in a temp dir that reads tags with [`FakeTagReader`].
pub fn test_library() -> (TempDir, Library) {
    let dir = TempDir::new().unwrap();
    let library =
        Library::open_with_reader(&dir.path().join("library.db"), Arc::new(FakeTagReader)).unwrap();
    library.initialize().unwrap();
    (dir, library)
}
