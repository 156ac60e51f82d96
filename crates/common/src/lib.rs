use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    pub id: i64,
    pub name: String,
    pub artist_id: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: i64,
    pub name: String,
    pub album_id: i64,
    pub artist_id: i64,
    pub fs_path: PathBuf,
    pub number: i64,
}

/// One row of the track/album/artist join, as returned by search and album listings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: i64,
    pub title: String,
    pub album: String,
    pub artist: String,
    pub track_number: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryStats {
    pub artists: usize,
    pub albums: usize,
    pub tracks: usize,
}

/// Final path component, or the whole input when it has none. Bytes that are
/// not UTF-8 are replaced.
pub fn base_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or(path.as_os_str())
        .to_string_lossy()
        .to_string()
}

pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::{base_name, file_stem};
    use std::path::Path;

    #[test]
    fn base_name_strips_directories() {
        assert_eq!(
            base_name(Path::new("/music/Nova/Dawn/01 Sunrise.mp3")),
            "01 Sunrise.mp3"
        );
        assert_eq!(base_name(Path::new("track.flac")), "track.flac");
        assert_eq!(base_name(Path::new("/")), "/");
    }

    #[test]
    fn file_stem_drops_extension() {
        assert_eq!(file_stem(Path::new("/a/b/Sunrise.mp3")), "Sunrise");
        assert_eq!(file_stem(Path::new("/a/b/noext")), "noext");
    }
}
