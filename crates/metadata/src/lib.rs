use std::path::Path;

use lofty::error::LoftyError;
use lofty::prelude::{ItemKey, TaggedFileExt};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TagInfo {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub track_no: Option<u16>,
}

#[derive(Debug)]
pub enum MetadataError {
    Io(std::io::Error),
    Lofty(LoftyError),
    Malformed(String),
}

impl std::fmt::Display for MetadataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetadataError::Io(err) => write!(f, "io error: {}", err),
            MetadataError::Lofty(err) => write!(f, "tag error: {}", err),
            MetadataError::Malformed(message) => write!(f, "malformed tags: {}", message),
        }
    }
}

impl std::error::Error for MetadataError {}

impl From<std::io::Error> for MetadataError {
    fn from(err: std::io::Error) -> Self {
        MetadataError::Io(err)
    }
}

impl From<LoftyError> for MetadataError {
    fn from(err: LoftyError) -> Self {
        MetadataError::Lofty(err)
    }
}

/// Source of title/artist/album/track number for a media file.
pub trait TagReader: Send + Sync {
    fn read_tags(&self, path: &Path) -> Result<TagInfo, MetadataError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LoftyTagReader;

impl TagReader for LoftyTagReader {
    fn read_tags(&self, path: &Path) -> Result<TagInfo, MetadataError> {
        read_tags(path)
    }
}

pub fn read_tags(path: &Path) -> Result<TagInfo, MetadataError> {
    let tagged_file = lofty::read_from_path(path)?;

    let mut info = TagInfo::default();
    if let Some(tag) = tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) {
        info.title = tag.get_string(&ItemKey::TrackTitle).and_then(clean_text);
        info.album = tag.get_string(&ItemKey::AlbumTitle).and_then(clean_text);
        let album_artist = tag.get_string(&ItemKey::AlbumArtist).and_then(clean_text);
        let track_artist = tag.get_string(&ItemKey::TrackArtist).and_then(clean_text);
        info.artist = track_artist.or(album_artist);
        info.track_no = tag
            .get_string(&ItemKey::TrackNumber)
            .and_then(parse_track_number);
    }

    Ok(info)
}

/// Parses `"7"` or `"7/12"` into `7`.
pub fn parse_track_number(text: &str) -> Option<u16> {
    let head = text.split('/').next().unwrap_or(text).trim();
    head.parse().ok()
}

pub fn clean_text(value: &str) -> Option<String> {
    let trimmed = value.trim_matches(|c: char| c.is_whitespace() || c == '\0');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{clean_text, parse_track_number, read_tags, MetadataError};
    use std::path::Path;

    #[test]
    fn parses_plain_and_total_track_numbers() {
        assert_eq!(parse_track_number("7"), Some(7));
        assert_eq!(parse_track_number(" 3/12 "), Some(3));
        assert_eq!(parse_track_number("A1"), None);
        assert_eq!(parse_track_number(""), None);
    }

    #[test]
    fn clean_text_drops_blank_values() {
        assert_eq!(clean_text("  Nova \0"), Some("Nova".to_string()));
        assert_eq!(clean_text("   "), None);
        assert_eq!(clean_text("\0"), None);
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = read_tags(Path::new("/definitely/not/here.mp3")).unwrap_err();
        assert!(matches!(err, MetadataError::Lofty(_) | MetadataError::Io(_)));
    }
}
