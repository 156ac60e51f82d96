use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, Seek, Write};
use std::path::Path;

use common::{base_name, SearchResult};
use rusqlite::params;
use serde::Serialize;
use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::LibraryError;
use crate::store::CatalogStore;

const ALBUM_FILES_SQL: &str = r"
    SELECT
        t.id,
        t.name,
        al.name,
        at.name,
        t.number
    FROM
        tracks AS t
            LEFT JOIN albums AS al ON al.id = t.album_id
            LEFT JOIN artists AS at ON at.id = t.artist_id
    WHERE
        t.album_id = ?1
    ORDER BY
        t.number, t.id
";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ArchiveSummary {
    pub album: String,
    /// Suggested download name, `<album>.zip`.
    pub file_name: String,
    pub entries: Vec<String>,
}

pub fn album_files(store: &CatalogStore, album_id: i64) -> Result<Vec<SearchResult>, LibraryError> {
    store.with_conn(|conn| {
        let mut stmt = conn.prepare_cached(ALBUM_FILES_SQL)?;
        let rows = stmt.query_map(params![album_id], |row| {
            Ok(SearchResult {
                id: row.get(0)?,
                title: row.get(1)?,
                album: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                artist: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                track_number: row.get(4)?,
            })
        })?;
        let tracks = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tracks)
    })
}

/// Zips every track of the album into `sink`, one stored entry per file.
/// A failed build leaves `sink` untouched.
pub fn build_album_archive<W: Write>(
    store: &CatalogStore,
    album_id: i64,
    sink: &mut W,
) -> Result<ArchiveSummary, LibraryError> {
    let (summary, mut staged) = stage_album_archive(store, album_id)?;
    io::copy(&mut staged, sink)?;
    sink.flush()?;
    Ok(summary)
}

/// Builds the album zip in an anonymous temp file and returns it rewound to the
/// start. The file only exists once the archive is complete.
pub fn stage_album_archive(
    store: &CatalogStore,
    album_id: i64,
) -> Result<(ArchiveSummary, File), LibraryError> {
    let album = store
        .album(album_id)?
        .ok_or_else(|| LibraryError::NotFound(format!("album {}", album_id)))?;
    let tracks = album_files(store, album_id)?;
    if tracks.is_empty() {
        return Err(LibraryError::NotFound(format!("album {}", album_id)));
    }

    let mut writer = ZipWriter::new(tempfile::tempfile()?);
    let mut names = EntryNames::default();
    let mut entries = Vec::with_capacity(tracks.len());

    for listed in &tracks {
        let track = store
            .track(listed.id)?
            .ok_or_else(|| LibraryError::NotFound(format!("track {}", listed.id)))?;
        let contents = fs::read(&track.fs_path).map_err(|err| {
            warn!(
                "Failed to read {:?} for album {}: {}",
                track.fs_path, album_id, err
            );
            LibraryError::Io(err)
        })?;

        let name = names.assign(&base_name(&track.fs_path), track.number);
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Stored)
            .large_file(contents.len() as u64 >= u64::from(u32::MAX));
        writer.start_file(name.as_str(), options)?;
        writer.write_all(&contents)?;
        entries.push(name);
    }

    let mut staged = writer.finish()?;
    staged.rewind()?;

    debug!("Archived album {} ({} entries)", album_id, entries.len());
    Ok((
        ArchiveSummary {
            file_name: format!("{}.zip", album.name),
            album: album.name,
            entries,
        },
        staged,
    ))
}

/// Keeps archive entry names unique. Later files that reuse a base name get the
/// track number in front, then a ` (n)` counter.
#[derive(Default)]
struct EntryNames {
    used: HashSet<String>,
}

impl EntryNames {
    fn assign(&mut self, base: &str, track_number: i64) -> String {
        if self.used.insert(base.to_string()) {
            return base.to_string();
        }

        let numbered = format!("{:02} - {}", track_number, base);
        if self.used.insert(numbered.clone()) {
            return numbered;
        }

        let path = Path::new(&numbered);
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| numbered.clone());
        let ext = path.extension().map(|s| s.to_string_lossy().to_string());
        let mut counter = 2usize;
        loop {
            let candidate = match &ext {
                Some(ext) => format!("{} ({}).{}", stem, counter, ext),
                None => format!("{} ({})", stem, counter),
            };
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            counter += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::EntryNames;
    use crate::error::LibraryError;
    use crate::test_support::{test_library, write_media, write_media_at};
    use std::io::{Cursor, Read};
    use zip::ZipArchive;

    #[test]
    fn entry_names_are_disambiguated() {
        let mut names = EntryNames::default();
        assert_eq!(names.assign("track.mp3", 1), "track.mp3");
        assert_eq!(names.assign("track.mp3", 2), "02 - track.mp3");
        assert_eq!(names.assign("track.mp3", 2), "02 - track (2).mp3");
        assert_eq!(names.assign("track.mp3", 2), "02 - track (3).mp3");
        assert_eq!(names.assign("noext", 4), "noext");
        assert_eq!(names.assign("noext", 4), "04 - noext");
        assert_eq!(names.assign("noext", 4), "04 - noext (2)");
    }

    #[test]
    fn archive_contains_every_album_file() {
        let (dir, library) = test_library();
        let mut album_id = 0;
        let mut sources = Vec::new();
        for (n, title) in ["One", "Two", "Three"].iter().enumerate() {
            let rel = format!("Nova/Dawn/{:02} {}.mp3", n + 1, title);
            let path = write_media(dir.path(), &rel, title, "Nova", "Dawn", n as u16 + 1);
            album_id = library.add_media(&path).unwrap().album_id;
            sources.push(path);
        }

        let mut sink = Vec::new();
        let summary = library.build_album_archive(album_id, &mut sink).unwrap();
        assert_eq!(summary.album, "Dawn");
        assert_eq!(summary.file_name, "Dawn.zip");
        assert_eq!(summary.entries, vec!["01 One.mp3", "02 Two.mp3", "03 Three.mp3"]);

        let mut archive = ZipArchive::new(Cursor::new(sink)).unwrap();
        assert_eq!(archive.len(), 3);
        for source in &sources {
            let name = source.file_name().unwrap().to_string_lossy().to_string();
            let mut entry = archive.by_name(&name).unwrap();
            let mut bytes = Vec::new();
            entry.read_to_end(&mut bytes).unwrap();
            assert_eq!(bytes, std::fs::read(source).unwrap());
        }
    }

    #[test]
    fn shared_base_names_do_not_collide() {
        let (dir, library) = test_library();
        let a = write_media(dir.path(), "cd1/track.mp3", "First", "Nova", "Dawn", 1);
        let b = write_media(dir.path(), "cd2/track.mp3", "Second", "Nova", "Dawn", 2);
        let album_id = library.add_media(&a).unwrap().album_id;
        library.add_media(&b).unwrap();

        let mut sink = Vec::new();
        let summary = library.build_album_archive(album_id, &mut sink).unwrap();
        assert_eq!(summary.entries, vec!["track.mp3", "02 - track.mp3"]);
        assert_eq!(ZipArchive::new(Cursor::new(sink)).unwrap().len(), 2);
    }

    #[test]
    fn missing_file_aborts_without_output() {
        let (dir, library) = test_library();
        let mut album_id = 0;
        let mut paths = Vec::new();
        for n in 1..=3u16 {
            let rel = format!("Nova/Dawn/{:02}.mp3", n);
            let title = format!("Song {}", n);
            let path = write_media(dir.path(), &rel, &title, "Nova", "Dawn", n);
            album_id = library.add_media(&path).unwrap().album_id;
            paths.push(path);
        }
        std::fs::remove_file(&paths[1]).unwrap();

        let mut sink = Vec::new();
        let err = library.build_album_archive(album_id, &mut sink).unwrap_err();
        assert!(matches!(err, LibraryError::Io(_)));
        assert!(sink.is_empty());
    }

    #[test]
    fn staged_archive_starts_at_the_beginning() {
        let (dir, library) = test_library();
        let path = write_media(dir.path(), "Nova/Dawn/01.mp3", "One", "Nova", "Dawn", 1);
        let album_id = library.add_media(&path).unwrap().album_id;

        let (summary, staged) = library.stage_album_archive(album_id).unwrap();
        assert_eq!(summary.entries, vec!["01.mp3"]);
        let mut archive = ZipArchive::new(staged).unwrap();
        assert_eq!(archive.len(), 1);
        let mut bytes = Vec::new();
        archive.by_index(0).unwrap().read_to_end(&mut bytes).unwrap();
        assert_eq!(bytes, std::fs::read(&path).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_file_names_are_archived() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let (dir, library) = test_library();
        let path = dir.path().join(OsStr::from_bytes(b"caf\xe9.mp3"));
        write_media_at(&path, "Cafe", "Nova", "Dawn", 1);
        let album_id = library.add_media(&path).unwrap().album_id;

        let mut sink = Vec::new();
        let summary = library.build_album_archive(album_id, &mut sink).unwrap();
        assert_eq!(summary.entries, vec!["caf\u{fffd}.mp3"]);
        let mut archive = ZipArchive::new(Cursor::new(sink)).unwrap();
        let mut bytes = Vec::new();
        archive.by_index(0).unwrap().read_to_end(&mut bytes).unwrap();
        assert_eq!(bytes, std::fs::read(&path).unwrap());
    }

    #[test]
    fn unknown_album_is_not_found() {
        let (_dir, library) = test_library();
        assert!(library.get_album_files(7).is_empty());
        let mut sink = Vec::new();
        let err = library.build_album_archive(7, &mut sink).unwrap_err();
        assert!(err.is_not_found());
        assert!(sink.is_empty());
    }
}
