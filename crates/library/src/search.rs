use common::SearchResult;
use rusqlite::params;
use tracing::warn;

use crate::error::LibraryError;
use crate::store::CatalogStore;

const LIKE_ESCAPE: char = '\\';

const SEARCH_SQL: &str = r"
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
        t.name LIKE ?1 ESCAPE '\' OR
        al.name LIKE ?1 ESCAPE '\' OR
        at.name LIKE ?1 ESCAPE '\'
    ORDER BY
        t.id
";

/// Substring match over track title, album name and artist name. The empty term
/// is a substring of everything and lists every track. Query failures are logged
/// and yield no results.
pub fn search(store: &CatalogStore, term: &str) -> Vec<SearchResult> {
    match query(store, &like_pattern(term)) {
        Ok(results) => results,
        Err(err) => {
            warn!("Search for {:?} failed: {}", term, err);
            Vec::new()
        }
    }
}

fn query(store: &CatalogStore, pattern: &str) -> Result<Vec<SearchResult>, LibraryError> {
    store.with_conn(|conn| {
        let mut stmt = conn.prepare_cached(SEARCH_SQL)?;
        let rows = stmt.query_map(params![pattern], |row| {
            Ok(SearchResult {
                id: row.get(0)?,
                title: row.get(1)?,
                album: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                artist: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                track_number: row.get(4)?,
            })
        })?;
        let results = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(results)
    })
}

/// `%term%` with LIKE wildcards in the term escaped so they match literally.
fn like_pattern(term: &str) -> String {
    let mut out = String::with_capacity(term.len() + 2);
    out.push('%');
    for ch in term.chars() {
        if ch == '%' || ch == '_' || ch == LIKE_ESCAPE {
            out.push(LIKE_ESCAPE);
        }
        out.push(ch);
    }
    out.push('%');
    out
}
