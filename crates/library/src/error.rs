use metadata::MetadataError;
use rusqlite::ffi;

#[derive(Debug)]
pub enum LibraryError {
    NotFound(String),
    StorageUnavailable(String),
    Schema(rusqlite::Error),
    Lookup(rusqlite::Error),
    UnreadableMedia {
        path: String,
        source: MetadataError,
    },
    Io(std::io::Error),
    Closed,
}

impl LibraryError {
    /// True when an insert lost a race against a writer that committed the same unique key.
    pub fn is_unique_conflict(&self) -> bool {
        match self {
            LibraryError::Lookup(rusqlite::Error::SqliteFailure(err, _)) => {
                err.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
            }
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, LibraryError::NotFound(_))
    }
}

impl std::fmt::Display for LibraryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LibraryError::NotFound(what) => write!(f, "not found: {}", what),
            LibraryError::StorageUnavailable(message) => {
                write!(f, "storage unavailable: {}", message)
            }
            LibraryError::Schema(err) => write!(f, "schema error: {}", err),
            LibraryError::Lookup(err) => write!(f, "lookup error: {}", err),
            LibraryError::UnreadableMedia { path, source } => {
                write!(f, "unreadable media {}: {}", path, source)
            }
            LibraryError::Io(err) => write!(f, "io error: {}", err),
            LibraryError::Closed => write!(f, "library is closed"),
        }
    }
}

impl std::error::Error for LibraryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LibraryError::Schema(err) | LibraryError::Lookup(err) => Some(err),
            LibraryError::UnreadableMedia { source, .. } => Some(source),
            LibraryError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for LibraryError {
    fn from(err: std::io::Error) -> Self {
        LibraryError::Io(err)
    }
}

impl From<rusqlite::Error> for LibraryError {
    fn from(err: rusqlite::Error) -> Self {
        LibraryError::Lookup(err)
    }
}

impl From<zip::result::ZipError> for LibraryError {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(err) => LibraryError::Io(err),
            other => LibraryError::Io(std::io::Error::other(other)),
        }
    }
}
