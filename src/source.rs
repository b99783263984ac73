//! Loads the blog's data file. The document is parsed as JSON but otherwise
//! left untyped ([`RawBlogData`]); checking that the `authors` and `articles`
//! sections have the right shape is the job of [`crate::blog`].

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

/// The unvalidated JSON document read from the data file.
pub type RawBlogData = serde_json::Value;

/// Reads the file at `path` fully into memory and parses it as JSON. The file
/// is closed before this function returns.
pub fn load(path: &Path) -> Result<RawBlogData> {
    let contents = std::fs::read_to_string(path).map_err(|err| Error::Io {
        path: path.to_owned(),
        err,
    })?;
    debug!(path = %path.display(), bytes = contents.len(), "read data file");

    serde_json::from_str(&contents).map_err(|err| Error::Parse {
        path: path.to_owned(),
        err,
    })
}

/// The result of loading a data file.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem reading or parsing the data file.
#[derive(Debug)]
pub enum Error {
    /// Returned when the data file can't be read.
    Io { path: PathBuf, err: std::io::Error },

    /// Returned when the data file isn't valid JSON.
    Parse {
        path: PathBuf,
        err: serde_json::Error,
    },
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io { path, err } => {
                write!(f, "Reading data file '{}': {}", path.display(), err)
            }
            Error::Parse { path, err } => {
                write!(f, "Parsing data file '{}': {}", path.display(), err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io { path: _, err } => Some(err),
            Error::Parse { path: _, err } => Some(err),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_fixture() -> Result<()> {
        let raw = load(Path::new("./testdata/blog.json"))?;
        assert!(raw.get("authors").map_or(false, |a| a.is_array()));
        assert!(raw.get("articles").map_or(false, |a| a.is_array()));
        Ok(())
    }

    #[test]
    fn test_load_missing_file() {
        match load(Path::new("./testdata/does-not-exist.json")) {
            Err(Error::Io { path, .. }) => {
                assert_eq!(path, PathBuf::from("./testdata/does-not-exist.json"))
            }
            other => panic!("wanted Error::Io, got {:?}", other),
        }
    }

    #[test]
    fn test_load_invalid_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ \"authors\": [").unwrap();
        match load(file.path()) {
            Err(Error::Parse { .. }) => {}
            other => panic!("wanted Error::Parse, got {:?}", other),
        }
    }

    #[test]
    fn test_load_does_not_validate_schema() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[1, 2, 3]").unwrap();
        let raw = load(file.path())?;
        assert!(raw.is_array());
        Ok(())
    }
}
