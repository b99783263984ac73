//! Defines the [`Blog`] aggregate and the [`Error`] type for everything that
//! can go wrong while turning a data file into validated in-memory records.
//! Loading happens in three steps:
//!
//! 1. Reading and parsing the JSON document ([`crate::source`])
//! 2. Building the author registry ([`crate::author`])
//! 3. Building the article catalog, resolving each article's author
//!    ([`crate::article`])
//!
//! Any failure aborts the whole load; there is no partially built [`Blog`].

use std::fmt;
use std::path::Path;

use tracing::debug;

use crate::article::{ArticleCatalog, ArticleId, DateFormat, MissingAuthor};
use crate::author::{AuthorId, AuthorRegistry};
use crate::source::{self, RawBlogData};

/// The validated blog for a single render. Both collections are built once
/// from the raw data and never mutated afterward.
#[derive(Debug)]
pub struct Blog {
    pub title: String,
    pub authors: AuthorRegistry,
    pub articles: ArticleCatalog,
}

/// Settings which control how raw records become [`Blog`] records.
#[derive(Clone, Debug)]
pub struct LoadOptions {
    /// How publication dates are parsed and displayed.
    pub dates: DateFormat,

    /// What to do with an article whose author can't be resolved.
    pub missing_author: MissingAuthor,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            dates: DateFormat::default(),
            missing_author: MissingAuthor::Fail,
        }
    }
}

impl Blog {
    /// Loads the data file at `path` and builds a [`Blog`] from it.
    pub fn load(title: &str, path: &Path, options: &LoadOptions) -> Result<Blog> {
        let raw = source::load(path)?;
        Blog::from_raw(title, &raw, options)
    }

    /// Builds a [`Blog`] from an already-parsed document. The `authors` and
    /// `articles` sections are both required.
    pub fn from_raw(title: &str, raw: &RawBlogData, options: &LoadOptions) -> Result<Blog> {
        let authors = AuthorRegistry::build(section(raw, "authors")?)?;
        let articles = ArticleCatalog::build(
            section(raw, "articles")?,
            &authors,
            &options.dates,
            options.missing_author,
        )?;
        debug!(
            authors = authors.len(),
            articles = articles.len(),
            "loaded blog"
        );
        Ok(Blog {
            title: title.to_owned(),
            authors,
            articles,
        })
    }
}

fn section<'a>(raw: &'a RawBlogData, name: &'static str) -> Result<&'a serde_json::Value> {
    raw.get(name).ok_or(Error::MissingSection(name))
}

/// The broad categories of load failures. A page renderer uses these to
/// decide how to present an [`Error`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The data file couldn't be read.
    Io,

    /// The data file isn't valid JSON.
    Parse,

    /// A required section or field is missing or has the wrong shape.
    Schema,

    /// A referenced record doesn't exist.
    NotFound,
}

/// The result of a fallible load operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem building a [`Blog`].
#[derive(Debug)]
pub enum Error {
    /// Returned when the data file can't be read or parsed.
    Source(source::Error),

    /// Returned when a top-level section (`authors` or `articles`) is absent.
    MissingSection(&'static str),

    /// Returned when a section's records don't match the expected schema.
    Schema {
        section: &'static str,
        err: serde_json::Error,
    },

    /// Returned when an author record violates the name invariant.
    InvalidAuthor { id: AuthorId, reason: &'static str },

    /// Returned when an article's date can't be parsed.
    InvalidDate {
        article_id: ArticleId,
        date: String,
        err: chrono::ParseError,
    },

    /// Returned when the display pattern for dates can't format a date.
    DatePattern { pattern: String },

    /// Returned when two records in the same section share an id.
    DuplicateId { section: &'static str, id: i64 },

    /// Returned when no author has the requested id.
    AuthorNotFound(AuthorId),

    /// An error with an annotation.
    Annotated(String, Box<Error>),
}

impl Error {
    /// Classifies the error. Annotated errors report their inner kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Source(source::Error::Io { .. }) => ErrorKind::Io,
            Error::Source(source::Error::Parse { .. }) => ErrorKind::Parse,
            Error::MissingSection(_) => ErrorKind::Schema,
            Error::Schema { .. } => ErrorKind::Schema,
            Error::InvalidAuthor { .. } => ErrorKind::Schema,
            Error::InvalidDate { .. } => ErrorKind::Schema,
            Error::DatePattern { .. } => ErrorKind::Schema,
            Error::DuplicateId { .. } => ErrorKind::Schema,
            Error::AuthorNotFound(_) => ErrorKind::NotFound,
            Error::Annotated(_, err) => err.kind(),
        }
    }
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Source(err) => err.fmt(f),
            Error::MissingSection(name) => {
                write!(f, "missing `{}` section", name)
            }
            Error::Schema { section, err } => {
                write!(f, "malformed `{}` section: {}", section, err)
            }
            Error::InvalidAuthor { id, reason } => {
                write!(f, "invalid author {}: {}", id, reason)
            }
            Error::InvalidDate {
                article_id,
                date,
                err,
            } => write!(
                f,
                "invalid date `{}` for article {}: {}",
                date, article_id, err
            ),
            Error::DatePattern { pattern } => {
                write!(f, "date pattern `{}` can't format a date", pattern)
            }
            Error::DuplicateId { section, id } => {
                write!(f, "duplicate id {} in `{}` section", id, section)
            }
            Error::AuthorNotFound(id) => write!(f, "no author with id {}", id),
            Error::Annotated(annotation, err) => {
                write!(f, "{}: {}", &annotation, err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Source(err) => Some(err),
            Error::MissingSection(_) => None,
            Error::Schema { section: _, err } => Some(err),
            Error::InvalidAuthor { .. } => None,
            Error::InvalidDate { err, .. } => Some(err),
            Error::DatePattern { .. } => None,
            Error::DuplicateId { .. } => None,
            Error::AuthorNotFound(_) => None,
            Error::Annotated(_, err) => Some(err),
        }
    }
}

impl From<source::Error> for Error {
    /// Converts a [`source::Error`] into an [`Error`]. This allows us to use
    /// the `?` operator when loading the data file.
    fn from(err: source::Error) -> Error {
        Error::Source(err)
    }
}
