//! Defines the [`Article`] type and the [`ArticleCatalog`], which builds
//! articles from the raw `articles` section and resolves their authors.

use std::collections::HashSet;
use std::fmt::{self, Write};
use std::rc::Rc;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use tracing::warn;

use crate::author::{Author, AuthorId, AuthorRegistry};
use crate::blog::{Error, Result};

/// Identifies an [`Article`] within a single data file.
pub type ArticleId = i64;

/// A single blog post. The author is resolved once at load time and the
/// publication date is stored already formatted for display.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Article {
    pub id: ArticleId,
    pub title: String,
    pub content: String,
    pub author: Rc<Author>,
    pub publication_date: String,
}

/// What to do with an article whose `authorId` doesn't match any author.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingAuthor {
    /// Reject the whole load.
    Fail,

    /// Drop the article and keep going.
    Skip,
}

impl Default for MissingAuthor {
    fn default() -> Self {
        MissingAuthor::Fail
    }
}

/// The strftime patterns used to read dates from the data file and to
/// display them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DateFormat {
    /// The pattern for dates in the data file. RFC 3339 timestamps are
    /// accepted as well, whatever this is set to.
    pub input: String,

    /// The pattern for displayed dates.
    pub output: String,
}

impl Default for DateFormat {
    fn default() -> Self {
        DateFormat {
            input: String::from("%Y-%m-%d"),
            output: String::from("%d/%m/%Y"),
        }
    }
}

impl DateFormat {
    /// Parses `raw` with the input pattern, falling back to RFC 3339.
    pub fn parse(&self, raw: &str) -> std::result::Result<NaiveDate, chrono::ParseError> {
        let raw = raw.trim();
        match NaiveDate::parse_from_str(raw, &self.input) {
            Ok(date) => Ok(date),
            Err(err) => DateTime::parse_from_rfc3339(raw)
                .map(|dt| dt.date_naive())
                .map_err(|_| err),
        }
    }

    /// Formats `date` with the output pattern. Fails if the pattern asks for
    /// fields a date doesn't have (`%H`, `%z`, ...).
    pub fn display(&self, date: NaiveDate) -> std::result::Result<String, fmt::Error> {
        let mut out = String::new();
        write!(out, "{}", date.format(&self.output))?;
        Ok(out)
    }
}

/// Returns `true` if chrono understands every specifier in `pattern`.
pub fn is_valid_pattern(pattern: &str) -> bool {
    !StrftimeItems::new(pattern).any(|item| item == Item::Error)
}

/// Returns `true` if `pattern` can format a calendar date. Stricter than
/// [`is_valid_pattern`]: time and offset specifiers are rejected too.
pub fn is_date_pattern(pattern: &str) -> bool {
    let dates = DateFormat {
        input: String::new(),
        output: pattern.to_owned(),
    };
    dates.display(NaiveDate::MIN).is_ok()
}

#[derive(Deserialize)]
struct RawArticle {
    #[serde(rename = "articleId")]
    id: ArticleId,

    title: String,

    content: String,

    #[serde(rename = "authorId")]
    author_id: AuthorId,

    date: String,
}

/// The validated articles for one render, in data-file order.
#[derive(Debug, Default)]
pub struct ArticleCatalog {
    articles: Vec<Article>,
}

impl ArticleCatalog {
    /// Builds the catalog from the raw `articles` section. Each record's
    /// `authorId` is resolved against `authors`; `missing_author` decides
    /// whether an unresolved author fails the load or drops the article.
    pub fn build(
        raw: &serde_json::Value,
        authors: &AuthorRegistry,
        dates: &DateFormat,
        missing_author: MissingAuthor,
    ) -> Result<ArticleCatalog> {
        let records = Vec::<RawArticle>::deserialize(raw).map_err(|err| Error::Schema {
            section: "articles",
            err,
        })?;

        let mut seen: HashSet<ArticleId> = HashSet::with_capacity(records.len());
        let mut articles = Vec::with_capacity(records.len());
        for record in records {
            if !seen.insert(record.id) {
                return Err(Error::DuplicateId {
                    section: "articles",
                    id: record.id,
                });
            }

            let author = match authors.find_by_id(record.author_id) {
                Ok(author) => Rc::clone(author),
                Err(err) => match missing_author {
                    MissingAuthor::Fail => {
                        return Err(Error::Annotated(
                            format!("article {}", record.id),
                            Box::new(err),
                        ))
                    }
                    MissingAuthor::Skip => {
                        warn!(
                            article_id = record.id,
                            author_id = record.author_id,
                            "skipping article with unknown author"
                        );
                        continue;
                    }
                },
            };

            let date = dates.parse(&record.date).map_err(|err| Error::InvalidDate {
                article_id: record.id,
                date: record.date.clone(),
                err,
            })?;
            let publication_date = dates.display(date).map_err(|_| Error::DatePattern {
                pattern: dates.output.clone(),
            })?;

            articles.push(Article {
                id: record.id,
                title: record.title,
                content: record.content,
                author,
                publication_date,
            });
        }
        Ok(ArticleCatalog { articles })
    }

    /// Looks up an article by id.
    pub fn find(&self, id: ArticleId) -> Option<&Article> {
        self.articles.iter().find(|a| a.id == id)
    }

    pub fn as_slice(&self) -> &[Article] {
        &self.articles
    }

    pub fn iter(&self) -> impl Iterator<Item = &Article> {
        self.articles.iter()
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }
}
