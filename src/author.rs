//! Defines the [`Author`] type and the [`AuthorRegistry`] which resolves
//! author ids for [`crate::article::ArticleCatalog`].

use std::collections::HashMap;
use std::rc::Rc;

use serde::Deserialize;

use crate::blog::{Error, Result};

/// Identifies an [`Author`] within a single data file.
pub type AuthorId = i64;

/// Represents someone who writes articles. Both name parts are guaranteed to
/// be non-empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Author {
    pub id: AuthorId,
    pub first_name: String,
    pub last_name: String,
}

impl Author {
    /// Constructs an [`Author`], rejecting empty name parts since the derived
    /// short name and initials need at least one character from each.
    pub fn new(id: AuthorId, first_name: String, last_name: String) -> Result<Author> {
        if first_name.trim().is_empty() {
            return Err(Error::InvalidAuthor {
                id,
                reason: "empty first name",
            });
        }
        if last_name.trim().is_empty() {
            return Err(Error::InvalidAuthor {
                id,
                reason: "empty last name",
            });
        }
        Ok(Author {
            id,
            first_name,
            last_name,
        })
    }

    /// `Bob Lee`
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// `B.Lee`
    pub fn short_name(&self) -> String {
        format!("{}.{}", initial(&self.first_name), self.last_name)
    }

    /// `B.L`
    pub fn initials(&self) -> String {
        format!("{}.{}", initial(&self.first_name), initial(&self.last_name))
    }
}

fn initial(name: &str) -> String {
    name.trim_start().chars().next().map(String::from).unwrap_or_default()
}

#[derive(Deserialize)]
struct RawAuthor {
    id: AuthorId,

    #[serde(rename = "firstname")]
    first_name: String,

    #[serde(rename = "lastname")]
    last_name: String,
}

/// The validated authors for one render, in data-file order and indexed by
/// id. Authors are shared with the articles which reference them.
#[derive(Debug, Default)]
pub struct AuthorRegistry {
    authors: Vec<Rc<Author>>,
    by_id: HashMap<AuthorId, usize>,
}

impl AuthorRegistry {
    /// Builds the registry from the raw `authors` section, which must be a
    /// sequence of `{ id, firstname, lastname }` records with unique ids.
    pub fn build(raw: &serde_json::Value) -> Result<AuthorRegistry> {
        let records = Vec::<RawAuthor>::deserialize(raw).map_err(|err| Error::Schema {
            section: "authors",
            err,
        })?;

        let mut registry = AuthorRegistry {
            authors: Vec::with_capacity(records.len()),
            by_id: HashMap::with_capacity(records.len()),
        };
        for record in records {
            let author = Author::new(record.id, record.first_name, record.last_name)?;
            if registry.by_id.insert(author.id, registry.authors.len()).is_some() {
                return Err(Error::DuplicateId {
                    section: "authors",
                    id: author.id,
                });
            }
            registry.authors.push(Rc::new(author));
        }
        Ok(registry)
    }

    /// Looks up an author by id.
    pub fn find_by_id(&self, id: AuthorId) -> Result<&Rc<Author>> {
        self.by_id
            .get(&id)
            .map(|&i| &self.authors[i])
            .ok_or(Error::AuthorNotFound(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Author> {
        self.authors.iter().map(|a| a.as_ref())
    }

    pub fn len(&self) -> usize {
        self.authors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.authors.is_empty()
    }
}
