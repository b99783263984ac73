//! The library code for `feuillet`, which renders a small blog from a static
//! JSON data file. The architecture breaks down into two distinct steps:
//!
//! 1. Loading the data file into validated records ([`crate::blog`])
//! 2. Rendering those records into an HTML page ([`crate::page`])
//!
//! The first step is itself a pipeline: the JSON document is read untyped
//! ([`crate::source`]), then the `authors` section becomes an
//! [`author::AuthorRegistry`] and the `articles` section becomes an
//! [`article::ArticleCatalog`] whose articles point at their resolved
//! authors. Any failure here aborts the load.
//!
//! The second step picks one of two views from the request's query string,
//! the article list or a single article, and wraps the
//! [`presenter::Presenter`] fragments in a layout template. Load failures and
//! unknown article ids still produce a complete page.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod article;
pub mod author;
pub mod blog;
pub mod config;
pub mod escape;
pub mod page;
pub mod presenter;
pub mod source;
