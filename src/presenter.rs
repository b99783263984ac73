//! Formats validated blog records into HTML fragments. Every function here is
//! pure: the current date for the footer is passed in rather than read from
//! the clock, so identical inputs always produce identical output.

use std::fmt::Display;

use chrono::{DateTime, Locale};
use chrono_tz::Tz;
use serde::Deserialize;

use crate::article::{Article, ArticleId};
use crate::escape::{EscapeHref, EscapeHtml};

/// Selects what the list view shows for each article.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListPreview {
    /// The article's full content.
    Content,

    /// The article's title.
    Title,
}

impl Default for ListPreview {
    fn default() -> Self {
        ListPreview::Content
    }
}

/// The credit line printed in the footer: `{text} <a href="{url}">{label}</a>`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Attribution {
    pub text: String,
    pub label: String,
    pub url: String,
}

impl Default for Attribution {
    fn default() -> Self {
        Attribution {
            text: String::from("Simplon.co Lyon >>>"),
            label: String::from("dirago"),
            url: String::from("https://github.com/dirago"),
        }
    }
}

/// Renders the pieces of a page. See [`crate::page::PageController`] for how
/// they are assembled.
pub struct Presenter<'a> {
    /// The locale for weekday and month names in the footer.
    pub locale: Locale,

    /// The strftime pattern for the footer date.
    pub footer_date_format: &'a str,

    /// What the list view shows for each article.
    pub list_preview: ListPreview,

    /// The footer credit line.
    pub attribution: &'a Attribution,
}

impl Presenter<'_> {
    pub fn render_header(&self, blog_title: &str) -> String {
        format!("<header>{}</header>", EscapeHtml(blog_title))
    }

    /// Renders one preview link per article, in catalog order. Each link
    /// targets the article's detail view.
    pub fn render_article_list(&self, articles: &[Article]) -> String {
        let items: String = articles
            .iter()
            .map(|article| {
                let preview = match self.list_preview {
                    ListPreview::Content => &article.content,
                    ListPreview::Title => &article.title,
                };
                format!(
                    "<li><a href=\"{}\">{}</a></li>\n",
                    EscapeHref(&article_href(article.id)),
                    EscapeHtml(preview),
                )
            })
            .collect();
        format!("<ul class=\"article-list\">\n{}</ul>", items)
    }

    /// Renders a single article with a link back to the list.
    pub fn render_article(&self, article: &Article) -> String {
        format!(
            "<article>\n\
             <a class=\"back\" href=\"?\">Retour aux articles</a>\n\
             <h2>{}</h2>\n\
             <p>{}</p>\n\
             <p class=\"signature\">par {}, le {}</p>\n\
             </article>",
            EscapeHtml(&article.title),
            EscapeHtml(&article.content),
            EscapeHtml(&article.author.short_name()),
            EscapeHtml(&article.publication_date),
        )
    }

    /// Renders the footer with `today` spelled out in the configured locale
    /// (e.g., `samedi 04 mai 2024`).
    pub fn render_footer(&self, today: &DateTime<Tz>) -> String {
        let date = today
            .format_localized(self.footer_date_format, self.locale)
            .to_string();
        format!(
            "<footer>\n\
             <p>Nous sommes le {}</p>\n\
             <p>{} <a href=\"{}\">{}</a></p>\n\
             </footer>",
            EscapeHtml(&date),
            EscapeHtml(&self.attribution.text),
            EscapeHref(&self.attribution.url),
            EscapeHtml(&self.attribution.label),
        )
    }

    /// Rendered in place of an article when the requested id doesn't match
    /// any article. `requested` is the raw query value.
    pub fn render_not_found(&self, requested: &str) -> String {
        format!(
            "<section class=\"not-found\">\n<a class=\"back\" href=\"?\">Retour aux articles</a>\n<h2>Article introuvable</h2>\n<p>Aucun article ne correspond à l'identifiant « {} ».</p>\n</section>",
            EscapeHtml(requested)
        )
    }

    /// Rendered in place of any content when the blog couldn't be loaded.
    pub fn render_error(&self, err: &dyn Display) -> String {
        format!(
            "<section class=\"error\">\n<h2>Le blog est momentanément indisponible</h2>\n<p>{}</p>\n</section>",
            EscapeHtml(&err.to_string())
        )
    }
}

/// The link target for an article's detail view.
pub fn article_href(id: ArticleId) -> String {
    let query: String = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("articleId", &id.to_string())
        .finish();
    format!("?{}", query)
}
