//! The entry point for rendering a page. [`PageController::render_page`]
//! loads the blog, picks a [`View`] from the request's query string, and
//! assembles the final document from the [`Presenter`] fragments and the
//! layout template.

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::path::Path;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use gtmpl::{Context, Template, Value};
use tracing::{debug, error, warn};

use crate::article::ArticleId;
use crate::blog::{Blog, LoadOptions};
use crate::config::Config;
use crate::escape::{EscapeHref, EscapeHtml};
use crate::presenter::Presenter;

/// The built-in layout. Templates receive `lang`, `title`, `font_url`,
/// `stylesheet_url`, `header`, `body`, and `footer`; every value is already
/// escaped or rendered HTML.
pub const DEFAULT_LAYOUT: &str = r#"<!doctype html>
<html lang="{{.lang}}">
<head>
    <meta charset="UTF-8">
    <meta name="viewport"
          content="width=device-width, user-scalable=no, initial-scale=1.0, maximum-scale=1.0, minimum-scale=1.0">
    <meta http-equiv="X-UA-Compatible" content="ie=edge">
    <title>{{.title}}</title>
    <link href="{{.font_url}}" rel="stylesheet">
    <link href="{{.stylesheet_url}}" rel="stylesheet">
</head>
<body>
{{.header}}
{{.body}}
{{.footer}}
</body>
</html>
"#;

/// The query parameter which selects an article.
pub const ARTICLE_ID_PARAM: &str = "articleId";

/// The request parameters relevant to rendering.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Query {
    /// The raw `articleId` value, if present. When the parameter is
    /// repeated, the last occurrence wins.
    pub article_id: Option<String>,
}

impl Query {
    /// Parses a URL query string, with or without the leading `?`.
    pub fn parse(raw: &str) -> Query {
        let raw = raw.strip_prefix('?').unwrap_or(raw);
        Query {
            article_id: url::form_urlencoded::parse(raw.as_bytes())
                .filter(|(key, _)| key == ARTICLE_ID_PARAM)
                .map(|(_, value)| value.into_owned())
                .last(),
        }
    }

    /// Selects the view for this request. A present but non-integer
    /// `articleId` is returned as the error so it can be reported.
    pub fn view(&self) -> std::result::Result<View, &str> {
        match &self.article_id {
            None => Ok(View::List),
            Some(raw) => raw
                .trim()
                .parse::<ArticleId>()
                .map(View::Detail)
                .map_err(|_| raw.as_str()),
        }
    }
}

/// The two views a page can show.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum View {
    List,
    Detail(ArticleId),
}

/// How a render turned out. The HTML is always a complete document.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Ok,

    /// The requested article doesn't exist.
    NotFound,

    /// The blog couldn't be loaded; the body is an error message.
    Error,
}

/// A rendered HTML document and the outcome that produced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedPage {
    pub status: Status,
    pub html: String,
}

/// Renders complete pages. Holds the resolved configuration and the parsed
/// layout template; each call to [`PageController::render_page`] loads the
/// data file afresh.
pub struct PageController<'a> {
    config: &'a Config,
    layout: Template,
}

impl<'a> PageController<'a> {
    /// Constructs a controller, parsing the configured layout template (or
    /// [`DEFAULT_LAYOUT`]).
    pub fn new(config: &'a Config) -> Result<PageController<'a>> {
        let layout = match &config.template {
            Some(path) => parse_template(&read_template(path)?)?,
            None => parse_template(DEFAULT_LAYOUT)?,
        };
        Ok(PageController { config, layout })
    }

    fn presenter(&self) -> Presenter<'_> {
        Presenter {
            locale: self.config.locale,
            footer_date_format: &self.config.footer_date_format,
            list_preview: self.config.list_preview,
            attribution: &self.config.attribution,
        }
    }

    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            dates: self.config.dates.clone(),
            missing_author: self.config.missing_author,
        }
    }

    /// Renders the page for `query`. `now` should be sampled once per
    /// request; it is converted to the configured timezone for the footer.
    /// Load failures produce an error page rather than an [`Err`]; only
    /// layout template failures are returned as errors.
    pub fn render_page(&self, query: &Query, now: DateTime<Utc>) -> Result<RenderedPage> {
        let today = now.with_timezone(&self.config.timezone);
        match Blog::load(
            &self.config.title,
            &self.config.data_file,
            &self.load_options(),
        ) {
            Ok(blog) => self.render_blog(&blog, query, &today),
            Err(err) => {
                error!(
                    error = %err,
                    kind = ?err.kind(),
                    data_file = %self.config.data_file.display(),
                    "failed to load blog"
                );
                let body = self.presenter().render_error(&err);
                self.assemble(&self.config.title, Status::Error, body, &today)
            }
        }
    }

    /// Renders the page for `query` from an already-loaded [`Blog`].
    pub fn render_blog(
        &self,
        blog: &Blog,
        query: &Query,
        today: &DateTime<Tz>,
    ) -> Result<RenderedPage> {
        let presenter = self.presenter();
        let (status, body) = match query.view() {
            Ok(View::List) => {
                debug!(articles = blog.articles.len(), "rendering list view");
                (
                    Status::Ok,
                    presenter.render_article_list(blog.articles.as_slice()),
                )
            }
            Ok(View::Detail(id)) => match blog.articles.find(id) {
                Some(article) => {
                    debug!(article_id = id, "rendering detail view");
                    (Status::Ok, presenter.render_article(article))
                }
                None => {
                    warn!(article_id = id, "no article with requested id");
                    (Status::NotFound, presenter.render_not_found(&id.to_string()))
                }
            },
            Err(raw) => {
                warn!(article_id = raw, "malformed article id");
                (Status::NotFound, presenter.render_not_found(raw))
            }
        };
        self.assemble(&blog.title, status, body, today)
    }

    fn assemble(
        &self,
        title: &str,
        status: Status,
        body: String,
        today: &DateTime<Tz>,
    ) -> Result<RenderedPage> {
        let presenter = self.presenter();
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("lang".to_owned(), Value::String(self.config.lang.clone()));
        m.insert(
            "title".to_owned(),
            Value::String(EscapeHtml(title).to_string()),
        );
        m.insert(
            "font_url".to_owned(),
            Value::String(EscapeHref(&self.config.font_url).to_string()),
        );
        m.insert(
            "stylesheet_url".to_owned(),
            Value::String(EscapeHref(&self.config.stylesheet_url).to_string()),
        );
        m.insert(
            "header".to_owned(),
            Value::String(presenter.render_header(title)),
        );
        m.insert("body".to_owned(), Value::String(body));
        m.insert(
            "footer".to_owned(),
            Value::String(presenter.render_footer(today)),
        );

        let mut out: Vec<u8> = Vec::new();
        self.layout
            .execute(&mut out, &Context::from(Value::Object(m))?)?;
        Ok(RenderedPage {
            status,
            html: String::from_utf8(out).map_err(Error::Utf8)?,
        })
    }
}

fn read_template(path: &Path) -> Result<String> {
    use std::io::Read;
    let mut contents = String::new();
    File::open(path)
        .and_then(|mut f| f.read_to_string(&mut contents))
        .map_err(|err| Error::OpenTemplateFile {
            path: path.to_owned(),
            err,
        })?;
    Ok(contents)
}

fn parse_template(contents: &str) -> Result<Template> {
    let mut template = Template::default();
    template.parse(contents).map_err(Error::ParseTemplate)?;
    Ok(template)
}

/// The result of a fallible page operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem with the layout template. Problems with the blog data
/// itself are rendered as error pages instead.
#[derive(Debug)]
pub enum Error {
    /// Returned for I/O problems while opening the template file.
    OpenTemplateFile {
        path: std::path::PathBuf,
        err: std::io::Error,
    },

    /// Returned for errors parsing the template.
    ParseTemplate(String),

    /// Returned for errors executing the template.
    Template(String),

    /// Returned when the template produces invalid UTF-8.
    Utf8(std::string::FromUtf8Error),
}

impl From<String> for Error {
    /// Converts a template error message ([`String`]) into an [`Error`]. This
    /// allows us to use the `?` operator for fallible template operations.
    fn from(err: String) -> Error {
        Error::Template(err)
    }
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as presentable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::OpenTemplateFile { path, err } => {
                write!(f, "Opening template file '{}': {}", path.display(), err)
            }
            Error::ParseTemplate(err) => write!(f, "Parsing template: {}", err),
            Error::Template(err) => write!(f, "Rendering template: {}", err),
            Error::Utf8(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::OpenTemplateFile { path: _, err } => Some(err),
            Error::ParseTemplate(_) => None,
            Error::Template(_) => None,
            Error::Utf8(err) => Some(err),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::escape::EscapeHtml;
    use chrono::TimeZone;
    use std::io::Write;

    fn config() -> Config {
        let mut config = Config::default();
        config.data_file = "./testdata/blog.json".into();
        config
    }

    fn now() -> DateTime<Utc> {
        // 23:30 UTC is already Saturday in Paris.
        Utc.with_ymd_and_hms(2024, 5, 3, 23, 30, 0).unwrap()
    }

    fn render(config: &Config, query: &str) -> RenderedPage {
        PageController::new(config)
            .unwrap()
            .render_page(&Query::parse(query), now())
            .unwrap()
    }

    #[test]
    fn test_query_parse() {
        assert_eq!(Query::default(), Query::parse(""));
        assert_eq!(Ok(View::List), Query::parse("").view());
        assert_eq!(Ok(View::List), Query::parse("?page=2").view());
        assert_eq!(Ok(View::Detail(7)), Query::parse("articleId=7").view());
        assert_eq!(Ok(View::Detail(7)), Query::parse("?articleId=7").view());
        assert_eq!(
            Ok(View::Detail(8)),
            Query::parse("articleId=7&articleId=8").view()
        );
        assert_eq!(Err("abc"), Query::parse("articleId=abc").view());
        assert_eq!(Err(""), Query::parse("articleId=").view());
    }

    #[test]
    fn test_list_view() {
        let page = render(&config(), "");
        assert_eq!(Status::Ok, page.status);
        assert!(page.html.starts_with("<!doctype html>"));
        assert!(page.html.contains("<html lang=\"fr\">"));
        assert!(page.html.contains("<title>Vive la POO</title>"));
        assert!(page.html.contains("<header>Vive la POO</header>"));
        assert!(page.html.contains("Nous sommes le samedi 04 mai 2024"));
        assert!(page.html.contains("href=\"./style.css\""));
        assert_eq!(4, page.html.matches("<li>").count());

        let positions: Vec<usize> = ["?articleId=1", "?articleId=2", "?articleId=3", "?articleId=4"]
            .iter()
            .map(|href| page.html.find(href).expect("article link"))
            .collect();
        let mut sorted = positions.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, positions);
    }

    #[test]
    fn test_detail_view() {
        let page = render(&config(), "articleId=1");
        assert_eq!(Status::Ok, page.status);
        assert!(page.html.contains("<h2>Bonjour</h2>"));
        assert!(page.html.contains("<p>Hello world</p>"));
        assert!(page.html.contains("par B.Lee, le 01/05/2024"));
        assert!(page.html.contains("<footer>"));
        assert_eq!(page, render(&config(), "articleId=1"));
    }

    #[test]
    fn test_detail_view_unknown_id() {
        let page = render(&config(), "articleId=404");
        assert_eq!(Status::NotFound, page.status);
        assert!(page.html.contains("Article introuvable"));
        assert!(page.html.contains("<header>Vive la POO</header>"));
        assert!(page.html.contains("<footer>"));

        let page = render(&config(), "articleId=abc");
        assert_eq!(Status::NotFound, page.status);
        assert!(page.html.contains("« abc »"));
    }

    #[test]
    fn test_error_page() {
        let mut config = config();
        config.data_file = "./testdata/missing.json".into();
        let page = render(&config, "articleId=1");
        assert_eq!(Status::Error, page.status);
        assert!(page.html.contains("<header>Vive la POO</header>"));
        assert!(page.html.contains("class=\"error\""));
        assert!(page.html.contains("missing.json"));
        assert!(page.html.contains("<footer>"));
    }

    #[test]
    fn test_error_page_for_invalid_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ \"authors\": [").unwrap();
        let mut config = config();
        config.data_file = file.path().to_owned();
        let page = render(&config, "");
        assert_eq!(Status::Error, page.status);
        assert!(page.html.contains("class=\"error\""));
        assert!(page.html.contains("Parsing data file"));
        assert!(page.html.contains("<header>Vive la POO</header>"));
        assert!(page.html.contains("<footer>"));
    }

    #[test]
    fn test_error_page_for_schema_errors() {
        let documents = vec![
            (
                r#"{"authors": []}"#,
                "missing `articles` section",
            ),
            (
                r#"{"authors": [{"id": 1, "firstname": "Bob"}], "articles": []}"#,
                "malformed `authors` section",
            ),
        ];
        for (contents, message) in documents {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            write!(file, "{}", contents).unwrap();
            let mut config = config();
            config.data_file = file.path().to_owned();
            let page = render(&config, "articleId=1");
            assert_eq!(Status::Error, page.status);
            assert!(page.html.contains(&EscapeHtml(message).to_string()), "{}", page.html);
            assert!(page.html.contains("<footer>"));
        }
    }

    #[test]
    fn test_error_page_for_unformattable_dates() {
        let mut config = config();
        config.dates.output = String::from("%d/%m/%Y %Hh");
        let page = render(&config, "");
        assert_eq!(Status::Error, page.status);
        assert!(page.html.contains("date pattern `%d/%m/%Y %Hh` can't format a date"));
    }

    #[test]
    fn test_custom_layout() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "<main>{{{{.header}}}}|{{{{.body}}}}</main>").unwrap();
        let mut config = config();
        config.template = Some(file.path().to_owned());
        let page = render(&config, "articleId=1");
        assert!(page.html.starts_with("<main><header>Vive la POO</header>|<article>"));
        assert!(page.html.ends_with("</article></main>"));
    }

    #[test]
    fn test_bad_layout() {
        let mut config = config();
        config.template = Some("./testdata/missing.html".into());
        match PageController::new(&config) {
            Err(Error::OpenTemplateFile { .. }) => {}
            Err(err) => panic!("wanted OpenTemplateFile, got {}", err),
            Ok(_) => panic!("wanted OpenTemplateFile, got a controller"),
        }
    }
}
