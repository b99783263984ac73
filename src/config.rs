//! Resolves the blog's configuration from an optional `feuillet.yaml` project
//! file and a few environment overrides. The result is a fully typed
//! [`Config`] (timezone and locale already parsed, strftime patterns already
//! checked) which is passed explicitly to the loader and the renderer.

use std::convert::TryFrom;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::Locale;
use chrono_tz::Tz;
use serde::Deserialize;
use tracing::debug;

use crate::article::{is_date_pattern, is_valid_pattern, DateFormat, MissingAuthor};
use crate::presenter::{Attribution, ListPreview};

/// The name of the project file searched for by [`Config::from_directory`].
pub const PROJECT_FILE: &str = "feuillet.yaml";

pub const DATA_FILE_VAR: &str = "FEUILLET_DATA_FILE";
pub const TIMEZONE_VAR: &str = "FEUILLET_TIMEZONE";
pub const LOCALE_VAR: &str = "FEUILLET_LOCALE";

const DEFAULT_FONT_URL: &str =
    "https://fonts.googleapis.com/css?family=Dosis:400,700|Nunito+Sans:300,400";

#[derive(Deserialize, Default)]
#[serde(default)]
struct Project {
    title: Option<String>,
    data_file: Option<PathBuf>,
    timezone: Option<String>,
    locale: Option<String>,
    date_input_format: Option<String>,
    date_output_format: Option<String>,
    footer_date_format: Option<String>,
    list_preview: ListPreview,
    on_missing_author: MissingAuthor,
    stylesheet_url: Option<String>,
    font_url: Option<String>,
    attribution: Option<Attribution>,
    template: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub title: String,
    pub data_file: PathBuf,
    pub timezone: Tz,
    pub locale: Locale,

    /// The `lang` attribute for the document, derived from `locale`
    /// (`fr_FR` becomes `fr`).
    pub lang: String,

    pub dates: DateFormat,
    pub footer_date_format: String,
    pub list_preview: ListPreview,
    pub missing_author: MissingAuthor,
    pub stylesheet_url: String,
    pub font_url: String,
    pub attribution: Attribution,

    /// A layout template to use instead of
    /// [`crate::page::DEFAULT_LAYOUT`].
    pub template: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            title: String::from("Vive la POO"),
            data_file: PathBuf::from("blog.json"),
            timezone: chrono_tz::Europe::Paris,
            locale: Locale::fr_FR,
            lang: String::from("fr"),
            dates: DateFormat::default(),
            footer_date_format: String::from("%A %d %B %Y"),
            list_preview: ListPreview::default(),
            missing_author: MissingAuthor::default(),
            stylesheet_url: String::from("./style.css"),
            font_url: String::from(DEFAULT_FONT_URL),
            attribution: Attribution::default(),
            template: None,
        }
    }
}

impl Config {
    /// Searches `dir` and its ancestors for a [`PROJECT_FILE`]. If none is
    /// found, the defaults are used with paths relative to `dir`.
    pub fn from_directory(dir: &Path) -> Result<Config> {
        let mut current = Some(dir);
        while let Some(d) = current {
            let path = d.join(PROJECT_FILE);
            if path.is_file() {
                return Config::from_project_file(&path);
            }
            current = d.parent();
        }
        debug!(dir = %dir.display(), "no project file found; using defaults");
        Config::from_project(Project::default(), dir)
    }

    /// Loads the configuration from a project file. Relative paths in the
    /// file are resolved against the file's directory.
    pub fn from_project_file(path: &Path) -> Result<Config> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Opening project file `{}`", path.display()))?;
        let project: Project = serde_yaml::from_reader(file)
            .with_context(|| format!("Loading configuration from `{}`", path.display()))?;
        let root = path.parent().ok_or_else(|| {
            anyhow!(
                "Can't get parent directory for provided project file path '{:?}'",
                path
            )
        })?;
        debug!(path = %path.display(), "loaded project file");
        Config::from_project(project, root)
    }

    fn from_project(project: Project, root: &Path) -> Result<Config> {
        let defaults = Config::default();
        let mut config = Config {
            title: project.title.unwrap_or(defaults.title),
            data_file: root.join(project.data_file.unwrap_or(defaults.data_file)),
            timezone: defaults.timezone,
            locale: defaults.locale,
            lang: defaults.lang,
            dates: DateFormat {
                input: project.date_input_format.unwrap_or(defaults.dates.input),
                output: project.date_output_format.unwrap_or(defaults.dates.output),
            },
            footer_date_format: project
                .footer_date_format
                .unwrap_or(defaults.footer_date_format),
            list_preview: project.list_preview,
            missing_author: project.on_missing_author,
            stylesheet_url: project.stylesheet_url.unwrap_or(defaults.stylesheet_url),
            font_url: project.font_url.unwrap_or(defaults.font_url),
            attribution: project.attribution.unwrap_or(defaults.attribution),
            template: project.template.map(|t| root.join(t)),
        };
        if let Some(timezone) = &project.timezone {
            config.set_timezone(timezone)?;
        }
        if let Some(locale) = &project.locale {
            config.set_locale(locale)?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Applies the `FEUILLET_*` overrides. `lookup` is usually
    /// `|name| std::env::var(name).ok()`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(data_file) = lookup(DATA_FILE_VAR) {
            self.data_file = PathBuf::from(data_file);
        }
        if let Some(timezone) = lookup(TIMEZONE_VAR) {
            self.set_timezone(&timezone)
                .with_context(|| format!("Reading `{}`", TIMEZONE_VAR))?;
        }
        if let Some(locale) = lookup(LOCALE_VAR) {
            self.set_locale(&locale)
                .with_context(|| format!("Reading `{}`", LOCALE_VAR))?;
        }
        Ok(())
    }

    fn set_timezone(&mut self, name: &str) -> Result<()> {
        self.timezone = name
            .parse::<Tz>()
            .map_err(|e| anyhow!("Unknown timezone `{}`: {}", name, e))?;
        Ok(())
    }

    fn set_locale(&mut self, name: &str) -> Result<()> {
        // Accept `fr_FR.UTF-8` as well as `fr_FR`.
        let base = name.split('.').next().unwrap_or(name);
        self.locale = Locale::try_from(base).map_err(|_| anyhow!("Unknown locale `{}`", name))?;
        self.lang = base
            .split(|c| c == '_' || c == '-')
            .next()
            .unwrap_or(base)
            .to_lowercase();
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        for (field, pattern) in &[
            ("date_input_format", &self.dates.input),
            ("footer_date_format", &self.footer_date_format),
        ] {
            if !is_valid_pattern(pattern) {
                return Err(anyhow!("Invalid `{}` pattern `{}`", field, pattern));
            }
        }
        // Article dates have no time or offset to display.
        if !is_date_pattern(&self.dates.output) {
            return Err(anyhow!(
                "Invalid `date_output_format` pattern `{}`: it must format a date",
                self.dates.output
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() -> Result<()> {
        let config = Config::from_project(Project::default(), Path::new("/srv/blog"))?;
        assert_eq!("Vive la POO", config.title);
        assert_eq!(PathBuf::from("/srv/blog/blog.json"), config.data_file);
        assert_eq!(chrono_tz::Europe::Paris, config.timezone);
        assert_eq!("fr", config.lang);
        assert_eq!(ListPreview::Content, config.list_preview);
        assert_eq!(MissingAuthor::Fail, config.missing_author);
        assert!(config.template.is_none());
        Ok(())
    }

    #[test]
    fn test_from_project_file() -> Result<()> {
        let config = Config::from_project_file(Path::new("./testdata/feuillet.yaml"))?;
        assert_eq!("Carnet de bord", config.title);
        assert_eq!(PathBuf::from("./testdata/blog.json"), config.data_file);
        assert_eq!(chrono_tz::America::Toronto, config.timezone);
        assert_eq!("fr", config.lang);
        assert_eq!(ListPreview::Title, config.list_preview);
        assert_eq!(MissingAuthor::Skip, config.missing_author);
        assert_eq!("/static/style.css", config.stylesheet_url);
        assert_eq!("dirago", config.attribution.label);
        Ok(())
    }

    #[test]
    fn test_from_directory_searches_parents() -> Result<()> {
        let root = tempfile::tempdir()?;
        let nested = root.path().join("a").join("b");
        std::fs::create_dir_all(&nested)?;
        let mut file = std::fs::File::create(root.path().join(PROJECT_FILE))?;
        writeln!(file, "title: Nested")?;
        writeln!(file, "data_file: data/blog.json")?;

        let config = Config::from_directory(&nested)?;
        assert_eq!("Nested", config.title);
        assert_eq!(root.path().join("data/blog.json"), config.data_file);
        Ok(())
    }

    #[test]
    fn test_invalid_settings() {
        let project = Project {
            timezone: Some("Mars/Olympus_Mons".to_owned()),
            ..Project::default()
        };
        assert!(Config::from_project(project, Path::new(".")).is_err());

        let project = Project {
            locale: Some("xx_YY".to_owned()),
            ..Project::default()
        };
        assert!(Config::from_project(project, Path::new(".")).is_err());

        let project = Project {
            date_output_format: Some("%Q".to_owned()),
            ..Project::default()
        };
        assert!(Config::from_project(project, Path::new(".")).is_err());
    }

    #[test]
    fn test_output_pattern_needs_date_fields_only() {
        for pattern in &["%d/%m/%Y %Hh", "%d/%m/%Y %M", "%Y-%m-%d %z"] {
            let project = Project {
                date_output_format: Some(pattern.to_string()),
                ..Project::default()
            };
            let err = Config::from_project(project, Path::new("./testdata")).unwrap_err();
            assert!(err.to_string().contains("date_output_format"), "{}", err);
        }

        let project = Project {
            date_output_format: Some("%A %e %B %Y".to_owned()),
            ..Project::default()
        };
        assert!(Config::from_project(project, Path::new("./testdata")).is_ok());
    }

    #[test]
    fn test_overrides() -> Result<()> {
        let vars: HashMap<&str, &str> = vec![
            (DATA_FILE_VAR, "/tmp/other.json"),
            (TIMEZONE_VAR, "UTC"),
            (LOCALE_VAR, "en_US.UTF-8"),
        ]
        .into_iter()
        .collect();
        let mut config = Config::default();
        config.apply_overrides(|name| vars.get(name).map(|v| v.to_string()))?;
        assert_eq!(PathBuf::from("/tmp/other.json"), config.data_file);
        assert_eq!(chrono_tz::UTC, config.timezone);
        assert_eq!(Locale::en_US, config.locale);
        assert_eq!("en", config.lang);

        let mut config = Config::default();
        assert!(config
            .apply_overrides(|name| match name {
                TIMEZONE_VAR => Some("Nowhere".to_owned()),
                _ => None,
            })
            .is_err());
        Ok(())
    }
}
