//! Config loading and validation.
//!
//! The config file is JSON with comments. After comment stripping it is
//! walked against a schema of recognized keys: required-but-absent data is a
//! fatal [`ConfigError`], while unrecognized keys only collect structured
//! warnings so forward-compatible additions don't break older binaries.
//!
//! Recognized top-level keys: `directory`, `threads`, `timeout`,
//! `gocomics-url`, `gocomics-regexp`, and the `comics` array. Recognized
//! per-comic keys: `url`, `regexp`, `regmatch`, `output`, `days`, `referer`,
//! `gocomic`.

mod jsonc;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

use crate::comic::ComicSpec;
use crate::fetch::{DEFAULT_CONCURRENCY, DEFAULT_FETCH_TIMEOUT};
use crate::schedule::RunContext;

pub use jsonc::strip_comments;

/// Errors raised while loading or validating the config file.
///
/// All of these are fatal: the run must not start with a half-understood
/// comic list.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("cannot read config {path}: {source}")]
    Io {
        /// Path that failed to open.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid JSON after comment stripping.
    #[error("cannot parse config {path}: {source}")]
    Parse {
        /// Path that failed to parse.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The top-level document is not a JSON object.
    #[error("config root must be a JSON object")]
    RootNotObject,

    /// A recognized key holds a value of the wrong type.
    #[error("config key '{key}' has the wrong type (expected {expected})")]
    WrongType {
        /// The offending key.
        key: String,
        /// Human description of the expected type.
        expected: &'static str,
    },

    /// A comic entry has no URL and no shorthand.
    #[error("comic entry {id} has no url")]
    MissingUrl {
        /// Id (config position) of the entry.
        id: u32,
    },

    /// A comic URL does not start with an `http(s)://` scheme+authority.
    #[error("comic url is not a valid http(s) URL: {url}")]
    InvalidUrl {
        /// The offending URL.
        url: String,
    },

    /// A comic's extraction pattern does not compile.
    #[error("invalid regexp '{pattern}': {source}")]
    BadRegexp {
        /// The expanded pattern text.
        pattern: String,
        /// Underlying regex error.
        #[source]
        source: regex::Error,
    },

    /// `regmatch` selects a capture group the pattern does not have.
    #[error("regmatch {index} out of range: pattern has {groups} groups")]
    CaptureIndexOutOfRange {
        /// Requested capture group.
        index: usize,
        /// Number of groups in the compiled pattern (including group 0).
        groups: usize,
    },

    /// A `days` mask is not exactly 7 characters.
    #[error("skip calendar '{mask}' must be exactly 7 characters (Sunday first)")]
    BadSkipCalendar {
        /// The offending mask.
        mask: String,
    },

    /// A `gocomic` shorthand entry was used without the site-wide template.
    #[error("gocomic entry '{name}' requires gocomics-url and gocomics-regexp")]
    MissingSiteTemplate {
        /// The shorthand comic name.
        name: String,
    },
}

/// Site-wide URL template and extraction pattern backing `gocomic` shorthand
/// entries. The template's `%s` is replaced with the comic name.
#[derive(Debug, Clone)]
pub struct GocomicsSite {
    /// URL template containing `%s`.
    pub url_template: String,
    /// Extraction pattern shared by all shorthand entries.
    pub regexp: String,
}

/// One comic entry as it appears in the config, before validation.
#[derive(Debug, Default, Clone)]
pub struct RawComic {
    /// `url` key.
    pub url: Option<String>,
    /// `regexp` key.
    pub regexp: Option<String>,
    /// `regmatch` key.
    pub capture_index: usize,
    /// `output` key.
    pub output: Option<String>,
    /// `days` key.
    pub days: Option<String>,
    /// `referer` key.
    pub referer: Option<String>,
    /// `gocomic` shorthand key.
    pub gocomic: Option<String>,
}

/// Fully validated run configuration.
#[derive(Debug)]
pub struct Config {
    /// Output directory from the config, if set. CLI takes precedence.
    pub directory: Option<PathBuf>,
    /// Concurrency limit for the dispatcher.
    pub threads: usize,
    /// Per-fetch deadline.
    pub timeout: Duration,
    /// Validated, date-expanded comic specs in config order.
    pub comics: Vec<ComicSpec>,
    /// Non-fatal findings (unknown keys, empty entries) for the caller to log.
    pub warnings: Vec<String>,
}

impl Config {
    /// Reads and parses a config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, is not JSON after
    /// comment stripping, or contains an invalid comic entry.
    pub fn load(path: &Path, ctx: &RunContext) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path, ctx)
    }

    /// Parses config text. `path` is only used in error messages.
    ///
    /// # Errors
    ///
    /// Same as [`Config::load`], minus the I/O case.
    pub fn parse(text: &str, path: &Path, ctx: &RunContext) -> Result<Self, ConfigError> {
        let stripped = strip_comments(text);
        let doc: Value = serde_json::from_str(&stripped).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        let Value::Object(root) = doc else {
            return Err(ConfigError::RootNotObject);
        };

        let mut warnings = Vec::new();
        let mut directory = None;
        let mut threads = DEFAULT_CONCURRENCY;
        let mut timeout = DEFAULT_FETCH_TIMEOUT;
        let mut site_url: Option<String> = None;
        let mut site_regexp: Option<String> = None;
        let mut raw_comics: Vec<RawComic> = Vec::new();

        for (key, value) in &root {
            match key.as_str() {
                "directory" => directory = Some(PathBuf::from(expect_str(key, value)?)),
                "threads" => threads = expect_uint(key, value)? as usize,
                "timeout" => timeout = Duration::from_secs(expect_uint(key, value)?),
                "gocomics-url" => site_url = Some(expect_str(key, value)?.to_string()),
                "gocomics-regexp" => site_regexp = Some(expect_str(key, value)?.to_string()),
                "comics" => {
                    let Value::Array(entries) = value else {
                        return Err(ConfigError::WrongType {
                            key: key.clone(),
                            expected: "array",
                        });
                    };
                    for entry in entries {
                        match parse_comic_entry(entry, &mut warnings)? {
                            Some(raw) => raw_comics.push(raw),
                            None => warnings.push("empty comic entry".to_string()),
                        }
                    }
                }
                other => warnings.push(format!("unexpected config key '{other}'")),
            }
        }

        let site = match (site_url, site_regexp) {
            (Some(url_template), Some(regexp)) => Some(GocomicsSite {
                url_template,
                regexp,
            }),
            _ => None,
        };

        let mut comics = Vec::with_capacity(raw_comics.len());
        for (id, raw) in raw_comics.into_iter().enumerate() {
            comics.push(ComicSpec::build(id as u32, raw, site.as_ref(), ctx)?);
        }

        Ok(Self {
            directory,
            threads,
            timeout,
            comics,
            warnings,
        })
    }
}

/// Parses one entry of the `comics` array. Returns `None` for an empty
/// object, which the config format tolerates (a commented-out comic often
/// leaves one behind).
fn parse_comic_entry(
    entry: &Value,
    warnings: &mut Vec<String>,
) -> Result<Option<RawComic>, ConfigError> {
    let Value::Object(map) = entry else {
        return Err(ConfigError::WrongType {
            key: "comics[]".to_string(),
            expected: "object",
        });
    };
    if map.is_empty() {
        return Ok(None);
    }

    let mut raw = RawComic::default();
    for (key, value) in map {
        match key.as_str() {
            "url" => raw.url = Some(expect_str(key, value)?.to_string()),
            "regexp" => raw.regexp = Some(expect_str(key, value)?.to_string()),
            "regmatch" => raw.capture_index = expect_uint(key, value)? as usize,
            "output" => raw.output = Some(expect_str(key, value)?.to_string()),
            "days" => raw.days = Some(expect_str(key, value)?.to_string()),
            "referer" => raw.referer = Some(expect_str(key, value)?.to_string()),
            "gocomic" => raw.gocomic = Some(expect_str(key, value)?.to_string()),
            other => warnings.push(format!("unexpected comic key '{other}'")),
        }
    }
    Ok(Some(raw))
}

fn expect_str<'a>(key: &str, value: &'a Value) -> Result<&'a str, ConfigError> {
    value.as_str().ok_or_else(|| ConfigError::WrongType {
        key: key.to_string(),
        expected: "string",
    })
}

fn expect_uint(key: &str, value: &Value) -> Result<u64, ConfigError> {
    value.as_u64().ok_or_else(|| ConfigError::WrongType {
        key: key.to_string(),
        expected: "non-negative integer",
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ctx() -> RunContext {
        RunContext::for_date(NaiveDate::from_ymd_opt(2024, 3, 9).unwrap())
    }

    fn parse(text: &str) -> Result<Config, ConfigError> {
        Config::parse(text, Path::new("comics.json"), &ctx())
    }

    #[test]
    fn test_parse_full_config() {
        let config = parse(
            r#"{
                /* where the strips land */
                "directory": "/var/comics",
                "threads": 4,
                "timeout": 30,
                "comics": [
                    { "url": "http://a.com/%Y/%m/%d.gif", "days": "X-----X" },
                    { "url": "http://b.com/", "regexp": "src=\"([^\"]+)\"",
                      "regmatch": 1, "output": "bstrip", "referer": "url" }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(config.directory.as_deref(), Some(Path::new("/var/comics")));
        assert_eq!(config.threads, 4);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.comics.len(), 2);
        assert!(config.warnings.is_empty());

        assert_eq!(config.comics[0].url, "http://a.com/2024/03/09.gif");
        assert_eq!(config.comics[0].skip_calendar.as_deref(), Some("X-----X"));
        assert_eq!(config.comics[1].output_name, "bstrip");
        assert_eq!(config.comics[1].capture_index, 1);
        assert_eq!(config.comics[1].referer.as_deref(), Some("http://b.com/"));
    }

    #[test]
    fn test_parse_defaults() {
        let config = parse(r#"{ "comics": [ { "url": "http://a.com/" } ] }"#).unwrap();
        assert_eq!(config.threads, DEFAULT_CONCURRENCY);
        assert_eq!(config.timeout, DEFAULT_FETCH_TIMEOUT);
        assert!(config.directory.is_none());
        assert_eq!(config.comics[0].output_name, "comic0");
    }

    #[test]
    fn test_unknown_keys_warn_but_do_not_fail() {
        let config = parse(
            r#"{
                "randomize": 1,
                "comics": [ { "url": "http://a.com/", "color": "yes" } ]
            }"#,
        )
        .unwrap();
        assert_eq!(config.comics.len(), 1);
        assert_eq!(config.warnings.len(), 2);
        assert!(config.warnings.iter().any(|w| w.contains("randomize")));
        assert!(config.warnings.iter().any(|w| w.contains("color")));
    }

    #[test]
    fn test_empty_comic_entry_warns() {
        let config = parse(r#"{ "comics": [ {}, { "url": "http://a.com/" } ] }"#).unwrap();
        assert_eq!(config.comics.len(), 1);
        assert_eq!(config.warnings, vec!["empty comic entry".to_string()]);
    }

    #[test]
    fn test_gocomic_entries_use_site_template() {
        let config = parse(
            r#"{
                "gocomics-url": "http://www.gocomics.com/%s/",
                "gocomics-regexp": "src=\"([^\"]+)\"",
                "comics": [ { "gocomic": "peanuts" } ]
            }"#,
        )
        .unwrap();
        assert_eq!(config.comics[0].url, "http://www.gocomics.com/peanuts/");
        assert_eq!(config.comics[0].output_name, "peanuts");
    }

    #[test]
    fn test_gocomic_without_template_is_fatal() {
        let err = parse(r#"{ "comics": [ { "gocomic": "peanuts" } ] }"#).unwrap_err();
        assert!(matches!(err, ConfigError::MissingSiteTemplate { .. }));
    }

    #[test]
    fn test_invalid_json_reports_path() {
        let err = parse("{ not json").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("comics.json"), "expected path in: {msg}");
    }

    #[test]
    fn test_root_must_be_object() {
        let err = parse(r#"[ { "url": "http://a.com/" } ]"#).unwrap_err();
        assert!(matches!(err, ConfigError::RootNotObject));
    }

    #[test]
    fn test_wrong_type_for_threads() {
        let err = parse(r#"{ "threads": "ten" }"#).unwrap_err();
        assert!(matches!(err, ConfigError::WrongType { .. }));
        assert!(err.to_string().contains("threads"));
    }

    #[test]
    fn test_ids_are_monotonic_in_config_order() {
        let config = parse(
            r#"{ "comics": [
                { "url": "http://a.com/" },
                { "url": "http://b.com/" },
                { "url": "http://c.com/" }
            ] }"#,
        )
        .unwrap();
        let ids: Vec<u32> = config.comics.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }
}
