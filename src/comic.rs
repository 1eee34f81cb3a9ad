//! Per-comic immutable specs built from config entries.
//!
//! A [`ComicSpec`] is constructed once at startup and never mutated. URL and
//! regexp templates are expanded against the run date at build time, so a
//! `%m` token becomes this run's month digits before any fetch happens.

use regex::Regex;
use tracing::warn;
use url::Url;

use crate::config::{ConfigError, GocomicsSite, RawComic};
use crate::schedule::RunContext;

/// Immutable per-comic configuration.
///
/// Built from a config entry via [`ComicSpec::build`]; ids are assigned in
/// config order and are monotonically increasing.
#[derive(Debug, Clone)]
pub struct ComicSpec {
    /// Unique id assigned at parse time.
    pub id: u32,
    /// Landing-page URL, already date-expanded.
    pub url: String,
    /// `scheme://authority` of `url`, used to resolve path-relative image links.
    pub host: String,
    /// Optional extraction pattern applied to the landing-page body.
    pub regexp: Option<Regex>,
    /// Which capture group of `regexp` supplies the image URL.
    pub capture_index: usize,
    /// Base name for the output file; the sniffed extension is appended.
    pub output_name: String,
    /// Optional 7-character weekday mask, Sunday first; 'X' means skip.
    pub skip_calendar: Option<String>,
    /// Optional Referer header value. The literal `"url"` in the config means
    /// the comic's own URL.
    pub referer: Option<String>,
}

impl ComicSpec {
    /// Builds a spec from a parsed config entry.
    ///
    /// Shorthand `gocomic` entries take the site-wide URL template and
    /// extraction pattern, and the comic name as output name. Templates are
    /// date-expanded, the host is extracted, the regexp is compiled, and the
    /// capture index is checked against the pattern's group count.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for an entry with no URL, a URL without an
    /// `http(s)` scheme, a malformed skip calendar, an invalid regexp, a
    /// capture index the pattern cannot satisfy, or a shorthand entry when no
    /// site-wide template was configured.
    pub fn build(
        id: u32,
        raw: RawComic,
        site: Option<&GocomicsSite>,
        ctx: &RunContext,
    ) -> Result<Self, ConfigError> {
        let (url_template, regexp_template, output_name) = if let Some(name) = raw.gocomic {
            let site = site.ok_or_else(|| ConfigError::MissingSiteTemplate { name: name.clone() })?;
            let url = site.url_template.replace("%s", &name);
            (url, Some(site.regexp.clone()), name)
        } else {
            let url = raw.url.ok_or(ConfigError::MissingUrl { id })?;
            let output = raw.output.unwrap_or_else(|| format!("comic{id}"));
            (url, raw.regexp, output)
        };

        let url = expand_date_tokens(&url_template, ctx);
        let host = extract_host(&url)?;

        let regexp = match regexp_template {
            Some(template) => {
                let expanded = expand_date_tokens(&template, ctx);
                let compiled = Regex::new(&expanded).map_err(|source| ConfigError::BadRegexp {
                    pattern: expanded,
                    source,
                })?;
                if raw.capture_index >= compiled.captures_len() {
                    return Err(ConfigError::CaptureIndexOutOfRange {
                        index: raw.capture_index,
                        groups: compiled.captures_len(),
                    });
                }
                Some(compiled)
            }
            None => None,
        };

        if let Some(mask) = &raw.days {
            if mask.len() != 7 {
                return Err(ConfigError::BadSkipCalendar { mask: mask.clone() });
            }
        }

        // "referer": "url" means send the comic's own URL.
        let referer = raw.referer.map(|r| if r == "url" { url.clone() } else { r });

        Ok(Self {
            id,
            url,
            host,
            regexp,
            capture_index: raw.capture_index,
            output_name,
            skip_calendar: raw.days,
            referer,
        })
    }
}

/// Extracts `scheme://authority` from a comic URL.
///
/// Only `http` and `https` are accepted; anything else is a config error
/// rather than a silent empty host that would corrupt relative-link
/// resolution later.
fn extract_host(url: &str) -> Result<String, ConfigError> {
    let parsed = Url::parse(url).map_err(|_| ConfigError::InvalidUrl {
        url: url.to_string(),
    })?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(ConfigError::InvalidUrl {
            url: url.to_string(),
        });
    }
    Ok(format!("{}://{}", parsed.scheme(), parsed.authority()))
}

/// Expands date tokens in a URL or regexp template against the run date.
///
/// Supported tokens: `%Y` `%y` `%m` `%d` `%j` and `%%`. An unrecognized
/// token is left intact with a warning; regexps may legitimately contain
/// percent signs.
#[must_use]
pub fn expand_date_tokens(template: &str, ctx: &RunContext) -> String {
    use chrono::Datelike;

    if !template.contains('%') {
        return template.to_string();
    }

    let date = ctx.today;
    let mut out = String::with_capacity(template.len() + 8);
    let mut chars = template.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('Y') => out.push_str(&format!("{:04}", date.year())),
            Some('y') => out.push_str(&format!("{:02}", date.year() % 100)),
            Some('m') => out.push_str(&format!("{:02}", date.month())),
            Some('d') => out.push_str(&format!("{:02}", date.day())),
            Some('j') => out.push_str(&format!("{:03}", date.ordinal())),
            Some('%') => out.push('%'),
            Some(other) => {
                warn!(template, token = %format!("%{other}"), "unrecognized date token left as-is");
                out.push('%');
                out.push(other);
            }
            None => out.push('%'),
        }
    }
    out
}
