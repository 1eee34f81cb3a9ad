//! Absolute-URL resolution for the second fetch stage.
//!
//! The fragment captured from a landing page may already be absolute, may be
//! protocol-relative, or may be a bare path on the comic's own host. No
//! escaping or normalization happens here; a malformed result is only
//! discovered at fetch time as an HTTP error.

use crate::comic::ComicSpec;

/// Combines a regex-captured fragment with the comic's host into an absolute
/// URL.
///
/// Rules, in order:
/// 1. A fragment starting with `http` (covers `https`) is used as-is.
/// 2. A protocol-relative `//host/...` fragment gets an `http:` prefix.
/// 3. Anything else is treated as path-relative: `host + "/" + fragment`.
#[must_use]
pub fn resolve(fragment: &str, spec: &ComicSpec) -> String {
    if fragment.starts_with("http") {
        fragment.to_string()
    } else if fragment.starts_with("//") {
        format!("http:{fragment}")
    } else {
        format!("{}/{fragment}", spec.host)
    }
}
