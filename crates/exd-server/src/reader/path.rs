//! Locator to filesystem path resolution.
//!
//! A caller names a source with a locator string. `file:` URIs are decoded
//! into local paths (a host other than `localhost` becomes a UNC share), and
//! bare paths are accepted as they are. The result is lexically normalized
//! and doubles as the shared-source cache key, so two spellings of the same
//! file share one opened table.
//!
//! Resolution does no I/O; whether the path exists is checked at open time.

use std::borrow::Cow;
use std::path::{Path, PathBuf, MAIN_SEPARATOR};

use percent_encoding::percent_decode_str;
use url::Url;

use super::error::{ReaderError, ReaderResult};

/// Resolves a locator into a canonical local path.
pub fn resolve_path(locator: &str) -> ReaderResult<PathBuf> {
    match Url::parse(locator) {
        // Single-letter schemes are Windows drive letters, not URIs.
        Ok(url) if url.scheme().len() > 1 => {
            if url.scheme() != "file" {
                return Err(ReaderError::UnsupportedScheme {
                    scheme: url.scheme().to_string(),
                    url: locator.to_string(),
                });
            }

            let decoded = percent_decode_str(url.path()).decode_utf8_lossy();
            let host = url
                .host_str()
                .filter(|host| !host.is_empty() && *host != "localhost");

            let raw = match host {
                Some(host) => format!("{MAIN_SEPARATOR}{MAIN_SEPARATOR}{host}{decoded}"),
                None => strip_drive_slash(&decoded).to_string(),
            };
            Ok(normalize(&raw))
        }
        _ => Ok(normalize(&percent_decode_str(locator).decode_utf8_lossy())),
    }
}

/// Display name of a resolved source: the final path component.
pub fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(windows)]
fn strip_drive_slash(path: &str) -> Cow<'_, str> {
    let bytes = path.as_bytes();
    if bytes.len() >= 3 && bytes[0] == b'/' && bytes[1].is_ascii_alphabetic() && bytes[2] == b':'
    {
        Cow::Borrowed(&path[1..])
    } else {
        Cow::Borrowed(path)
    }
}

#[cfg(not(windows))]
fn strip_drive_slash(path: &str) -> Cow<'_, str> {
    Cow::Borrowed(path)
}

fn is_separator(c: char) -> bool {
    c == '/' || c == MAIN_SEPARATOR
}

/// Splits off the part of a path that `..` can never climb past.
fn split_prefix(raw: &str) -> (String, &str) {
    #[cfg(windows)]
    {
        let bytes = raw.as_bytes();
        if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
            let rest = &raw[2..];
            return match rest.strip_prefix(is_separator) {
                Some(rest) => (format!("{}{MAIN_SEPARATOR}", &raw[..2]), rest),
                None => (raw[..2].to_string(), rest),
            };
        }
    }

    let Some(after_first) = raw.strip_prefix(is_separator) else {
        return (String::new(), raw);
    };
    match after_first.strip_prefix(is_separator) {
        // Exactly two separators mark a network share.
        Some(after_second) if !after_second.starts_with(is_separator) => {
            (format!("{MAIN_SEPARATOR}{MAIN_SEPARATOR}"), after_second)
        }
        _ => (MAIN_SEPARATOR.to_string(), after_first),
    }
}

fn normalize(raw: &str) -> PathBuf {
    let (prefix, rest) = split_prefix(raw);
    let rooted = !prefix.is_empty();

    let mut segments: Vec<&str> = Vec::new();
    for segment in rest.split(is_separator) {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                _ if rooted => {}
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }

    let joined = segments.join(&MAIN_SEPARATOR.to_string());
    if prefix.is_empty() && joined.is_empty() {
        return PathBuf::from(".");
    }
    PathBuf::from(format!("{prefix}{joined}"))
}
