use std::borrow::Cow;

use percent_encoding::percent_decode_str;
use regex::Regex;

use crate::domain::FormatKind;

const FALLBACK_PREFIX: &str = "alexDownload_";

/// Picks the name a downloaded payload is saved under.
///
/// A `filename` parameter in the `Content-Disposition` header wins; otherwise
/// the name is `alexDownload_<millis>` with the rendition's default extension.
pub fn resolve_filename(
    content_disposition: Option<&str>,
    format: FormatKind,
    now_millis: u128,
) -> String {
    content_disposition
        .and_then(filename_from_content_disposition)
        .unwrap_or_else(|| {
            format!(
                "{}{}.{}",
                FALLBACK_PREFIX,
                now_millis,
                format.default_extension()
            )
        })
}

/// Extracts the `filename` parameter of a `Content-Disposition` value.
///
/// Quoted values may contain `;`. For `filename*` the `charset'lang'` prefix
/// is dropped. The value is percent-decoded when it decodes cleanly to UTF-8
/// and kept as-is otherwise.
pub fn filename_from_content_disposition(header: &str) -> Option<String> {
    let re = Regex::new(r#"(?i)filename([^;=\n]*)=("[^\n]*?"|'[^\n]*?'|[^;\n]*)"#).ok()?;
    let caps = re.captures(header)?;

    let mut raw = caps[2].trim_matches(|c| c == '"' || c == '\'');
    if caps[1].trim() == "*" {
        raw = strip_charset_prefix(raw);
    }
    if raw.is_empty() {
        return None;
    }

    let decoded = decode_component(raw).map_or_else(|| raw.to_string(), Cow::into_owned);
    if decoded.is_empty() {
        None
    } else {
        Some(decoded)
    }
}

/// `utf-8'en'name` -> `name`. Values without a token charset are left alone.
fn strip_charset_prefix(value: &str) -> &str {
    let Some((charset, rest)) = value.split_once('\'') else {
        return value;
    };
    let Some((_language, name)) = rest.split_once('\'') else {
        return value;
    };

    let is_token = charset
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !charset.is_empty() && is_token {
        name
    } else {
        value
    }
}

/// Strict percent-decoding: every `%` must start a two-digit hex escape and the
/// result must be valid UTF-8.
fn decode_component(raw: &str) -> Option<Cow<'_, str>> {
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let escape = bytes.get(i + 1..i + 3)?;
            if !escape.iter().all(u8::is_ascii_hexdigit) {
                return None;
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    percent_decode_str(raw).decode_utf8().ok()
}
