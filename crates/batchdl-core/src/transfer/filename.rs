//! Local file names for transfers: URL path first, `Content-Disposition`
//! once the server has answered.

/// Used when neither the URL nor the response yields a usable name.
pub const FALLBACK_FILENAME: &str = "download.bin";

const NAME_MAX: usize = 255;

/// Candidate name from the last non-empty URL path segment (percent-decoded).
pub fn name_from_url(url: &str) -> String {
    let segment = url::Url::parse(url).ok().and_then(|parsed| {
        parsed
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .map(percent_decode)
    });
    segment
        .map(|s| sanitize(&s))
        .filter(|s| is_usable(s))
        .unwrap_or_else(|| FALLBACK_FILENAME.to_string())
}

/// Name announced by a `Content-Disposition` header value, if any.
/// `filename*=` (RFC 5987) wins over `filename=`.
pub fn name_from_disposition(header_value: &str) -> Option<String> {
    let mut plain = None;
    let mut extended = None;
    for param in header_value.split(';').map(str::trim) {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim();
        if key.eq_ignore_ascii_case("filename*") {
            // charset'lang'value; only the value matters once decoded as UTF-8.
            let encoded = value.splitn(3, '\'').nth(2).unwrap_or(value);
            extended = Some(percent_decode(encoded.trim_matches('"')));
        } else if key.eq_ignore_ascii_case("filename") {
            plain = Some(unquote(value));
        }
    }
    extended
        .into_iter()
        .chain(plain)
        .map(|s| sanitize(&s))
        .find(|s| is_usable(s))
}

/// Make `name` safe as a single path component: no separators, control or
/// reserved characters, no leading/trailing dots or spaces, bounded length.
pub fn sanitize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        let bad = c.is_control() || matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|');
        if bad {
            if !out.ends_with('_') {
                out.push('_');
            }
        } else {
            out.push(c);
        }
    }
    let trimmed = out.trim_matches(|c: char| c == '.' || c == '_' || c.is_whitespace());
    let mut end = trimmed.len().min(NAME_MAX);
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    trimmed[..end].to_string()
}

fn is_usable(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".."
}

fn unquote(value: &str) -> String {
    let Some(inner) = value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) else {
        return value.to_string();
    };
    let mut out = String::with_capacity(inner.len());
    let mut escaped = false;
    for c in inner.chars() {
        if escaped || c != '\\' {
            out.push(c);
            escaped = false;
        } else {
            escaped = true;
        }
    }
    out
}

fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(b) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(b);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
