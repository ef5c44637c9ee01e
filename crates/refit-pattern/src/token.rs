//! Token scanners shared by the template binder and the search tree

use semver::Version;

/// Scan a concrete version token at `offset`.
///
/// Consumes the maximal run of version characters (`[0-9A-Za-z.+-]`) and
/// requires it to parse as a full semantic version. Returns the parsed
/// version and the token's byte length.
pub(crate) fn scan_version(text: &str, offset: usize) -> Option<(Version, usize)> {
    let rest = &text[offset..];
    let len = rest
        .find(|c: char| !is_version_char(c))
        .unwrap_or(rest.len());
    if len == 0 {
        return None;
    }
    Version::parse(&rest[..len]).ok().map(|v| (v, len))
}

fn is_version_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '+'
}

/// Scan a content-digest token (`algo:hex`) at `offset`.
///
/// The algorithm name is a lowercase alphanumeric run, the hex payload at
/// least 32 hex digits. Returns the token text and its byte length.
pub(crate) fn scan_digest(text: &str, offset: usize) -> Option<(String, usize)> {
    let rest = &text[offset..];

    let algo_len = rest
        .find(|c: char| !(c.is_ascii_lowercase() || c.is_ascii_digit()))
        .unwrap_or(rest.len());
    if algo_len == 0 || rest[algo_len..].chars().next() != Some(':') {
        return None;
    }

    let hex = &rest[algo_len + 1..];
    let hex_len = hex.find(|c: char| !c.is_ascii_hexdigit()).unwrap_or(hex.len());
    if hex_len < 32 {
        return None;
    }

    let len = algo_len + 1 + hex_len;
    Some((rest[..len].to_string(), len))
}
