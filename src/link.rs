//! `Link` header parsing (RFC 8288), as used for pagination by REST APIs.

use std::collections::BTreeMap;

/// One link-value of a `Link` header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Link {
    pub url: String,
    pub rel: String,
    /// Remaining parameters, keys lower-cased, quotes stripped.
    pub params: BTreeMap<String, String>,
}

/// Parses a `Link` header value into its link-values.
///
/// Malformed segments are skipped. A `rel` listing several relation types
/// yields one [`Link`] per type.
pub fn parse_link_header(value: &str) -> Vec<Link> {
    let mut links = Vec::new();

    for segment in split_outside_brackets(value) {
        let mut parts = segment.split(';');
        let Some(target) = parts.next().map(str::trim) else {
            continue;
        };
        let Some(url) = target
            .strip_prefix('<')
            .and_then(|rest| rest.strip_suffix('>'))
        else {
            continue;
        };

        let mut rels = String::new();
        let mut params = BTreeMap::new();
        for param in parts {
            let Some((key, val)) = param.split_once('=') else {
                continue;
            };
            let key = key.trim().to_ascii_lowercase();
            let val = val.trim().trim_matches('"').to_owned();
            if key == "rel" {
                rels = val;
            } else {
                params.insert(key, val);
            }
        }

        for rel in rels.split_whitespace() {
            links.push(Link {
                url: url.trim().to_owned(),
                rel: rel.to_owned(),
                params: params.clone(),
            });
        }
    }

    links
}

/// Returns the URL for `rel` (`"next"`, `"prev"`, `"first"`, `"last"`, ...)
/// or an empty string when it is absent or the header is unparsable.
///
/// ```
/// use backoff_http::header_link;
///
/// let link = r#"<https://x/2>; rel="next", <https://x/1>; rel="prev""#;
/// assert_eq!(header_link(link, "next"), "https://x/2");
/// assert_eq!(header_link(link, "last"), "");
/// ```
pub fn header_link(value: &str, rel: &str) -> String {
    parse_link_header(value)
        .into_iter()
        .find(|link| link.rel.eq_ignore_ascii_case(rel))
        .map(|link| link.url)
        .unwrap_or_default()
}

// Commas inside `<...>` belong to the URL.
fn split_outside_brackets(value: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (index, ch) in value.char_indices() {
        match ch {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                segments.push(&value[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    segments.push(&value[start..]);
    segments
}
