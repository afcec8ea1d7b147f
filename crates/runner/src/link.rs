//! `Link` header parsing (`<url>; rel="..."; title="..."`, comma-separated).
//!
//! Entries without a `rel` parameter and entries that do not parse are
//! skipped with a warning.

use tracing::warn;

/// Title of the link that points at a completion monitor.
pub const MONITOR_TITLE: &str = "monitor";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub url: String,
    pub rel: String,
    pub title: Option<String>,
}

/// Parse every well-formed entry of a `Link` header value.
pub fn parse_links(header: &str) -> Vec<Link> {
    split_entries(header)
        .into_iter()
        .filter(|entry| !entry.trim().is_empty())
        .filter_map(|entry| {
            let link = parse_entry(entry);
            if link.is_none() {
                warn!(entry = entry.trim(), "skipping malformed Link entry");
            }
            link
        })
        .collect()
}

/// The link titled `monitor`, if any.
pub fn monitor_link(header: &str) -> Option<Link> {
    parse_links(header)
        .into_iter()
        .find(|link| link.title.as_deref() == Some(MONITOR_TITLE))
}

/// Split on commas that sit outside `<...>` and outside quotes.
fn split_entries(header: &str) -> Vec<&str> {
    let mut entries = Vec::new();
    let (mut in_url, mut in_quotes, mut start) = (false, false, 0);
    for (at, c) in header.char_indices() {
        match c {
            '<' if !in_quotes => in_url = true,
            '>' if !in_quotes => in_url = false,
            '"' if !in_url => in_quotes = !in_quotes,
            ',' if !in_url && !in_quotes => {
                entries.push(&header[start..at]);
                start = at + 1;
            }
            _ => {}
        }
    }
    entries.push(&header[start..]);
    entries
}

fn parse_entry(entry: &str) -> Option<Link> {
    let entry = entry.trim();
    let rest = entry.strip_prefix('<')?;
    let close = rest.find('>')?;
    let url = rest[..close].trim();
    if url.is_empty() {
        return None;
    }

    let (mut rel, mut title) = (None, None);
    for param in rest[close + 1..].split(';').map(str::trim).filter(|p| !p.is_empty()) {
        let (name, value) = param.split_once('=')?;
        let value = value.trim().trim_matches('"').to_string();
        match name.trim().to_ascii_lowercase().as_str() {
            "rel" => rel = Some(value),
            "title" => title = Some(value),
            _ => {}
        }
    }

    Some(Link {
        url: url.to_string(),
        rel: rel?,
        title,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_multiple_entries() {
        let links = parse_links(
            r#"</monitor/1>; rel="related"; title="monitor", </products/1>;rel=self"#,
        );
        assert_eq!(
            links,
            vec![
                Link {
                    url: "/monitor/1".to_string(),
                    rel: "related".to_string(),
                    title: Some("monitor".to_string()),
                },
                Link {
                    url: "/products/1".to_string(),
                    rel: "self".to_string(),
                    title: None,
                },
            ]
        );
    }

    #[test]
    fn commas_inside_urls_and_quotes_do_not_split() {
        let links = parse_links(r#"</a?x=1,2>; rel="a, b"; title="t""#);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "/a?x=1,2");
        assert_eq!(links[0].rel, "a, b");
    }

    #[test]
    fn skips_entries_without_rel_or_brackets() {
        let links = parse_links(r#"</a>; title="monitor", garbage, </b>; rel=next"#);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "/b");
    }

    #[test]
    fn selects_the_monitor_link() {
        let header = r#"</self>; rel=self, </monitor/9>; rel=related; title=monitor"#;
        assert_eq!(monitor_link(header).map(|l| l.url), Some("/monitor/9".to_string()));
        assert_eq!(monitor_link("</self>; rel=self"), None);
    }
}
