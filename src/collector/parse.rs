//! HTML/CSS parsing for link discovery, per spec §4.3.5.
//!
//! Uses `scraper` (already the teacher's own dependency, used elsewhere for
//! markdown-conversion preprocessing) for the HTML tag/attribute table, and
//! a `regex`-based scanner for `url(...)` in CSS and inline `style`
//! attributes.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

use crate::utils::url_utils::is_valid_url;

/// (selector, attributes-to-extract) pairs from spec §4.3.5.
const TAG_ATTRS: &[(&str, &[&str])] = &[
    ("img", &["src", "srcset"]),
    ("script", &["src"]),
    ("link", &["href"]),
    ("video", &["src", "poster"]),
    ("audio", &["src"]),
    ("source", &["src", "srcset"]),
    ("object", &["data"]),
    ("embed", &["src"]),
    ("iframe", &["src"]),
    ("a", &["href"]),
];

static CSS_URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"url\(\s*['"]?([^'")]+)['"]?\s*\)"#).expect("valid regex"));

fn should_discard(value: &str) -> bool {
    value.starts_with("data:")
        || value.starts_with("javascript:")
        || value.starts_with('#')
        || value.starts_with("mailto:")
}

/// Splits a `srcset` attribute value by comma and takes the first
/// whitespace-delimited token of each candidate.
fn srcset_candidates(value: &str) -> Vec<String> {
    value
        .split(',')
        .filter_map(|candidate| candidate.trim().split_whitespace().next())
        .map(str::to_string)
        .collect()
}

fn resolve(base: &Url, value: &str) -> Option<String> {
    if should_discard(value) {
        return None;
    }
    let resolved = base.join(value).ok()?;
    let resolved = resolved.to_string();
    is_valid_url(&resolved).then_some(resolved)
}

fn extract_style_urls(base: &Url, style: &str, out: &mut Vec<String>) {
    for cap in CSS_URL_RE.captures_iter(style) {
        if let Some(raw) = cap.get(1) {
            if let Some(resolved) = resolve(base, raw.as_str().trim_matches(['\'', '"'])) {
                out.push(resolved);
            }
        }
    }
}

/// Extracts every enqueue-worthy absolute URL referenced by an HTML
/// document, resolved against `base_url`.
#[must_use]
pub fn extract_links_html(base_url: &str, html: &str) -> Vec<String> {
    let Ok(base) = Url::parse(base_url) else {
        return Vec::new();
    };

    let document = Html::parse_document(html);
    let mut out = Vec::new();

    for (tag, attrs) in TAG_ATTRS {
        let Ok(selector) = Selector::parse(tag) else {
            continue;
        };
        for element in document.select(&selector) {
            for attr in *attrs {
                let Some(value) = element.value().attr(attr) else {
                    continue;
                };
                if *attr == "srcset" {
                    for candidate in srcset_candidates(value) {
                        if let Some(resolved) = resolve(&base, &candidate) {
                            out.push(resolved);
                        }
                    }
                } else if let Some(resolved) = resolve(&base, value) {
                    out.push(resolved);
                }
            }
        }
    }

    // Every element's style attribute may carry url(...) references.
    if let Ok(any_selector) = Selector::parse("*") {
        for element in document.select(&any_selector) {
            if let Some(style) = element.value().attr("style") {
                extract_style_urls(&base, style, &mut out);
            }
        }
    }

    out
}

/// Extracts `url(...)` references from a CSS stylesheet body, resolved
/// against `base_url`.
#[must_use]
pub fn extract_links_css(base_url: &str, css: &str) -> Vec<String> {
    let Ok(base) = Url::parse(base_url) else {
        return Vec::new();
    };
    let mut out = Vec::new();
    extract_style_urls(&base, css, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_img_and_anchor() {
        let html = r#"<html><body><img src="/a.png"><a href="/b.html"></a></body></html>"#;
        let links = extract_links_html("https://example.com/", html);
        assert!(links.contains(&"https://example.com/a.png".to_string()));
        assert!(links.contains(&"https://example.com/b.html".to_string()));
    }

    #[test]
    fn discards_javascript_and_mailto_and_fragment() {
        let html = r#"<a href="javascript:void(0)"></a><a href="mailto:a@b.com"></a><a href="#top"></a>"#;
        let links = extract_links_html("https://example.com/", html);
        assert!(links.is_empty());
    }

    #[test]
    fn srcset_takes_first_token_per_candidate() {
        let html = r#"<img srcset="/a.png 1x, /b.png 2x">"#;
        let links = extract_links_html("https://example.com/", html);
        assert!(links.contains(&"https://example.com/a.png".to_string()));
        assert!(links.contains(&"https://example.com/b.png".to_string()));
    }

    #[test]
    fn inline_style_url_is_extracted() {
        let html = r#"<div style="background: url('/bg.png')"></div>"#;
        let links = extract_links_html("https://example.com/", html);
        assert!(links.contains(&"https://example.com/bg.png".to_string()));
    }

    #[test]
    fn css_url_with_data_uri_ignored() {
        let css = "body { background: url(data:image/png;base64,abcd); }";
        let links = extract_links_css("https://example.com/s.css", css);
        assert!(links.is_empty());
    }

    #[test]
    fn css_url_quoted_and_unquoted() {
        let css = r#".a { background: url("/bg.png"); } .b { background: url(/c.png); }"#;
        let links = extract_links_css("https://example.com/", css);
        assert!(links.contains(&"https://example.com/bg.png".to_string()));
        assert!(links.contains(&"https://example.com/c.png".to_string()));
    }
}
