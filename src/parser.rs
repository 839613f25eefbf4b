use scraper::{Html, Selector};

/// Href schemes that can never become fetchable page URLs.
const SKIP_SCHEMES: &[&str] = &["javascript:", "mailto:", "tel:", "data:", "file:"];

fn is_followable(href: &str) -> bool {
    !href.is_empty() && !SKIP_SCHEMES.iter().any(|scheme| href.starts_with(scheme))
}

/// Extract candidate hrefs from `<a>` tags in a fetched page body.
///
/// Values come back as written in the page (relative or absolute, duplicates
/// included); resolving and dedup happen at admission time. Un-followable
/// schemes are dropped here.
///
/// # Examples
/// ```
/// use webspider::parser::extract_links;
///
/// let html = r#"<a href="/docs">Docs</a><a href="mailto:x@y">Mail</a>"#;
/// assert_eq!(extract_links(html), vec!["/docs"]);
/// ```
pub fn extract_links(html_body: &str) -> Vec<String> {
    let document = Html::parse_document(html_body);
    let selector = Selector::parse("a[href]").expect("static selector");

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .map(str::trim)
        .filter(|href| is_followable(href))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_in_document_order() {
        let html = r#"<html><body>
            <a href="/foo1">first</a>
            <p>filler</p>
            <a href="http://test.local/bar">second</a>
            <a href="relative/baz">third</a>
        </body></html>"#;

        assert_eq!(
            extract_links(html),
            vec!["/foo1", "http://test.local/bar", "relative/baz"]
        );
    }

    #[test]
    fn test_skips_unfetchable_schemes_and_empty_hrefs() {
        let html = r#"<a href="javascript:void(0)">x</a>
            <a href="mailto:a@test.local">m</a>
            <a href="tel:+15551212">t</a>
            <a href="data:text/plain,hi">d</a>
            <a href="file:///etc/hosts">f</a>
            <a href="">empty</a>
            <a href="  /kept  ">kept</a>"#;

        assert_eq!(extract_links(html), vec!["/kept"]);
    }

    #[test]
    fn test_duplicates_survive_extraction() {
        // Dedup is the admission set's job, not the parser's.
        let html = r#"<a href="/foo1">a</a><a href="/foo1">b</a>"#;
        assert_eq!(extract_links(html), vec!["/foo1", "/foo1"]);
    }

    #[test]
    fn test_tolerates_malformed_html() {
        let html = r#"<body><a href="/ok">ok<div><p>unclosed"#;
        assert_eq!(extract_links(html), vec!["/ok"]);
    }

    #[test]
    fn test_empty_and_linkless_bodies() {
        assert!(extract_links("").is_empty());
        assert!(extract_links("<p>nothing to follow</p>").is_empty());
    }
}
