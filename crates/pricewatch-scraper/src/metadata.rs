//! Page-level metadata: `<title>`, meta description and meta keywords.

use std::sync::LazyLock;

use scraper::{Html, Selector};

static TITLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("valid title selector"));
static META_NAMED_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("meta[name]").expect("valid meta selector"));

/// Metadata pulled from a fetched page. Missing values are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMetadata {
    pub title: String,
    pub description: String,
    pub keywords: String,
}

#[must_use]
pub fn extract_page_metadata(document: &Html) -> PageMetadata {
    let title = document
        .select(&TITLE_SELECTOR)
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .unwrap_or_default();

    PageMetadata {
        title,
        description: meta_content(document, "description"),
        keywords: meta_content(document, "keywords"),
    }
}

/// Content of the first `<meta name=...>` whose name matches, ignoring case.
fn meta_content(document: &Html, name: &str) -> String {
    document
        .select(&META_NAMED_SELECTOR)
        .find(|el| {
            el.value()
                .attr("name")
                .is_some_and(|n| n.trim().eq_ignore_ascii_case(name))
        })
        .and_then(|el| el.value().attr("content"))
        .map(collapse_whitespace)
        .unwrap_or_default()
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_title_description_keywords() {
        let html = r#"
            <html><head>
              <title>
                Электрочайник  Vitek
              </title>
              <meta name="description" content="Быстрый чайник на 1,7 л">
              <meta name="keywords" content="чайник, vitek">
            </head><body></body></html>"#;
        let meta = extract_page_metadata(&Html::parse_document(html));
        assert_eq!(meta.title, "Электрочайник Vitek");
        assert_eq!(meta.description, "Быстрый чайник на 1,7 л");
        assert_eq!(meta.keywords, "чайник, vitek");
    }

    #[test]
    fn meta_name_match_ignores_case() {
        let html = r#"<head><meta name="Description" content="Hello"></head>"#;
        let meta = extract_page_metadata(&Html::parse_document(html));
        assert_eq!(meta.description, "Hello");
    }

    #[test]
    fn first_title_wins() {
        let html = "<head><title>One</title></head><body><svg><title>Two</title></svg></body>";
        let meta = extract_page_metadata(&Html::parse_document(html));
        assert_eq!(meta.title, "One");
    }

    #[test]
    fn missing_values_are_empty() {
        let meta = extract_page_metadata(&Html::parse_document("<p>nothing here</p>"));
        assert_eq!(meta, PageMetadata::default());
    }

    #[test]
    fn meta_without_content_is_empty() {
        let html = r#"<head><meta name="keywords"></head>"#;
        let meta = extract_page_metadata(&Html::parse_document(html));
        assert!(meta.keywords.is_empty());
    }
}
