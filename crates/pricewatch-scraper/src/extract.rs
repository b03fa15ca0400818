//! Price location within a parsed page.
//!
//! Candidates are tried in a fixed order and the first hit wins, even when a
//! later tier would also match:
//!
//! 1. the element the record's selector points at, searched for a number
//!    followed by a currency marker;
//! 2. any text node in the document with a number followed by a currency
//!    marker;
//! 3. any text node whose parent's `class` or `id` mentions `price`, taking
//!    the first number regardless of currency.

use std::sync::LazyLock;

use pricewatch_core::ExtractedPrice;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};

use crate::normalize::normalize_price;

/// `id="..."` inside an XPath-ish selector such as `//*[@id="price"]`.
static ID_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?:^|[^\w-])@?id\s*=\s*["']([^"']+)["']"#).expect("valid id regex"));

/// A number as storefronts print it: digits, optionally grouped in threes by
/// a space, NBSP, narrow NBSP or apostrophe, with `.`/`,` only between digits.
/// `40, 42` is two numbers, not one.
const NUMBER_PATTERN: &str = r"[0-9]+(?:[ \u{a0}\u{202f}']?[0-9]{3})*(?:[.,][0-9]+)*";

/// A number immediately followed by a currency marker. Word markers must end
/// at a word boundary so `2 рубашки` or `3 Europe` are not prices, while
/// inflected `рубль`/`рублей` still are.
static CURRENCY_PRICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"({NUMBER_PATTERN})[ \t\u{{a0}}\u{{202f}}]*(?:₽|р\.|€|\$|£|(?i:руб(?:л[а-яё]*)?|rub|eur|usd|gbp)\b)"
    ))
    .expect("valid currency price regex")
});

static NUMERIC_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(NUMBER_PATTERN).expect("valid numeric regex"));

static ANY_ID_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[id]").expect("valid id selector"));

/// Elements whose text is never page content.
const NON_CONTENT_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Which fallback tier produced a price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceTier {
    Selector,
    CurrencyText,
    PriceAttribute,
}

/// Locates the price on a page using `selector` and the fallback tiers.
///
/// Returns `None` when no tier matches; that is a normal outcome, not an error.
#[must_use]
pub fn extract_price(document: &Html, selector: &str) -> Option<ExtractedPrice> {
    locate_price(document, selector).map(|(_, price)| price)
}

/// Like [`extract_price`], also reporting which tier matched.
#[must_use]
pub fn locate_price(document: &Html, selector: &str) -> Option<(PriceTier, ExtractedPrice)> {
    if let Some(raw) = selected_element(document, selector)
        .and_then(|el| currency_price(&el.text().collect::<String>()))
    {
        return Some((PriceTier::Selector, to_extracted(raw)));
    }

    if let Some(raw) = content_text_nodes(document).find_map(|(_, text)| currency_price(text)) {
        return Some((PriceTier::CurrencyText, to_extracted(raw)));
    }

    content_text_nodes(document)
        .filter(|(parent, _)| parent.is_some_and(mentions_price))
        .find_map(|(_, text)| {
            NUMERIC_RUN_RE
                .find(text)
                .map(|m| strip_whitespace(m.as_str()))
        })
        .map(|raw| (PriceTier::PriceAttribute, to_extracted(raw)))
}

/// Resolves the record's selector to an element.
///
/// An `id="..."` reference is looked up by id. Anything else is tried as a
/// CSS selector; selectors that do not parse (XPath, free text) resolve to
/// nothing and leave the work to the fallback tiers.
fn selected_element<'a>(document: &'a Html, selector: &str) -> Option<ElementRef<'a>> {
    if let Some(id) = ID_ATTR_RE
        .captures(selector)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
    {
        return document
            .select(&ANY_ID_SELECTOR)
            .find(|el| el.value().id() == Some(id));
    }

    match Selector::parse(selector) {
        Ok(css) => document.select(&css).next(),
        Err(e) => {
            tracing::debug!(selector, error = %e, "selector is not valid CSS; skipping direct lookup");
            None
        }
    }
}

fn currency_price(text: &str) -> Option<String> {
    CURRENCY_PRICE_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| strip_whitespace(m.as_str()))
}

/// Text nodes in document order paired with their parent element, skipping
/// anything inside scripts and styles.
fn content_text_nodes(document: &Html) -> impl Iterator<Item = (Option<ElementRef<'_>>, &str)> {
    document.tree.root().descendants().filter_map(|node| {
        let Node::Text(text) = node.value() else {
            return None;
        };
        let in_non_content = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| NON_CONTENT_ELEMENTS.contains(&el.name()))
        });
        if in_non_content {
            return None;
        }
        let content: &str = text;
        Some((node.parent().and_then(ElementRef::wrap), content))
    })
}

fn mentions_price(element: ElementRef<'_>) -> bool {
    let el = element.value();
    [el.attr("class"), el.attr("id")]
        .into_iter()
        .flatten()
        .any(|value| value.to_ascii_lowercase().contains("price"))
}

fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

fn to_extracted(raw: String) -> ExtractedPrice {
    let normalized = match normalize_price(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(raw = %raw, error = %e, "price text did not normalize");
            None
        }
    };
    ExtractedPrice { raw, normalized }
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
