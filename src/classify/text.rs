//! Document text preparation shared by the classifiers.

use scraper::{ElementRef, Html, Selector};

/// Elements whose text never counts as article content.
const SKIPPED_ELEMENTS: [&str; 5] = ["script", "style", "nav", "header", "footer"];

/// Reduces HTML input (text starting with `<`) to its visible text and
/// collapses whitespace. Plain text only has its whitespace collapsed.
#[must_use]
pub fn prepare(text: &str) -> String {
    let trimmed = text.trim_start();
    if trimmed.starts_with('<') {
        normalize_whitespace(&html_to_text(trimmed))
    } else {
        normalize_whitespace(text)
    }
}

/// Keeps the first `max_words` words, marking a cut with a trailing `...`.
#[must_use]
pub fn truncate_words(text: &str, max_words: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= max_words {
        return words.join(" ");
    }
    let mut truncated = words[..max_words].join(" ");
    truncated.push_str("...");
    truncated
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Headline plus the `<article>` body when present, the whole document
/// otherwise.
fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let article = Selector::parse("article")
        .ok()
        .and_then(|selector| document.select(&selector).next());

    match article {
        Some(article) => {
            let headline = Selector::parse("h1")
                .ok()
                .and_then(|selector| document.select(&selector).next())
                .filter(|h1| !h1.ancestors().any(|node| node.id() == article.id()))
                .map(visible_text)
                .unwrap_or_default();
            format!("{headline}\n\n{}", visible_text(article))
        }
        None => visible_text(document.root_element()),
    }
}

fn visible_text(root: ElementRef<'_>) -> String {
    let mut parts = Vec::new();
    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|element| SKIPPED_ELEMENTS.contains(&element.name()))
        });
        if !hidden {
            parts.push(&**text);
        }
    }
    parts.join(" ")
}
