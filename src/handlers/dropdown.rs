//! Shared custom-dropdown flow: open, scrape, match, click, verify.

use tracing::{debug, info, warn};

use super::Toolkit;
use crate::context::ElementData;
use crate::frame::{FormFrame, Scope, TextMatch};
use crate::matching::{generate_variants, FieldCategory};
use crate::verify::{verify_selection, ReadBack};
use crate::Result;

/// Option element patterns, most specific first.
pub const OPTION_SELECTORS: &[&str] = &[
    "[role='option']",
    "li[role='option']",
    "div[role='option']",
    ".dropdown-item",
    ".select-option",
    ".lookup__list__item",
    ".menu-item",
    "ul[role='listbox'] li",
    "div[class*='option']",
    "li[class*='item']",
];

/// Candidates tried, in order, when clicking an option by its text.
const CLICK_CANDIDATES: &[(&str, TextMatch)] = &[
    ("[role='option']", TextMatch::Contains),
    ("li", TextMatch::Contains),
    ("div[role='option']", TextMatch::Contains),
    (".dropdown-item", TextMatch::Contains),
    (".menu-item", TextMatch::Contains),
    (".select-option", TextMatch::Contains),
    ("span", TextMatch::Contains),
    ("[role='option']", TextMatch::Exact),
    ("li", TextMatch::Exact),
    ("div", TextMatch::Exact),
];

/// Last-resort exact-text search.
const BROAD_SEARCH: &str = "button, a, [role='option'], li, div";

/// Elements tried per candidate pattern.
const MAX_ELEMENTS_PER_CANDIDATE: usize = 5;

/// How the widget is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Open {
    Click,
    Type,
}

/// How the desired value is matched against scraped options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Match {
    /// Case-insensitive equality; no fallback.
    Exact,
    /// Oracle-backed semantic match over lexical variants.
    Fuzzy,
}

/// Scrape visible option texts, near the trigger first, then page-wide.
pub async fn scrape_options(tk: &Toolkit, frame: &dyn FormFrame, trigger: &str) -> Vec<String> {
    tk.timings.settle(400).await;
    for scope in [Scope::Near(trigger), Scope::Global] {
        let mut found: Vec<String> = Vec::new();
        for pattern in OPTION_SELECTORS {
            let texts = match frame.option_texts(pattern, scope).await {
                Ok(texts) => texts,
                Err(e) => {
                    debug!("Option scrape with {} failed: {}", pattern, e);
                    continue;
                }
            };
            for text in texts {
                let text = text.trim().to_string();
                if text.chars().count() > 1 && !found.contains(&text) {
                    found.push(text);
                }
            }
        }
        if !found.is_empty() {
            debug!("Scraped {} options ({:?})", found.len(), scope);
            return found;
        }
    }
    Vec::new()
}

/// Find an element showing `text` and click it.
///
/// Each element gets a visibility wait before the click; failures move on
/// to the next element, then the next pattern, then a broad exact search.
pub async fn click_option_by_text(tk: &Toolkit, frame: &dyn FormFrame, text: &str) -> bool {
    for (css, mode) in CLICK_CANDIDATES {
        if try_click_matching(tk, frame, css, text, *mode).await {
            return true;
        }
    }
    if try_click_matching(tk, frame, BROAD_SEARCH, text, TextMatch::Exact).await {
        return true;
    }
    warn!("Could not click any element with text '{}'", text);
    false
}

async fn try_click_matching(
    tk: &Toolkit,
    frame: &dyn FormFrame,
    css: &str,
    text: &str,
    mode: TextMatch,
) -> bool {
    let refs = match frame.find_by_text(css, text, mode).await {
        Ok(refs) => refs,
        Err(e) => {
            debug!("Text lookup {} ~ '{}' failed: {}", css, text, e);
            return false;
        }
    };
    for selector in refs.iter().take(MAX_ELEMENTS_PER_CANDIDATE) {
        match frame.wait_visible(selector, tk.timings.visibility(1500)).await {
            Ok(true) => {}
            _ => continue,
        }
        match tk.timings.bounded("option click", frame.click(selector)).await {
            Ok(()) => {
                info!("Clicked option '{}' via {}", text, css);
                return true;
            }
            Err(e) => debug!("Click on {} failed: {}", selector, e),
        }
    }
    false
}

/// Best-effort close of an open dropdown.
pub async fn dismiss(tk: &Toolkit, frame: &dyn FormFrame) {
    if let Err(e) = frame.press_key(None, "Escape").await {
        debug!("Escape failed: {}", e);
    }
    tk.timings.settle(200).await;
}

/// Open a custom widget, pick the option matching `value` and verify it.
#[allow(clippy::too_many_arguments)]
pub async fn open_and_select(
    tk: &Toolkit,
    frame: &dyn FormFrame,
    selector: &str,
    value: &str,
    open: Open,
    matching: Match,
    category: FieldCategory,
    context: Option<&ElementData>,
) -> Result<bool> {
    let opened = match open {
        Open::Type => frame.fill(selector, value).await,
        Open::Click => tk.click(frame, selector).await,
    };
    if let Err(e) = opened {
        warn!("Could not open {} ({:?}): {}", selector, open, e);
        return Ok(false);
    }
    tk.timings
        .settle(if open == Open::Type { 700 } else { 500 })
        .await;

    let options = scrape_options(tk, frame, selector).await;
    if options.is_empty() {
        warn!("No options found for {}", selector);
        dismiss(tk, frame).await;
        return Ok(false);
    }

    let matched = match matching {
        Match::Exact => {
            let wanted = value.trim();
            options
                .iter()
                .find(|o| o.trim().eq_ignore_ascii_case(wanted))
                .cloned()
        }
        Match::Fuzzy => {
            let described;
            let context = match context {
                Some(ctx) => Some(ctx),
                None => {
                    described = frame.describe(selector).await.ok().flatten();
                    described.as_ref()
                }
            };
            let variants = generate_variants(value, category);
            tk.selector
                .find_best_match(value, &options, context, &variants, category)
                .await
        }
    };
    let Some(matched) = matched else {
        warn!(
            "No {:?} match for '{}' among {} options",
            matching,
            value,
            options.len()
        );
        dismiss(tk, frame).await;
        return Ok(false);
    };

    if !click_option_by_text(tk, frame, &matched).await {
        dismiss(tk, frame).await;
        return Ok(false);
    }
    tk.timings.settle(500).await;
    Ok(verify_selection(frame, selector, &matched, ReadBack::Input).await)
}
