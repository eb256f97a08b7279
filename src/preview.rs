//! Markdown preview rendering
//!
//! Two modes back the live preview pane:
//!
//! - **Legacy**: a single-pass, order-sensitive regex
//!   substitution (headings, bold, italic, images, links, blockquotes, list
//!   items, line breaks). No escaping, no nesting awareness; the precedence
//!   order is part of the contract and must not be reordered.
//! - **CommonMark**: a real parse-then-render pipeline via pulldown-cmark for
//!   callers that care about correctness on nested input more than pixel
//!   parity with the legacy pane.

use std::sync::LazyLock;

use pulldown_cmark::{Options, Parser, html};
use regex::Regex;

use crate::config::{PreviewConfig, PreviewMode};

/// Ordered substitution rules of the legacy pipeline
///
/// The order is load-bearing: headings before emphasis, bold before italic,
/// images before links, and the newline rewrite last.
#[allow(clippy::expect_used)]
static LEGACY_RULES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"(?m)^# (.*)$", "<h1>$1</h1>"),
        (r"(?m)^## (.*)$", "<h2>$1</h2>"),
        (r"(?m)^### (.*)$", "<h3>$1</h3>"),
        (r"\*\*(.*?)\*\*", "<strong>$1</strong>"),
        (r"\*(.*?)\*", "<em>$1</em>"),
        (
            r"!\[(.*?)\]\((.*?)\)",
            r#"<img alt="$1" src="$2" style="max-width:100%;">"#,
        ),
        (r"\[(.*?)\]\((.*?)\)", r#"<a href="$2">$1</a>"#),
        (
            r"(?m)^> (.*)$",
            r#"<blockquote style="border-left: 3px solid #ccc; margin: 0; padding-left: 10px; color: #666;">$1</blockquote>"#,
        ),
        (r"(?m)^- (.*)$", "<li>$1</li>"),
        (r"\n", "<br>"),
    ]
    .into_iter()
    .map(|(pattern, replacement)| {
        (
            Regex::new(pattern).expect("literal pattern compiles"),
            replacement,
        )
    })
    .collect()
});

/// Render Markdown with the legacy single-pass substitution pipeline
///
/// Matches the historical preview output, including its quirks: no HTML
/// escaping and no handling of nested constructs.
pub fn render_legacy(input: &str) -> String {
    let mut markup = input.to_string();
    for (pattern, replacement) in LEGACY_RULES.iter() {
        markup = pattern.replace_all(&markup, *replacement).into_owned();
    }
    markup
}

/// Render Markdown through a CommonMark parse-then-render pipeline
pub fn render_commonmark(input: &str) -> String {
    let parser = Parser::new_ext(input, Options::empty());
    let mut markup = String::new();
    html::push_html(&mut markup, parser);
    markup
}

/// Render Markdown in the given mode
pub fn render(input: &str, mode: PreviewMode) -> String {
    match mode {
        PreviewMode::Legacy => render_legacy(input),
        PreviewMode::Commonmark => render_commonmark(input),
    }
}

/// Live preview pane state
///
/// Holds the current source and its rendered markup; [`update`](Self::update)
/// re-renders on every input change, which is the whole live-update contract.
/// Empty input shows the configured placeholder.
#[derive(Clone, Debug)]
pub struct PreviewPane {
    config: PreviewConfig,
    source: String,
    markup: String,
}

impl PreviewPane {
    /// Create an empty pane showing the placeholder
    pub fn new(config: PreviewConfig) -> Self {
        let markup = config.placeholder.clone();
        Self {
            config,
            source: String::new(),
            markup,
        }
    }

    /// Replace the source text and re-render
    ///
    /// Returns the freshly rendered markup.
    pub fn update(&mut self, source: &str) -> &str {
        self.source = source.to_string();
        self.markup = if source.is_empty() {
            self.config.placeholder.clone()
        } else {
            render(source, self.config.mode)
        };
        &self.markup
    }

    /// Re-render the current source without changing it
    ///
    /// Used when the pane becomes visible again (e.g. a tab switch) and the
    /// markup should reflect the latest source.
    pub fn refresh(&mut self) -> &str {
        let source = self.source.clone();
        self.update(&source)
    }

    /// The current source text
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The current rendered markup
    pub fn markup(&self) -> &str {
        &self.markup
    }
}
