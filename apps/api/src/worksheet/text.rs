//! Item text preparation: prefixing and greedy word wrap.

use crate::worksheet::config::{OptionsConfig, PrefixMode};
use crate::worksheet::font_metrics::{get_metrics, StandardFont};

/// Extra vertical space between consecutive wrapped lines.
pub const LINE_LEADING: f32 = 2.0;

/// Applies the configured prefix to an item's text.
///
/// Text is trimmed first. In auto mode the prefix is prepended unless the text
/// already starts with it, compared case-insensitively against the whole prefix
/// including its trailing space, so "Upload " still prefixes "Uploaded forms".
/// Text that is exactly the prefix (as an empty item becomes) counts as prefixed.
pub fn prefix_item(text: &str, options: &OptionsConfig) -> String {
    let normalized = text.trim();
    if options.prefix_mode == PrefixMode::Verbatim {
        return normalized.to_string();
    }
    // Leading whitespace cannot survive the final trim.
    let prefix = options.auto_prefix.trim_start();
    if prefix.is_empty()
        || starts_with_ignore_case(normalized, prefix)
        || normalized.to_lowercase() == prefix.trim_end().to_lowercase()
    {
        return normalized.to_string();
    }
    format!("{prefix}{normalized}").trim_end().to_string()
}

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.to_lowercase().starts_with(&prefix.to_lowercase())
}

/// Wrapped text block ready for drawing.
#[derive(Debug, Clone, PartialEq)]
pub struct WrappedText {
    /// Always at least one line; empty text yields a single empty line.
    pub lines: Vec<String>,
    pub line_height: f32,
}

impl WrappedText {
    pub fn block_height(&self) -> f32 {
        self.lines.len() as f32 * self.line_height
    }
}

/// Greedy word wrap at `font`/`size` into `max_width` points.
///
/// Words wider than the column on their own are split at character boundaries so
/// that no line is measured wider than `max_width`.
pub fn wrap_text(text: &str, font: StandardFont, size: f32, max_width: f32) -> WrappedText {
    let metrics = get_metrics(font);
    let space_w = metrics.space_width() * size;
    let measure = |s: &str| metrics.measure_str(s) * size;

    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_width = 0.0_f32;

    for word in text.split_whitespace() {
        let word_w = measure(word);

        if word_w > max_width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let mut pieces = split_long_word(word, max_width, &measure);
            // The last fragment stays open so the next word can join it.
            let tail = pieces.pop().unwrap_or_default();
            lines.extend(pieces);
            current_width = measure(&tail);
            current = tail;
            continue;
        }

        if current.is_empty() {
            current.push_str(word);
            current_width = word_w;
        } else if current_width + space_w + word_w <= max_width {
            current.push(' ');
            current.push_str(word);
            current_width += space_w + word_w;
        } else {
            lines.push(std::mem::replace(&mut current, word.to_string()));
            current_width = word_w;
        }
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }

    WrappedText {
        lines,
        line_height: size + LINE_LEADING,
    }
}

fn split_long_word(word: &str, max_width: f32, measure: &impl Fn(&str) -> f32) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut piece = String::new();
    for ch in word.chars() {
        piece.push(ch);
        if measure(&piece) > max_width && piece.chars().count() > 1 {
            piece.pop();
            pieces.push(std::mem::take(&mut piece));
            piece.push(ch);
        }
    }
    pieces.push(piece);
    pieces
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
