use crate::config::LayoutConfig;
use crate::text_metrics::measure_text_width;
use crate::theme::{ShapeKind, Theme};

use super::TextBlock;

const ELLIPSIS: char = '\u{2026}';

/// Widest label line a node shape can hold. Diamonds are the narrowest.
pub fn label_max_width(shape: ShapeKind, config: &LayoutConfig) -> f32 {
    match shape {
        ShapeKind::RoundedRect => config.label_max_width_process,
        ShapeKind::Diamond => config.label_max_width_decision,
        ShapeKind::Circle => config.label_max_width_circle,
    }
}

/// Greedy word wrap into at most `config.label_max_lines` lines. Overflowing
/// text is cut and the last kept line ends with an ellipsis.
pub fn wrap_label(text: &str, max_width: f32, theme: &Theme, config: &LayoutConfig) -> TextBlock {
    let measure = |line: &str| {
        measure_text_width(
            line,
            theme.font_size,
            &theme.font_family,
            config.fast_text_metrics,
        )
    };

    let mut lines: Vec<String> = Vec::new();
    for word in text.split_whitespace() {
        for piece in split_long_word(word, max_width, &measure) {
            match lines.last_mut() {
                Some(current) if !current.is_empty() => {
                    let candidate = format!("{current} {piece}");
                    if measure(&candidate) <= max_width {
                        *current = candidate;
                    } else {
                        lines.push(piece);
                    }
                }
                _ => lines.push(piece),
            }
        }
    }
    if lines.is_empty() {
        lines.push(String::new());
    }

    let max_lines = config.label_max_lines.max(1);
    if lines.len() > max_lines {
        lines.truncate(max_lines);
        if let Some(last) = lines.last_mut() {
            *last = with_ellipsis(last, max_width, &measure);
        }
    }

    let width = lines.iter().map(|line| measure(line)).fold(0.0, f32::max);
    let height = lines.len() as f32 * theme.font_size * config.label_line_height;
    TextBlock {
        lines,
        width,
        height,
    }
}

/// Breaks a word wider than `max_width` into character runs that fit.
fn split_long_word(word: &str, max_width: f32, measure: &impl Fn(&str) -> f32) -> Vec<String> {
    if measure(word) <= max_width {
        return vec![word.to_string()];
    }
    let mut pieces = Vec::new();
    let mut current = String::new();
    for ch in word.chars() {
        current.push(ch);
        if measure(&current) > max_width && current.chars().count() > 1 {
            current.pop();
            pieces.push(std::mem::take(&mut current));
            current.push(ch);
        }
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

fn with_ellipsis(line: &str, max_width: f32, measure: &impl Fn(&str) -> f32) -> String {
    let mut kept: String = line.to_string();
    loop {
        let candidate = format!("{}{ELLIPSIS}", kept.trim_end());
        if measure(&candidate) <= max_width || kept.is_empty() {
            return candidate;
        }
        kept.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap(text: &str, width: f32) -> TextBlock {
        wrap_label(text, width, &Theme::default(), &LayoutConfig::default())
    }

    #[test]
    fn short_label_stays_on_one_line() {
        let block = wrap("Submit", 90.0);
        assert_eq!(block.lines, vec!["Submit".to_string()]);
    }

    #[test]
    fn wraps_greedily() {
        let block = wrap("Review the purchase order", 90.0);
        assert!(block.lines.len() > 1);
        assert!(block.lines.len() <= 3);
        assert!(block.width <= 90.0);
        assert_eq!(block.lines.join(" "), "Review the purchase order");
    }

    #[test]
    fn caps_at_three_lines_with_ellipsis() {
        let block = wrap("one two three four five six seven eight nine ten eleven", 40.0);
        assert_eq!(block.lines.len(), 3);
        assert!(block.lines[2].ends_with(ELLIPSIS));
    }

    #[test]
    fn narrower_shapes_wrap_sooner() {
        let config = LayoutConfig::default();
        let text = "Approve credit limit";
        let theme = Theme::default();
        let diamond = wrap_label(text, label_max_width(ShapeKind::Diamond, &config), &theme, &config);
        let rect = wrap_label(
            text,
            label_max_width(ShapeKind::RoundedRect, &config),
            &theme,
            &config,
        );
        assert!(diamond.lines.len() >= rect.lines.len());
    }

    #[test]
    fn empty_label_has_one_blank_line() {
        assert_eq!(wrap("", 90.0).lines, vec![String::new()]);
    }
}
