//! Caption composition on top of a chat provider
//!
//! Provider failures never reach the caller: a failed caption becomes an
//! error sentence and failed alternatives become a one-item list, so the
//! page can always render.

use crate::ai::ChatService;
use crate::models::{CaptionRequest, FeedbackRequest};
use std::sync::Arc;

pub const MAX_ALTERNATIVES: usize = 3;

#[derive(Clone)]
pub struct CaptionComposer {
    chat: Arc<dyn ChatService>,
}

impl CaptionComposer {
    pub fn new(chat: Arc<dyn ChatService>) -> Self {
        Self { chat }
    }

    pub async fn compose_caption(&self, request: &CaptionRequest) -> String {
        match self.chat.generate_caption(request).await {
            Ok(raw) => {
                let caption = clean_caption(&raw);
                if caption.is_empty() {
                    tracing::warn!("Caption was empty after cleanup: {:?}", raw);
                    "Error generating caption: the model returned no usable text".to_string()
                } else {
                    tracing::info!("Generated caption: {}", caption);
                    caption
                }
            }
            Err(e) => {
                tracing::error!("Caption generation failed: {}", e);
                format!("Error generating caption: {}", e)
            }
        }
    }

    pub async fn compose_alternatives(&self, request: &FeedbackRequest) -> Vec<String> {
        match self.chat.generate_alternatives(request).await {
            Ok(raw) => {
                let alternatives = parse_alternatives(&raw);
                if alternatives.is_empty() {
                    tracing::warn!("No alternatives parsed from reply: {:?}", raw);
                    vec!["Error generating alternative prompts: the model returned no suggestions"
                        .to_string()]
                } else {
                    tracing::info!("Generated {} alternative caption(s)", alternatives.len());
                    alternatives
                }
            }
            Err(e) => {
                tracing::error!("Alternative caption generation failed: {}", e);
                vec![format!("Error generating alternative prompts: {}", e)]
            }
        }
    }
}

/// Code points with an emoji presentation, plus the joiners, variation
/// selectors, keycap mark and tag characters that build emoji sequences.
fn is_emoji(c: char) -> bool {
    matches!(
        c as u32,
        0x00A9 | 0x00AE
            | 0x203C | 0x2049
            | 0x2122 | 0x2139
            | 0x2194..=0x21AA
            | 0x2300..=0x23FF
            | 0x24C2
            | 0x25A0..=0x25FF
            | 0x2600..=0x27BF
            | 0x2934 | 0x2935
            | 0x2B00..=0x2BFF
            | 0x3030 | 0x303D
            | 0x3297 | 0x3299
            | 0x1F000..=0x1FAFF
            | 0xFE00..=0xFE0F
            | 0x200D
            | 0x20E3
            | 0xE0020..=0xE007F
    )
}

fn strip_quotes(text: &str) -> &str {
    let text = text.trim();
    for (open, close) in [('"', '"'), ('\'', '\''), ('“', '”'), ('‘', '’')] {
        if let Some(inner) = text
            .strip_prefix(open)
            .and_then(|rest| rest.strip_suffix(close))
        {
            return inner.trim();
        }
    }
    text
}

/// Normalise a model reply into a single caption line with no hashtags or
/// emoji.
pub fn clean_caption(raw: &str) -> String {
    let first_line = raw
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("");
    let first_line = first_line
        .strip_prefix("Caption:")
        .map(str::trim)
        .unwrap_or(first_line);

    let words: Vec<String> = strip_quotes(first_line)
        .split_whitespace()
        .filter(|word| !word.starts_with('#'))
        .map(|word| {
            word.chars()
                .filter(|c| !is_emoji(*c) && *c != '#')
                .collect::<String>()
        })
        .filter(|word| !word.is_empty())
        .collect();

    strip_quotes(&words.join(" ")).to_string()
}

fn strip_list_marker(line: &str) -> &str {
    let line = line.trim();
    if let Some(rest) = line
        .strip_prefix("- ")
        .or_else(|| line.strip_prefix("* "))
        .or_else(|| line.strip_prefix("• "))
    {
        return rest.trim();
    }

    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(rest) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            return rest.trim();
        }
    }
    line
}

/// Split a reply into at most [`MAX_ALTERNATIVES`] suggestions, one per
/// non-blank line.
pub fn parse_alternatives(raw: &str) -> Vec<String> {
    raw.lines()
        .map(|line| clean_caption(strip_list_marker(line)))
        .filter(|line| !line.is_empty())
        .take(MAX_ALTERNATIVES)
        .collect()
}
