use crate::models::{CaptionRequest, FeedbackRequest};

pub const CAPTION_SYSTEM: &str = include_str!("../data/prompts/caption_system.txt");
pub const CAPTION_USER: &str = include_str!("../data/prompts/caption_user.txt");
pub const ALTERNATIVES_SYSTEM: &str = include_str!("../data/prompts/alternatives_system.txt");
pub const ALTERNATIVES_USER: &str = include_str!("../data/prompts/alternatives_user.txt");
pub const DESCRIBE_USER: &str = include_str!("../data/prompts/describe_user.txt");

/// Sampling settings sent alongside a chat prompt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

pub const CAPTION_PARAMS: SamplingParams = SamplingParams {
    temperature: 0.7,
    max_tokens: 25,
};

pub const ALTERNATIVES_PARAMS: SamplingParams = SamplingParams {
    temperature: 0.8,
    max_tokens: 150,
};

/// Replace `{{key}}` placeholders in a template string.
///
/// Placeholders are resolved in one left-to-right pass over the template, so
/// text inside substituted values is never expanded again. Unknown keys are
/// left as written.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        result.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        let Some(end) = after_open.find("}}") else {
            rest = &rest[start..];
            break;
        };

        let key = &after_open[..end];
        match vars.iter().find(|(name, _)| *name == key) {
            Some((_, value)) => result.push_str(value),
            None => result.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after_open[end + 2..];
    }

    result.push_str(rest);
    result
}

/// Build the user prompt for a caption, adding a line for each optional
/// field that has content.
pub fn caption_prompt(request: &CaptionRequest) -> String {
    let mut prompt = render(
        CAPTION_USER.trim_end(),
        &[("description", request.description.trim())],
    );
    prompt.push('\n');

    let optional = [
        ("Location", &request.location),
        ("Tone", &request.tone),
        ("Additional context", &request.additional_context),
    ];
    for (label, value) in optional {
        let value = value.trim();
        if !value.is_empty() {
            prompt.push_str(&format!("{}: {}\n", label, value));
        }
    }

    prompt.push_str("Caption:");
    prompt
}

pub fn alternatives_prompt(request: &FeedbackRequest) -> String {
    let direction = match request.direction.trim() {
        "" => "none",
        direction => direction,
    };
    render(
        ALTERNATIVES_USER.trim_end(),
        &[
            ("final_caption", request.final_caption.trim()),
            ("feedback", request.feedback.trim()),
            ("direction", direction),
        ],
    )
}
