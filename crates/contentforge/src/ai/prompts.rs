//! Prompt library shared by the AI processor and attempt recording.
//!
//! A bundle attempt stores the exact system prompt sent to the model, so
//! both sides must build it through `system_prompt`.

use std::fmt::Write;

use crate::models::{ProcessingType, SourceType};

/// Placeholder replaced by the source text in user prompt templates.
pub const CONTENT_PLACEHOLDER: &str = "{content}";

/// What kind of input the model is looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptSource {
    Item(SourceType),
    /// Several items concatenated with attribution headers.
    Bundle,
}

impl PromptSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptSource::Item(source_type) => source_type.as_str(),
            PromptSource::Bundle => "bundle",
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            PromptSource::Item(SourceType::PdfUrl) | PromptSource::Item(SourceType::PdfFile) => {
                "a PDF document"
            }
            PromptSource::Item(SourceType::Youtube) => "a YouTube video transcript",
            PromptSource::Item(SourceType::Web) => "a web article",
            PromptSource::Bundle => "a collection of related sources",
        }
    }
}

fn base_instructions(processing_type: ProcessingType) -> &'static str {
    match processing_type {
        ProcessingType::Summary => {
            "You are an expert analyst who writes clear, faithful summaries. \
             Capture the main argument, the key facts and figures, and any conclusions. \
             Use short sections with headings and bullet points where they help. \
             Do not invent information that is not in the source."
        }
        ProcessingType::MvpPlan => {
            "You are a pragmatic product strategist. \
             Turn the source material into a minimum viable product plan: \
             the problem, the target users, the smallest feature set that tests the idea, \
             a build sequence with milestones, and the metrics that decide whether it worked."
        }
        ProcessingType::ContentIdeas => {
            "You are a content strategist. \
             Derive a list of concrete content ideas from the source material. \
             For each idea give a working title, the angle, the intended audience \
             and the format (article, video, thread, newsletter)."
        }
        ProcessingType::BlogPost => {
            "You are an experienced blog writer. \
             Write an engaging, well-structured blog post based on the source material, \
             with a compelling title, an introduction, body sections with headings \
             and a conclusion. Keep the facts accurate to the source."
        }
    }
}

const BUNDLE_GUIDANCE: &str = "The input consists of several sources, each introduced by a \
     '=== SOURCE n: title ===' header. Synthesize across all of them: \
     point out where they agree, where they differ, and attribute specific claims \
     to their source by title.";

/// Maps an ISO 639-1 code to the language name used in prompts. Unknown
/// codes are passed through unchanged.
pub fn language_name(code: &str) -> &str {
    match code.to_ascii_lowercase().as_str() {
        "en" => "English",
        "de" => "German",
        "fr" => "French",
        "es" => "Spanish",
        "it" => "Italian",
        "pt" => "Portuguese",
        "nl" => "Dutch",
        "pl" => "Polish",
        "ru" => "Russian",
        "uk" => "Ukrainian",
        "tr" => "Turkish",
        "ja" => "Japanese",
        "ko" => "Korean",
        "zh" => "Chinese",
        "ar" => "Arabic",
        "hi" => "Hindi",
        _ => code,
    }
}

/// Builds the full system prompt for a run.
pub fn system_prompt(processing_type: ProcessingType, source: PromptSource, language: &str) -> String {
    let mut prompt = String::from(base_instructions(processing_type));
    let _ = write!(prompt, "\n\nThe input is {}.", source.describe());

    if source == PromptSource::Bundle {
        prompt.push_str("\n\n");
        prompt.push_str(BUNDLE_GUIDANCE);
    }

    if !language.eq_ignore_ascii_case("en") {
        let _ = write!(
            prompt,
            "\n\nWrite the entire response in {}.",
            language_name(language)
        );
    }

    prompt
}

/// User prompt template for a processing type; contains `{content}`.
pub fn user_prompt_template(processing_type: ProcessingType) -> &'static str {
    match processing_type {
        ProcessingType::Summary => "Summarize the following content:\n\n{content}",
        ProcessingType::MvpPlan => "Create an MVP plan based on the following content:\n\n{content}",
        ProcessingType::ContentIdeas => {
            "Generate content ideas based on the following content:\n\n{content}"
        }
        ProcessingType::BlogPost => "Write a blog post based on the following content:\n\n{content}",
    }
}

/// Substitutes the source text into a template.
pub fn render_user_prompt(template: &str, content: &str) -> String {
    template.replace(CONTENT_PLACEHOLDER, content)
}

/// User message for the custom-prompt path: the standard message followed
/// by the caller's instructions.
pub fn render_with_instructions(
    processing_type: ProcessingType,
    content: &str,
    instructions: &str,
) -> String {
    let mut message = render_user_prompt(user_prompt_template(processing_type), content);
    let _ = write!(message, "\n\nAdditional instructions:\n{}", instructions.trim());
    message
}
