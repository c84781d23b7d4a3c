use serde::Serialize;

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const MAX_TOKENS: u32 = 1000;
pub const TEMPERATURE: f32 = 0.5;
pub const TOP_P: f32 = 0.95;

const SYSTEM_PROMPT: &str = "You are an expert writing assistant. Write a creative, original and coherent article about the topic you are given.
Reply with the article ONLY, in exactly this format and with nothing before or after it:

Title: <article title>
Short Description: <one-sentence summary>
Article: <full article text>
Author: <byline, optional>
Date: <publication date, optional>

Do not add warnings, disclaimers or commentary.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub role: &'static str,
    pub content: String,
}

/// Chat-completion request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

/// The topic goes into the user message verbatim.
pub fn build_request(model: &str, topic: &str) -> ChatRequest {
    ChatRequest {
        model: model.to_string(),
        messages: vec![
            Message {
                role: "system",
                content: SYSTEM_PROMPT.to_string(),
            },
            Message {
                role: "user",
                content: format!("Generate an article about \"{}\"", topic),
            },
        ],
        max_tokens: MAX_TOKENS,
        temperature: TEMPERATURE,
        top_p: TOP_P,
    }
}
