use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::media::ImageAsset;

pub const CLASSIFICATION_PROMPT: &str = "You are an agricultural waste classification expert. Analyze this image and determine if it contains one of these agricultural waste types:
1. Coconut shell
2. Banana stem
3. Rice husk

Respond in this exact format:
DETECTED TYPE: [coconut_shell OR banana_stem OR rice_husk OR unknown]
CONFIDENCE: [high OR medium OR low]
GUIDANCE: [If detected, provide 3-5 step-by-step instructions for creating handmade products from this waste. Be specific and practical. If unknown, explain why it couldn't be classified.]

Be concise and practical in your guidance.";

#[derive(Debug, Serialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub role: String,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

/// One `data:` payload of the streamed response.
#[derive(Debug, Deserialize, Default)]
pub struct StreamChunk {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize, Default)]
pub struct Candidate {
    #[serde(default)]
    pub content: Content,
}

impl StreamChunk {
    /// Text of the first part of the first candidate, if any.
    pub fn first_text(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .parts
            .first()?
            .text
            .as_deref()
            .filter(|t| !t.is_empty())
    }
}

/// Single user turn carrying the prompt and the image inline as base64.
pub fn build_body(asset: &ImageAsset) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content {
            role: "user".to_string(),
            parts: vec![
                Part {
                    text: Some(CLASSIFICATION_PROMPT.to_string()),
                    inline_data: None,
                },
                Part {
                    text: None,
                    inline_data: Some(InlineData {
                        mime_type: asset.media_type.clone(),
                        data: BASE64.encode(&asset.bytes),
                    }),
                },
            ],
        }],
    }
}
