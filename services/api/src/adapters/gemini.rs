//! services/api/src/adapters/gemini.rs
//!
//! This module contains the adapter for the Gemini image provider. It implements
//! the `ImageProvider` and `ProviderConnector` ports from the `core` crate.
//!
//! Key checks and text-to-image generation go through Gemini's OpenAI-compatible
//! surface with `async-openai`. Edits and blends need inline image parts, which
//! only the native `generateContent` endpoint accepts, so those use `reqwest`.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs},
    types::images::{CreateImageRequestArgs, Image, ImageModel, ImageResponseFormat},
    Client,
};
use async_trait::async_trait;
use nayra_core::domain::{EditedImage, ImageUpload};
use nayra_core::ports::{ImageProvider, PortError, PortResult, ProviderConnector};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::config::ProviderSettings;

const NO_TEXT_RESPONSE: &str = "No text response from model.";

//=========================================================================================
// Prompt Construction
//=========================================================================================

fn generate_prompt(prompt: &str) -> String {
    format!(
        "Create a visually stunning, highly detailed, and photorealistic image. Pay meticulous attention to every word in the user's prompt to ensure the output is accurate and of the highest quality.\n\nUser Prompt: \"{}\"",
        prompt
    )
}

fn edit_prompt(prompt: &str, with_reference: bool) -> String {
    if with_reference {
        format!(
            "You are a professional AI photo editor. Using the two images provided, apply the following instruction to the first image. Use the second image as a style and content reference. Create a seamless, high-quality result.\n\nInstruction: \"{}\"",
            prompt
        )
    } else {
        format!(
            "You are a professional AI photo editor. Apply the following instruction to the image provided. Make the edit look as natural as possible while maintaining the original image's style, lighting, and quality.\n\nInstruction: \"{}\"",
            prompt
        )
    }
}

fn combine_prompt(prompt: &str) -> String {
    format!(
        "You are a world-class AI photo compositor. Your task is to seamlessly blend the provided images into a single, cohesive, and photorealistic masterpiece. Pay meticulous attention to matching lighting, shadows, perspective, color grading, and scale to ensure the final image is believable and visually stunning. Follow the user's instructions with absolute precision.\n\nUser's Combination Instructions: \"{}\"",
        prompt
    )
}

//=========================================================================================
// Native `generateContent` Wire Types
//=========================================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<&'static str>,
}

#[derive(Serialize, Deserialize, Default)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Deserialize, Default)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

impl Part {
    fn image(upload: &ImageUpload) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: upload.mime_type.clone(),
                data: upload.base64_data.clone(),
            }),
        }
    }

    fn text(text: String) -> Self {
        Self {
            text: Some(text),
            inline_data: None,
        }
    }
}

impl GenerateContentRequest {
    /// Images first, in order, followed by the instruction text.
    fn new(images: &[&ImageUpload], prompt: String) -> Self {
        let mut parts: Vec<Part> = images.iter().map(|image| Part::image(image)).collect();
        parts.push(Part::text(prompt));
        Self {
            contents: vec![Content { parts }],
            generation_config: GenerationConfig {
                response_modalities: vec!["IMAGE", "TEXT"],
            },
        }
    }
}

impl GenerateContentResponse {
    fn first_candidate_parts(&self) -> &[Part] {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.as_slice())
            .unwrap_or_default()
    }

    /// The last image part and the last text part of the first candidate.
    fn into_edited_image(self) -> Option<EditedImage> {
        let mut image = None;
        let mut text = None;
        for part in self.first_candidate_parts() {
            if let Some(t) = &part.text {
                text = Some(t.clone());
            } else if let Some(data) = &part.inline_data {
                image = Some(data_url(data));
            }
        }
        image.map(|image| EditedImage {
            image,
            text: text.unwrap_or_else(|| NO_TEXT_RESPONSE.to_string()),
        })
    }

    /// The first image part of the first candidate.
    fn first_image(&self) -> Option<String> {
        self.first_candidate_parts()
            .iter()
            .find_map(|part| part.inline_data.as_ref())
            .map(data_url)
    }
}

fn data_url(data: &InlineData) -> String {
    format!("data:{};base64,{}", data.mime_type, data.data)
}

fn provider_error(e: OpenAIError) -> PortError {
    match e {
        OpenAIError::ApiError(api) => {
            PortError::Unexpected(format!("Provider rejected the request: {}", api))
        }
        other => PortError::Unexpected(other.to_string()),
    }
}

//=========================================================================================
// The Main Adapter Structs
//=========================================================================================

/// Builds a `GeminiImageAdapter` for each API key handed to it.
#[derive(Clone)]
pub struct GeminiConnector {
    http: reqwest::Client,
    settings: ProviderSettings,
}

impl GeminiConnector {
    /// Creates a new `GeminiConnector`.
    pub fn new(settings: ProviderSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            settings,
        }
    }
}

impl ProviderConnector for GeminiConnector {
    fn connect(&self, api_key: &str) -> Arc<dyn ImageProvider> {
        Arc::new(GeminiImageAdapter::new(
            self.http.clone(),
            self.settings.clone(),
            api_key.to_string(),
        ))
    }
}

/// An adapter that implements `ImageProvider` against Gemini with one API key.
#[derive(Clone)]
pub struct GeminiImageAdapter {
    client: Client<OpenAIConfig>,
    http: reqwest::Client,
    settings: ProviderSettings,
    api_key: String,
}

impl GeminiImageAdapter {
    /// Creates a new `GeminiImageAdapter`.
    pub fn new(http: reqwest::Client, settings: ProviderSettings, api_key: String) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_base(settings.openai_base.clone())
            .with_api_key(api_key.clone());
        Self {
            client: Client::with_config(openai_config),
            http,
            settings,
            api_key,
        }
    }

    async fn generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> PortResult<GenerateContentResponse> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.settings.api_base.trim_end_matches('/'),
            self.settings.edit_model
        );
        debug!("Calling {}", url);

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(PortError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PortError::Unexpected(format!(
                "Provider returned {}: {}",
                status, body
            )));
        }

        response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))
    }
}

//=========================================================================================
// `ImageProvider` Trait Implementation
//=========================================================================================

#[async_trait]
impl ImageProvider for GeminiImageAdapter {
    /// Sends a one-word chat prompt; any successful completion means the key works.
    async fn ping(&self) -> PortResult<()> {
        let message = ChatCompletionRequestUserMessageArgs::default()
            .content("hello")
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.settings.verify_model)
            .messages(vec![message.into()])
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        self.client
            .chat()
            .create(request)
            .await
            .map_err(provider_error)?;
        Ok(())
    }

    async fn generate_image(&self, prompt: &str) -> PortResult<String> {
        let request = CreateImageRequestArgs::default()
            .prompt(generate_prompt(prompt))
            .model(ImageModel::Other(self.settings.image_model.clone()))
            .n(1u8)
            .response_format(ImageResponseFormat::B64Json)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = self.client.images().generate(request).await.map_err(|e| {
            error!("Error generating image: {}", e);
            provider_error(e)
        })?;

        let image = response
            .data
            .first()
            .ok_or_else(|| PortError::Unexpected("No image was generated.".to_string()))?;
        match image.as_ref() {
            Image::B64Json { b64_json, .. } => {
                info!("Generated image for a {}-character prompt", prompt.len());
                Ok(format!("data:image/png;base64,{}", b64_json))
            }
            Image::Url { url, .. } => Ok(url.clone()),
        }
    }

    async fn edit_image(
        &self,
        prompt: &str,
        main: &ImageUpload,
        reference: Option<&ImageUpload>,
    ) -> PortResult<EditedImage> {
        let mut images = vec![main];
        images.extend(reference);
        let request = GenerateContentRequest::new(&images, edit_prompt(prompt, reference.is_some()));

        let response = self.generate_content(&request).await.map_err(|e| {
            error!("Error editing image: {}", e);
            e
        })?;
        response.into_edited_image().ok_or_else(|| {
            PortError::Unexpected("The model did not return an image.".to_string())
        })
    }

    async fn combine_images(&self, prompt: &str, images: &[ImageUpload]) -> PortResult<String> {
        if images.is_empty() {
            return Err(PortError::InvalidInput(
                "At least one image is required to combine.".to_string(),
            ));
        }

        let images: Vec<&ImageUpload> = images.iter().collect();
        let request = GenerateContentRequest::new(&images, combine_prompt(prompt));

        let response = self.generate_content(&request).await.map_err(|e| {
            error!("Error combining images: {}", e);
            e
        })?;
        response.first_image().ok_or_else(|| {
            PortError::Unexpected("The model did not return a combined image.".to_string())
        })
    }
}
