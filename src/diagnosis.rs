//! Self-diagnosis through the Gemini `generateContent` REST API.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::utils::USER_AGENT;

#[derive(Debug, Error)]
pub enum DiagnosisError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("No API key configured")]
    NotConfigured,

    #[error("API error [{status}]: {message}")]
    Api { status: u16, message: String },

    #[error("Response carried no text")]
    EmptyResponse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    fn label(self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Other => "Other",
        }
    }
}

/// What the patient reported on the self-diagnosis form.
#[derive(Debug, Clone, Serialize)]
pub struct Symptoms {
    pub age: u8,
    pub gender: Gender,
    pub duration: String,
    pub symptoms: String,
    pub allergies: String,
    pub medications: String,
}

impl Symptoms {
    pub fn prompt(&self) -> String {
        format!(
            "Based on the following information, provide a possible diagnosis and advice:\n\
             - Age: {}\n\
             - Gender: {}\n\
             - Duration of Symptoms: {}\n\
             - Symptoms: {}\n\
             - Allergies: {}\n\
             - Medications: {}\n\n\
             Please provide a detailed response.",
            self.age,
            self.gender.label(),
            self.duration,
            self.symptoms,
            or_none(&self.allergies),
            or_none(&self.medications),
        )
    }
}

fn or_none(value: &str) -> &str {
    if value.trim().is_empty() {
        "None"
    } else {
        value
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DiagnosisClient {
    base_url: String,
    model: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl DiagnosisClient {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, DiagnosisError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            model: model.into(),
            api_key,
            client,
        })
    }

    pub async fn diagnose(&self, symptoms: &Symptoms) -> Result<String, DiagnosisError> {
        let api_key = self.api_key.as_deref().ok_or(DiagnosisError::NotConfigured)?;
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let body = json!({
            "contents": [{ "parts": [{ "text": symptoms.prompt() }] }]
        });

        let resp = self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await?;
        let status = resp.status().as_u16();
        if status >= 400 {
            let body: serde_json::Value = resp.json().await.unwrap_or_default();
            let message = body["error"]["message"]
                .as_str()
                .unwrap_or("unknown API error")
                .to_owned();
            return Err(DiagnosisError::Api { status, message });
        }
        text_of(resp.json().await?)
    }
}

fn text_of(resp: GenerateResponse) -> Result<String, DiagnosisError> {
    let text = resp
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err(DiagnosisError::EmptyResponse);
    }
    Ok(text)
}
