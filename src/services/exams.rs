// src/services/exams.rs

//! Exam backend client.
//!
//! General exams and college exams live in separate collections. New exams
//! are drafted by the generator service and persisted separately.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value};

use crate::error::{AppError, Result};
use crate::models::{
    BackendConfig, Exam, ExamDocument, ExamKind, ExamListResponse, ExamSubmission,
    GenerateRequest,
};
use crate::pipeline::RecordSource;
use crate::utils::endpoint;
use crate::utils::http::{self, create_async_client};

/// HTTP client for the exam, generator and persistence endpoints.
#[derive(Debug, Clone)]
pub struct ExamClient {
    client: Client,
    base_url: String,
    exams_url: String,
    generator_url: String,
    persistence_url: String,
}

impl ExamClient {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        Ok(Self {
            client: create_async_client(config)?,
            base_url: config.base_url.clone(),
            exams_url: config.exams_url.clone(),
            generator_url: config.generator_url.clone(),
            persistence_url: config.persistence_url.clone(),
        })
    }

    /// Host serving the list endpoint of `kind`.
    fn list_base(&self, kind: ExamKind) -> &str {
        match kind {
            ExamKind::General => &self.exams_url,
            ExamKind::College => &self.base_url,
        }
    }

    /// Every exam of one collection. Documents without an id are skipped.
    pub async fn list(&self, kind: ExamKind) -> Result<Vec<Exam>> {
        let url = endpoint(self.list_base(kind), &[kind.endpoint()])?;
        let response = self.client.get(url).send().await?;
        let envelope: ExamListResponse =
            http::read_json(response, &format!("Fetch {} exams", kind)).await?;

        let total = envelope.data.len();
        let exams: Vec<Exam> = envelope
            .data
            .into_iter()
            .filter_map(|doc| Exam::from_document(doc, kind))
            .collect();
        if exams.len() < total {
            log::warn!("Skipped {} {} exams without an id", total - exams.len(), kind);
        }

        log::info!("Fetched {} {} exams", exams.len(), kind);
        Ok(exams)
    }

    pub async fn get(&self, kind: ExamKind, id: &str) -> Result<ExamDocument> {
        let url = endpoint(&self.base_url, &[kind.endpoint(), id])?;
        let response = self.client.get(url).send().await?;
        http::read_json(response, &format!("Fetch exam {id}")).await
    }

    pub async fn update(&self, kind: ExamKind, id: &str, submission: &ExamSubmission) -> Result<()> {
        let url = endpoint(&self.base_url, &[kind.endpoint(), id])?;
        let response = self.client.put(url).json(submission).send().await?;
        http::check_status(response, &format!("Update exam {id}")).await?;
        log::info!("Updated {kind} exam {id}");
        Ok(())
    }

    pub async fn delete(&self, kind: ExamKind, id: &str) -> Result<()> {
        let url = endpoint(&self.base_url, &[kind.endpoint(), id])?;
        let response = self.client.delete(url).send().await?;
        http::check_status(response, &format!("Delete exam {id}")).await?;
        log::info!("Deleted {kind} exam {id}");
        Ok(())
    }

    /// Ask the generator to structure raw exam text.
    ///
    /// The answer is opaque, but it must be a JSON object.
    pub async fn generate_json(&self, request: &GenerateRequest) -> Result<Map<String, Value>> {
        let url = endpoint(&self.generator_url, &["generate-json"])?;
        let response = self.client.post(url).json(request).send().await?;
        let value: Value = http::read_json(response, "Generate exam details").await?;
        log::info!("Generated details for '{}'", request.exam_name);
        into_object(value)
    }

    /// Persist a new exam.
    pub async fn save(&self, submission: &ExamSubmission) -> Result<()> {
        let url = endpoint(&self.persistence_url, &["exams"])?;
        let response = self.client.post(url).json(submission).send().await?;
        http::check_status(response, "Save exam").await?;
        log::info!("Saved exam");
        Ok(())
    }
}

#[async_trait]
impl RecordSource<Exam> for ExamClient {
    async fn fetch(&self, kind: ExamKind) -> Result<Vec<Exam>> {
        self.list(kind).await
    }
}

fn into_object(value: Value) -> Result<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(AppError::validation(format!(
            "Generator returned {} instead of a JSON object",
            kind_name(&other)
        ))),
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_generator_output_must_be_object() {
        let map = into_object(json!({"Overview": "text"})).unwrap();
        assert!(map.contains_key("Overview"));

        let err = into_object(json!(["a"])).unwrap_err();
        assert!(err.to_string().contains("an array"));
        assert!(into_object(json!("x")).is_err());
    }

    #[test]
    fn test_list_base_per_kind() {
        let config = BackendConfig {
            exams_url: "https://exams.example.com".into(),
            ..BackendConfig::default()
        };
        let client = ExamClient::new(&config).unwrap();
        assert_eq!(client.list_base(ExamKind::General), "https://exams.example.com");
        assert_eq!(client.list_base(ExamKind::College), "http://localhost:8000");
    }
}
