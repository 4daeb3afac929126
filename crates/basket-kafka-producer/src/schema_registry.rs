//! Schema registry REST client.
//!
//! Schemas are registered under the topic-name strategy subject
//! (`{topic}-value`). Registering an identical schema twice is idempotent on
//! the registry side and returns the same id.

use crate::error::SchemaRegistryError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Subject name for a topic's record values.
pub fn value_subject(topic: &str) -> String {
    format!("{topic}-value")
}

/// Resolves a schema to its registry id, registering it when needed.
#[async_trait]
pub trait SchemaResolver: Send + Sync {
    async fn register(&self, subject: &str, schema: &str) -> Result<u32, SchemaRegistryError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest<'a> {
    schema_type: &'static str,
    schema: &'a str,
}

#[derive(Deserialize)]
struct RegisterResponse {
    id: u32,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error_code: i64,
    message: String,
}

/// HTTP client for a Confluent-compatible schema registry.
#[derive(Clone)]
pub struct SchemaRegistryClient {
    http: reqwest::Client,
    base_url: String,
    basic_auth: Option<(String, String)>,
}

impl SchemaRegistryClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            basic_auth: None,
        }
    }

    /// Send basic-auth credentials with every request.
    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.basic_auth = Some((username.into(), password.into()));
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn versions_url(&self, subject: &str) -> String {
        format!("{}/subjects/{}/versions", self.base_url, subject)
    }
}

#[async_trait]
impl SchemaResolver for SchemaRegistryClient {
    async fn register(&self, subject: &str, schema: &str) -> Result<u32, SchemaRegistryError> {
        let mut request = self
            .http
            .post(self.versions_url(subject))
            .header(reqwest::header::CONTENT_TYPE, "application/vnd.schemaregistry.v1+json")
            .json(&RegisterRequest {
                schema_type: "PROTOBUF",
                schema,
            });
        if let Some((username, password)) = &self.basic_auth {
            request = request.basic_auth(username, Some(password));
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        let id = parse_register_response(subject, status, &body)?;
        debug!("Registered schema for subject '{subject}' with id {id}");
        Ok(id)
    }
}

/// Interpret a registration response body.
pub(crate) fn parse_register_response(
    subject: &str,
    status: u16,
    body: &str,
) -> Result<u32, SchemaRegistryError> {
    if (200..300).contains(&status) {
        if let Ok(ok) = serde_json::from_str::<RegisterResponse>(body) {
            return Ok(ok.id);
        }
    }

    let (code, message) = match serde_json::from_str::<ErrorResponse>(body) {
        Ok(err) => (err.error_code, err.message),
        Err(_) => (-1, body.to_string()),
    };
    Err(SchemaRegistryError::Api {
        subject: subject.to_string(),
        status,
        code,
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_subject() {
        assert_eq!(value_subject("pos_basket"), "pos_basket-value");
    }

    #[test]
    fn test_versions_url_trims_slash() {
        let client = SchemaRegistryClient::new("http://localhost:8081/");
        assert_eq!(client.base_url(), "http://localhost:8081");
        assert_eq!(
            client.versions_url("pos_pmnt-value"),
            "http://localhost:8081/subjects/pos_pmnt-value/versions"
        );
    }

    #[test]
    fn test_register_request_body() {
        let body = serde_json::to_value(RegisterRequest {
            schema_type: "PROTOBUF",
            schema: "syntax = \"proto3\";",
        })
        .unwrap();
        assert_eq!(body["schemaType"], "PROTOBUF");
        assert_eq!(body["schema"], "syntax = \"proto3\";");
    }

    #[test]
    fn test_parse_success() {
        assert_eq!(parse_register_response("s-value", 200, r#"{"id":17}"#).unwrap(), 17);
    }

    #[test]
    fn test_parse_registry_error() {
        let err = parse_register_response(
            "s-value",
            409,
            r#"{"error_code":409,"message":"Schema being registered is incompatible"}"#,
        )
        .unwrap_err();
        match err {
            SchemaRegistryError::Api {
                subject,
                status,
                code,
                message,
            } => {
                assert_eq!(subject, "s-value");
                assert_eq!(status, 409);
                assert_eq!(code, 409);
                assert!(message.contains("incompatible"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_unstructured_error() {
        let err = parse_register_response("s-value", 502, "Bad Gateway").unwrap_err();
        assert!(matches!(
            err,
            SchemaRegistryError::Api { code: -1, status: 502, .. }
        ));
    }
}
