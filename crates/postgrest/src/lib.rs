//! PostgREST table client for the Rocal admin dashboard
//!
//! A small, table-scoped client for the Supabase REST endpoint
//! (`{base_url}/rest/v1/{table}`).
//!
//! # Features
//!
//! - Query API (`select`, `insert`, `update`, `delete`)
//! - Equality filtering (`eq`)
//! - Ordering
//! - Structured API errors

use log::debug;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use url::Url;

/// Error body returned by PostgREST for a failed request
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PostgrestApiErrorDetails {
    pub code: Option<String>,
    pub message: Option<String>,
    pub details: Option<String>,
    pub hint: Option<String>,
}

impl fmt::Display for PostgrestApiErrorDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(code) = &self.code {
            parts.push(format!("Code: {}", code));
        }
        if let Some(message) = &self.message {
            parts.push(format!("Message: {}", message));
        }
        if let Some(details) = &self.details {
            parts.push(format!("Details: {}", details));
        }
        if let Some(hint) = &self.hint {
            parts.push(format!("Hint: {}", hint));
        }
        write!(f, "{}", parts.join(", "))
    }
}

/// Errors raised by [`PostgrestClient`]
#[derive(Error, Debug)]
pub enum PostgrestError {
    #[error("API error: {details} (Status: {status})")]
    ApiError {
        details: PostgrestApiErrorDetails,
        status: StatusCode,
    },

    #[error("API error (unparsed): {message} (Status: {status})")]
    UnparsedApiError { message: String, status: StatusCode },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),
}

impl PostgrestError {
    /// HTTP status of an API failure, if the server answered at all
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            PostgrestError::ApiError { status, .. }
            | PostgrestError::UnparsedApiError { status, .. } => Some(*status),
            PostgrestError::NetworkError(e) => e.status(),
            _ => None,
        }
    }

    /// The most specific human-readable message available
    pub fn message(&self) -> String {
        match self {
            PostgrestError::ApiError { details, .. } => details
                .message
                .clone()
                .unwrap_or_else(|| details.to_string()),
            PostgrestError::UnparsedApiError { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "asc",
            SortOrder::Descending => "desc",
        }
    }
}

/// PostgREST client bound to one table
#[derive(Debug, Clone)]
pub struct PostgrestClient {
    base_url: String,
    table: String,
    http_client: Client,
    headers: HeaderMap,
    query_params: HashMap<String, String>,
}

impl PostgrestClient {
    /// Create a client for `table` under `base_url`
    pub fn new(base_url: &str, api_key: &str, table: &str, http_client: Client) -> Self {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(api_key) {
            headers.insert("apikey", value);
        }
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            table: table.to_string(),
            http_client,
            headers,
            query_params: HashMap::new(),
        }
    }

    /// Add a request header
    pub fn with_header(mut self, key: &str, value: &str) -> Result<Self, PostgrestError> {
        let header_value = HeaderValue::from_str(value).map_err(|_| {
            PostgrestError::InvalidParameters(format!("Invalid header value: {}", value))
        })?;
        let header_name = HeaderName::from_bytes(key.as_bytes()).map_err(|_| {
            PostgrestError::InvalidParameters(format!("Invalid header name: {}", key))
        })?;

        self.headers.insert(header_name, header_value);
        Ok(self)
    }

    /// Authenticate requests with a bearer token
    pub fn with_auth(self, token: &str) -> Result<Self, PostgrestError> {
        self.with_header("Authorization", &format!("Bearer {}", token))
    }

    /// Columns to select
    pub fn select(mut self, columns: &str) -> Self {
        self.query_params
            .insert("select".to_string(), columns.to_string());
        self
    }

    /// Equality filter
    pub fn eq(mut self, column: &str, value: &str) -> Self {
        self.query_params
            .insert(column.to_string(), format!("eq.{}", value));
        self
    }

    /// Order the result set
    pub fn order(mut self, column: &str, order: SortOrder) -> Self {
        self.query_params
            .insert("order".to_string(), format!("{}.{}", column, order.as_str()));
        self
    }

    fn build_url(&self) -> Result<String, PostgrestError> {
        let mut url = Url::parse(&format!("{}/rest/v1/{}", self.base_url, self.table))?;

        if !self.query_params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &self.query_params {
                pairs.append_pair(key, value);
            }
        }

        Ok(url.to_string())
    }

    fn representation_headers(&self) -> HeaderMap {
        let mut headers = self.headers.clone();
        headers.insert(
            HeaderName::from_static("prefer"),
            HeaderValue::from_static("return=representation"),
        );
        headers
    }

    /// Fetch rows
    pub async fn execute<T: for<'de> Deserialize<'de>>(&self) -> Result<Vec<T>, PostgrestError> {
        let url = self.build_url()?;
        debug!("GET {}", url);

        let response = self
            .http_client
            .get(&url)
            .headers(self.headers.clone())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(error_from_response(response).await);
        }

        response
            .json::<Vec<T>>()
            .await
            .map_err(|e| PostgrestError::DeserializationError(e.to_string()))
    }

    /// Insert rows and return their representation
    pub async fn insert<T: Serialize>(&self, values: T) -> Result<Value, PostgrestError> {
        let url = self.build_url()?;
        debug!("POST {}", url);

        let response = self
            .http_client
            .post(&url)
            .headers(self.representation_headers())
            .json(&values)
            .send()
            .await?;

        read_representation(response).await
    }

    /// Update the rows matched by the filters and return their representation
    pub async fn update<T: Serialize>(&self, values: T) -> Result<Value, PostgrestError> {
        let url = self.build_url()?;
        debug!("PATCH {}", url);

        let response = self
            .http_client
            .patch(&url)
            .headers(self.representation_headers())
            .json(&values)
            .send()
            .await?;

        read_representation(response).await
    }

    /// Delete the rows matched by the filters and return their representation
    pub async fn delete(&self) -> Result<Value, PostgrestError> {
        let url = self.build_url()?;
        debug!("DELETE {}", url);

        let response = self
            .http_client
            .delete(&url)
            .headers(self.representation_headers())
            .send()
            .await?;

        read_representation(response).await
    }
}

/// Number of rows in a `return=representation` body (`Null` counts as none)
pub fn affected_rows(representation: &Value) -> usize {
    match representation {
        Value::Array(rows) => rows.len(),
        Value::Null => 0,
        _ => 1,
    }
}

async fn read_representation(response: Response) -> Result<Value, PostgrestError> {
    let status = response.status();
    if !status.is_success() {
        return Err(error_from_response(response).await);
    }

    let body_text = response.text().await.map_err(|e| {
        PostgrestError::DeserializationError(format!("Failed to read response body: {}", e))
    })?;

    // 204 No Content
    if body_text.trim().is_empty() {
        return Ok(Value::Null);
    }

    serde_json::from_str::<Value>(&body_text)
        .map_err(|e| PostgrestError::DeserializationError(e.to_string()))
}

async fn error_from_response(response: Response) -> PostgrestError {
    let status = response.status();
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to read error response".to_string());

    match serde_json::from_str::<PostgrestApiErrorDetails>(&error_text) {
        Ok(details) => PostgrestError::ApiError { details, status },
        Err(_) => PostgrestError::UnparsedApiError {
            message: error_text,
            status,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, table: &str) -> PostgrestClient {
        PostgrestClient::new(&server.uri(), "fake-key", table, reqwest::Client::new())
    }

    #[tokio::test]
    async fn test_select_ordered() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/materiales"))
            .and(query_param("select", "*"))
            .and(query_param("order", "createdAt.desc"))
            .and(header("apikey", "fake-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": 2, "name": "Acero" },
                { "id": 1, "name": "Cemento" }
            ])))
            .mount(&mock_server)
            .await;

        let result = client(&mock_server, "materiales")
            .select("*")
            .order("createdAt", SortOrder::Descending)
            .execute::<Value>()
            .await;

        let data = result.unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data[0]["name"], "Acero");
    }

    #[tokio::test]
    async fn test_insert_sends_representation_preference() {
        let mock_server = MockServer::start().await;
        let row = json!({ "name": "Arena", "price": 12.5 });

        Mock::given(method("POST"))
            .and(path("/rest/v1/materiales"))
            .and(header("prefer", "return=representation"))
            .and(body_json(&row))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([
                { "id": 7, "name": "Arena", "price": 12.5 }
            ])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let inserted = client(&mock_server, "materiales")
            .insert(&row)
            .await
            .unwrap();

        assert_eq!(affected_rows(&inserted), 1);
        assert_eq!(inserted[0]["id"], 7);
    }

    #[tokio::test]
    async fn test_update_filters_by_id() {
        let mock_server = MockServer::start().await;

        Mock::given(method("PATCH"))
            .and(path("/rest/v1/destajos"))
            .and(query_param("id", "eq.3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&mock_server)
            .await;

        let updated = client(&mock_server, "destajos")
            .eq("id", "3")
            .update(json!({ "status": "done" }))
            .await
            .unwrap();

        assert_eq!(affected_rows(&updated), 0);
    }

    #[tokio::test]
    async fn test_delete_no_content() {
        let mock_server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/rest/v1/proveedores"))
            .and(query_param("id", "eq.9"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&mock_server)
            .await;

        let deleted = client(&mock_server, "proveedores")
            .eq("id", "9")
            .delete()
            .await
            .unwrap();

        assert_eq!(deleted, Value::Null);
    }

    #[tokio::test]
    async fn test_api_error_details_are_parsed() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/proveedores"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "code": "42501",
                "message": "permission denied for table proveedores",
                "details": null,
                "hint": null
            })))
            .mount(&mock_server)
            .await;

        let err = client(&mock_server, "proveedores")
            .select("*")
            .execute::<Value>()
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
        assert_eq!(err.message(), "permission denied for table proveedores");
        match err {
            PostgrestError::ApiError { details, .. } => {
                assert_eq!(details.code.as_deref(), Some("42501"))
            }
            other => panic!("Expected ApiError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unparsed_error_keeps_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/destajos"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&mock_server)
            .await;

        let err = client(&mock_server, "destajos")
            .execute::<Value>()
            .await
            .unwrap_err();

        assert_eq!(err.message(), "bad gateway");
    }

    #[test]
    fn test_with_header_rejects_invalid_value() {
        let client = PostgrestClient::new(
            "http://localhost:54321",
            "fake-key",
            "materiales",
            reqwest::Client::new(),
        );
        assert!(matches!(
            client.with_header("Authorization", "bad\nvalue"),
            Err(PostgrestError::InvalidParameters(_))
        ));
    }

    #[test]
    fn test_build_url_trims_trailing_slash() {
        let client = PostgrestClient::new(
            "http://localhost:54321/",
            "fake-key",
            "materiales",
            reqwest::Client::new(),
        )
        .eq("id", "4");
        let url = client.build_url().unwrap();
        assert_eq!(url, "http://localhost:54321/rest/v1/materiales?id=eq.4");
    }
}
