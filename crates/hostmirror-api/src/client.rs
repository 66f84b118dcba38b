// Async HTTP client for the remote server's GraphQL endpoint.
//
// Endpoint: {base}/graphql
// Auth: x-api-key header

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};
use url::Url;

use crate::Error;
use crate::transport::TransportConfig;

// ── Wire shapes ──────────────────────────────────────────────────────

#[derive(Serialize)]
struct QueryRequest<'a> {
    query: &'a str,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<RemoteError>,
}

#[derive(Deserialize)]
struct RemoteError {
    #[serde(default)]
    message: Option<String>,
}

impl RemoteError {
    fn into_message(self) -> String {
        self.message.unwrap_or_else(|| "unspecified error".into())
    }
}

// ── Client ───────────────────────────────────────────────────────────

/// Long-lived client for one remote server.
///
/// Holds a single `reqwest::Client` (connection pool included) so a
/// poller can reuse it for every cycle.
pub struct GraphqlClient {
    http: reqwest::Client,
    endpoint: Url,
}

impl GraphqlClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from an API key and transport config.
    ///
    /// Injects `x-api-key` as a sensitive default header on every request.
    pub fn from_api_key(
        base_url: &str,
        api_key: &SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        let mut key_value =
            HeaderValue::from_str(api_key.expose_secret()).map_err(|e| Error::Authentication {
                message: format!("invalid API key header value: {e}"),
            })?;
        key_value.set_sensitive(true);
        headers.insert("x-api-key", key_value);

        let http = transport.build_client(headers)?;
        let endpoint = Self::normalize_endpoint(base_url)?;

        Ok(Self { http, endpoint })
    }

    /// Append `/graphql` unless the address already points at it.
    fn normalize_endpoint(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        let path = url.path().trim_end_matches('/').to_owned();

        if !path.ends_with("/graphql") {
            url.set_path(&format!("{path}/graphql"));
        }

        Ok(url)
    }

    /// The resolved GraphQL endpoint.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    // ── Query ────────────────────────────────────────────────────────

    /// Send one query and return the top-level `data` object.
    ///
    /// Fields the server does not know are simply missing from the map.
    /// Errors reported next to a non-null `data` are logged and the partial
    /// data is returned; errors without data fail the exchange.
    pub async fn query(&self, text: &str) -> Result<Map<String, Value>, Error> {
        debug!(endpoint = %self.endpoint, bytes = text.len(), "POST query");

        let resp = self
            .http
            .post(self.endpoint.clone())
            .json(&QueryRequest { query: text })
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(Error::InvalidApiKey);
        }

        let body = resp.text().await?;
        if !status.is_success() {
            return Err(failed_status(status, &body));
        }

        let parsed: QueryResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(e) => {
                return Err(Error::Deserialization {
                    message: format!("{e} (body preview: {:?})", preview(&body)),
                    body,
                });
            }
        };

        split_response(parsed)
    }
}

const PREVIEW_CHARS: usize = 200;

/// At most `PREVIEW_CHARS` characters of `body`, cut on a char boundary.
fn preview(body: &str) -> String {
    body.chars().take(PREVIEW_CHARS).collect()
}

/// Error for a non-success status. Never yields data, even when the body
/// is valid JSON.
fn failed_status(status: reqwest::StatusCode, body: &str) -> Error {
    if let Ok(QueryResponse { errors, .. }) = serde_json::from_str::<QueryResponse>(body) {
        if !errors.is_empty() {
            return Error::Graphql {
                messages: errors.into_iter().map(RemoteError::into_message).collect(),
            };
        }
    }
    Error::Http {
        status: status.as_u16(),
        message: if body.is_empty() {
            status.to_string()
        } else {
            preview(body)
        },
    }
}

/// Separate usable data from remote-reported errors.
fn split_response(resp: QueryResponse) -> Result<Map<String, Value>, Error> {
    let messages: Vec<String> = resp.errors.into_iter().map(RemoteError::into_message).collect();

    match resp.data {
        Some(Value::Object(data)) => {
            if !messages.is_empty() {
                warn!(errors = ?messages, "remote reported errors alongside data");
            }
            Ok(data)
        }
        Some(Value::Null) | None if !messages.is_empty() => Err(Error::Graphql { messages }),
        Some(Value::Null) | None => Ok(Map::new()),
        Some(other) => Err(Error::Deserialization {
            message: "`data` is not an object".into(),
            body: other.to_string(),
        }),
    }
}
