//! Blob content retrieval and base64 decoding.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::Value;
use tracing::{info, instrument, warn};

use repocorpus_shared::{ContentPolicy, CorpusError, FailurePolicy, Result, RetrievedFile};

use crate::client::{ApiClient, ApiResponse};
use crate::fanout;

/// Outcome of fetching a single content URL.
#[derive(Debug)]
enum FetchOutcome {
    Decoded(RetrievedFile),
    Missing { url: String, reason: String },
    Undecodable { url: String, message: String },
}

/// Fetch and decode every URL in `urls`.
///
/// Requests fan out up to the client's concurrency bound. Each missing
/// payload or decode failure is logged at warning level; with
/// [`FailurePolicy::Propagate`] for its category the first such failure (in
/// input order) is returned as an error once the whole batch has finished.
/// Successfully decoded files come back in input order.
#[instrument(skip_all, fields(files = urls.len()))]
pub async fn fetch_contents(
    client: &ApiClient,
    urls: &[String],
    policy: ContentPolicy,
) -> Result<Vec<RetrievedFile>> {
    let outcomes = fanout::bounded(urls.to_vec(), client.concurrency(), |url| {
        let client = client.clone();
        async move { fetch_one(&client, url).await }
    })
    .await;

    let mut files = Vec::with_capacity(outcomes.len());
    let mut first_error: Option<CorpusError> = None;

    for outcome in outcomes.into_iter().flatten() {
        match outcome {
            FetchOutcome::Decoded(file) => files.push(file),
            FetchOutcome::Missing { url, reason } => {
                warn!(%url, %reason, "no content detected for file");
                if policy.missing_content == FailurePolicy::Propagate && first_error.is_none() {
                    first_error = Some(CorpusError::MissingContent { url });
                }
            }
            FetchOutcome::Undecodable { url, message } => {
                warn!(%url, %message, "unable to decode content for file");
                if policy.decode_failure == FailurePolicy::Propagate && first_error.is_none() {
                    first_error = Some(CorpusError::Decode { url, message });
                }
            }
        }
    }

    info!("decoded data for {}/{} files", files.len(), urls.len());

    match first_error {
        Some(e) => Err(e),
        None => Ok(files),
    }
}

/// Fetch a single content URL and decode its payload.
async fn fetch_one(client: &ApiClient, url: String) -> FetchOutcome {
    let body = match client.get_json(&url).await {
        Ok(ApiResponse::Success(body)) => body,
        Ok(ApiResponse::Failure { status }) => {
            return FetchOutcome::Missing {
                url,
                reason: format!("HTTP {status}"),
            };
        }
        Err(e) => {
            return FetchOutcome::Missing {
                url,
                reason: e.to_string(),
            };
        }
    };

    let payload = match extract_payload(&body) {
        Ok(payload) => payload,
        Err(reason) => return FetchOutcome::Missing { url, reason },
    };

    match decode_content(payload) {
        Ok(text) => FetchOutcome::Decoded(RetrievedFile {
            source_url: url,
            text,
        }),
        Err(message) => FetchOutcome::Undecodable { url, message },
    }
}

/// Pull the base64 `content` field out of a blob/contents response.
fn extract_payload(body: &Value) -> std::result::Result<&str, String> {
    if let Some(encoding) = body.get("encoding").and_then(Value::as_str) {
        if encoding != "base64" {
            return Err(format!("unsupported encoding '{encoding}'"));
        }
    }

    body.get("content")
        .and_then(Value::as_str)
        .ok_or_else(|| "response has no content field".to_string())
}

/// Decode a base64 payload into UTF-8 text.
///
/// The API wraps payloads at 60 columns, so embedded whitespace is ignored.
pub fn decode_content(payload: &str) -> std::result::Result<String, String> {
    let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = BASE64
        .decode(compact.as_bytes())
        .map_err(|e| format!("invalid base64: {e}"))?;
    String::from_utf8(bytes).map_err(|e| format!("not UTF-8: {e}"))
}
