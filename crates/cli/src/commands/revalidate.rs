//! Catalog cache revalidation trigger.
//!
//! # Usage
//!
//! ```bash
//! pz-cli revalidate --url https://pzairsoft.ca --token "$REVALIDATE_TOKEN"
//! ```

use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur while triggering revalidation.
#[derive(Debug, Error)]
pub enum RevalidateError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The storefront refused the request.
    #[error("Storefront answered {status}: {body}")]
    Rejected { status: u16, body: String },
}

fn endpoint(base_url: &str) -> String {
    format!("{}/api/revalidate", base_url.trim_end_matches('/'))
}

/// POST to the storefront's revalidation endpoint.
///
/// Returns the storefront's revalidation timestamp (epoch millis) when it
/// reports one.
///
/// # Errors
///
/// Returns `RevalidateError` if the request fails or is not accepted.
pub async fn trigger(base_url: &str, token: &SecretString) -> Result<Option<i64>, RevalidateError> {
    let url = endpoint(base_url);
    tracing::info!("Revalidating {}", url);

    let response = reqwest::Client::new()
        .post(&url)
        .bearer_auth(token.expose_secret())
        .send()
        .await?;
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(RevalidateError::Rejected {
            status: status.as_u16(),
            body: body.chars().take(500).collect(),
        });
    }

    let timestamp = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v.get("timestamp").and_then(Value::as_i64));
    tracing::info!(timestamp = ?timestamp, "Catalog cache cleared");
    Ok(timestamp)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        assert_eq!(
            endpoint("https://pzairsoft.ca/"),
            "https://pzairsoft.ca/api/revalidate"
        );
    }

    #[tokio::test]
    async fn test_trigger_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/revalidate"))
            .and(header("Authorization", "Bearer s3cr3t-T0ken"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "revalidated": true, "timestamp": 1_732_600_000_000_i64 })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let timestamp = trigger(&server.uri(), &SecretString::from("s3cr3t-T0ken"))
            .await
            .unwrap();
        assert_eq!(timestamp, Some(1_732_600_000_000));
    }

    #[tokio::test]
    async fn test_trigger_reports_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/revalidate"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "error": "Unauthorized" })))
            .mount(&server)
            .await;

        let result = trigger(&server.uri(), &SecretString::from("wrong")).await;
        assert!(matches!(result, Err(RevalidateError::Rejected { status: 401, .. })));
    }
}
