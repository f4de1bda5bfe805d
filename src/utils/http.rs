use anyhow::Result;
use reqwest::{Client, ClientBuilder, Response};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, warn};

use crate::error::SourceError;

pub fn create_client(user_agent: &str, timeout_secs: u64) -> Result<Client> {
    let client = ClientBuilder::new()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(timeout_secs))
        .cookie_store(true)
        .pool_max_idle_per_host(6)
        .build()?;

    Ok(client)
}

/// GET with exponential backoff. Client errors (4xx) are returned at once, server errors and
/// transport failures are retried.
pub async fn fetch_with_retry(client: &Client, url: &str, max_retries: u32) -> Result<Response, SourceError> {
    let max_retries = max_retries.max(1);
    let mut attempts = 0;
    let mut last_error = String::from("no attempt made");

    while attempts < max_retries {
        match client.get(url).send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return Ok(response);
                }
                warn!("HTTP error {}: {}", status, url);
                if status.is_client_error() {
                    return Err(SourceError::Status {
                        url: url.to_string(),
                        status: status.as_u16(),
                    });
                }
                last_error = format!("HTTP error: {}", status);
            }
            Err(e) => {
                error!("Request failed for {}: {}", url, e);
                last_error = e.to_string();
            }
        }

        attempts += 1;
        if attempts < max_retries {
            let delay = Duration::from_secs(2u64.pow(attempts));
            warn!("Retrying in {:?}... (attempt {}/{})", delay, attempts + 1, max_retries);
            sleep(delay).await;
        }
    }

    Err(SourceError::RetriesExhausted {
        url: url.to_string(),
        attempts: max_retries,
        reason: last_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn returns_successful_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/in/ipad/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("iPad"))
            .mount(&server)
            .await;

        let client = create_client("lineup-specs-test", 5).unwrap();
        let response = fetch_with_retry(&client, &format!("{}/in/ipad/", server.uri()), 3).await.unwrap();
        assert_eq!(response.text().await.unwrap(), "iPad");
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let client = create_client("lineup-specs-test", 5).unwrap();
        let err = fetch_with_retry(&client, &format!("{}/missing", server.uri()), 3).await.unwrap_err();
        assert!(matches!(err, SourceError::Status { status: 404, .. }));
    }
}
