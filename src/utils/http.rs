use crate::utils::error::{ActionError, Result};
use reqwest::header::RETRY_AFTER;
use reqwest::{RequestBuilder, Response, StatusCode};
use std::time::Duration;

/// Sends `request`, retrying once after the server-supplied `Retry-After`
/// when the response says we are rate limited.
pub async fn send_with_rate_limit_retry(operation: &str, request: RequestBuilder) -> Result<Response> {
    let retry = request.try_clone();
    let response = request
        .send()
        .await
        .map_err(|e| ActionError::upstream(operation, e))?;

    let (Some(delay), Some(retry)) = (rate_limit_delay(&response), retry) else {
        return Ok(response);
    };

    tracing::warn!("{}: rate limited, retrying in {:?}", operation, delay);
    tokio::time::sleep(delay).await;

    let response = retry
        .send()
        .await
        .map_err(|e| ActionError::upstream(operation, e))?;

    if rate_limit_delay(&response).is_some() {
        return Err(ActionError::upstream(operation, "still rate limited after one retry"));
    }
    Ok(response)
}

/// The wait requested by a rate-limited response, if any.
///
/// GitHub signals secondary rate limits with 403 + `Retry-After`, Slack and
/// everyone else with 429.
pub fn rate_limit_delay(response: &Response) -> Option<Duration> {
    let status = response.status();
    if status != StatusCode::TOO_MANY_REQUESTS && status != StatusCode::FORBIDDEN {
        return None;
    }

    let seconds = response
        .headers()
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()?;

    Some(Duration::from_secs(seconds))
}

/// Turns a non-2xx response into `UpstreamStatus`, keeping the body for the log.
pub async fn ensure_success(operation: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ActionError::UpstreamStatus {
        operation: operation.to_string(),
        status: status.as_u16(),
        body,
    })
}

pub async fn read_json<T: serde::de::DeserializeOwned>(operation: &str, response: Response) -> Result<T> {
    response
        .json::<T>()
        .await
        .map_err(|e| ActionError::upstream(operation, e))
}
