use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExternalError {
    #[error("{service} request failed: {source}")]
    Request {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{service} returned status {status}: {body}")]
    Status { service: &'static str, status: u16, body: String },
    #[error("{service} response could not be decoded: {message}")]
    Decode { service: &'static str, message: String },
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}

impl ExternalError {
    pub(crate) fn request(service: &'static str) -> impl FnOnce(reqwest::Error) -> Self {
        move |source| Self::Request { service, source }
    }

    pub(crate) fn decode(service: &'static str) -> impl FnOnce(reqwest::Error) -> Self {
        move |error| Self::Decode { service, message: error.to_string() }
    }
}

/// Turns a non-success response into `ExternalError::Status`, keeping a short body excerpt.
pub(crate) async fn ensure_success(
    service: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, ExternalError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ExternalError::Status {
        service,
        status: status.as_u16(),
        body: body.chars().take(200).collect(),
    })
}
