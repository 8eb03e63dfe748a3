use reqwest::{
    header::{
        HeaderMap,
        HeaderValue,
        CONTENT_TYPE,
    },
    Client,
    Response,
};

use crate::core::YomicardError;

const USER_AGENT: &str = concat!("yomicard/", env!("CARGO_PKG_VERSION"), " (+reqwest)");

/// Shared client for both backends. No timeout: a model call takes as long as it takes.
pub fn http_client() -> Result<Client, YomicardError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    Client::builder()
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .build()
        .map_err(|e| YomicardError::Custom(format!("HTTP client build failed: {e}")))
}

/// Turns a non-2xx response into `YomicardError::Backend`, keeping the body for the report.
pub async fn ensure_success(resp: Response) -> Result<Response, YomicardError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    Err(YomicardError::Backend { status: status.as_u16(), body })
}
