//! HTTP client for the Cats mini-app backend.

use std::time::Duration;

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use super::models::{
    AvatarInfo, AvatarUpgrade, TaskId, TaskList, TaskOutcome, User, WithdrawalStatus,
};
use super::proxy::ProxySpec;
use super::tasks::TaskEndpoint;

pub const DEFAULT_API_URL: &str = "https://api.catshouse.club";
pub const CAT_IMAGE_URL: &str = "https://cataas.com/cat";
pub const IP_CHECK_URL: &str = "https://httpbin.org/ip";

const WEB_APP_ORIGIN: &str = "https://cats-frontend.tgapps.store";
const IMAGE_ACCEPT: &str = "image/avif,image/webp,image/apng,image/svg+xml,image/*,*/*;q=0.8";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{endpoint} returned status {status}")]
    Status { status: u16, endpoint: String },

    #[error("Failed to decode {endpoint}: {source}")]
    Decode {
        endpoint: String,
        source: serde_json::Error,
    },

    #[error("Invalid header value for {0}")]
    InvalidHeader(&'static str),

    #[error("Image source returned an empty body")]
    EmptyImage,
}

/// Everything needed to build an HTTP client for one connection.
///
/// Values are never mutated in place: a new token or user agent yields a new
/// config, and each loop iteration builds its client from the current one.
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub base_url: String,
    pub image_url: String,
    pub ip_check_url: String,
    pub user_agent: Option<String>,
    pub proxy: Option<ProxySpec>,
    /// Web-app auth payload sent as `Authorization: tma <payload>`.
    pub authorization: Option<String>,
    pub timeout: Duration,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_owned(),
            image_url: CAT_IMAGE_URL.to_owned(),
            ip_check_url: IP_CHECK_URL.to_owned(),
            user_agent: None,
            proxy: None,
            authorization: None,
            timeout: Duration::from_secs(60),
        }
    }
}

impl RequestConfig {
    /// Config pointing every endpoint at `base_url` (used by tests).
    #[must_use]
    pub fn with_base_url(base_url: &str) -> Self {
        let base_url = base_url.trim_end_matches('/').to_owned();
        Self {
            image_url: format!("{base_url}/cat"),
            ip_check_url: format!("{base_url}/ip"),
            base_url,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn authorized(&self, payload: &str) -> Self {
        Self {
            authorization: Some(payload.to_owned()),
            ..self.clone()
        }
    }

    #[must_use]
    pub fn user_agent(self, user_agent: Option<String>) -> Self {
        Self { user_agent, ..self }
    }

    #[must_use]
    pub fn proxy(self, proxy: Option<ProxySpec>) -> Self {
        Self { proxy, ..self }
    }

    fn default_headers(&self) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.9"),
        );
        headers.insert(header::ORIGIN, HeaderValue::from_static(WEB_APP_ORIGIN));
        headers.insert(
            header::REFERER,
            HeaderValue::from_static("https://cats-frontend.tgapps.store/"),
        );
        headers.insert("sec-fetch-dest", HeaderValue::from_static("empty"));
        headers.insert("sec-fetch-mode", HeaderValue::from_static("cors"));
        headers.insert("sec-fetch-site", HeaderValue::from_static("cross-site"));
        if let Some(ua) = &self.user_agent {
            headers.insert(
                header::USER_AGENT,
                HeaderValue::from_str(ua).map_err(|_| ApiError::InvalidHeader("User-Agent"))?,
            );
        }
        Ok(headers)
    }

    /// Builds a fresh client for one loop iteration.
    pub fn build_client(&self) -> Result<CatsApi, ApiError> {
        let mut builder = reqwest::Client::builder()
            .default_headers(self.default_headers()?)
            .connect_timeout(Duration::from_secs(20))
            .timeout(self.timeout);

        if let Some(proxy) = &self.proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy.to_url())?);
        }

        let authorization = self
            .authorization
            .as_deref()
            .map(|payload| {
                HeaderValue::from_str(&format!("tma {payload}"))
                    .map_err(|_| ApiError::InvalidHeader("Authorization"))
            })
            .transpose()?;

        Ok(CatsApi {
            http: builder.build()?,
            config: self.clone(),
            authorization,
        })
    }
}

/// Client bound to one [`RequestConfig`].
#[derive(Debug, Clone)]
pub struct CatsApi {
    http: reqwest::Client,
    config: RequestConfig,
    authorization: Option<HeaderValue>,
}

impl CatsApi {
    fn api(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self
            .http
            .request(method, format!("{}{}", self.config.base_url, path));
        match &self.authorization {
            Some(auth) => request.header(header::AUTHORIZATION, auth.clone()),
            None => request,
        }
    }

    async fn send(request: RequestBuilder, endpoint: &str) -> Result<reqwest::Response, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        debug!("{} -> {}", endpoint, status);
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                endpoint: endpoint.to_owned(),
            });
        }
        Ok(response)
    }

    async fn json<T: DeserializeOwned>(request: RequestBuilder, endpoint: &str) -> Result<T, ApiError> {
        let bytes = Self::send(request, endpoint).await?.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|source| ApiError::Decode {
            endpoint: endpoint.to_owned(),
            source,
        })
    }

    /// `GET /user`. A missing, empty or `null` record means "not registered".
    pub async fn get_user(&self) -> Result<Option<User>, ApiError> {
        const ENDPOINT: &str = "/user";
        let response = self.api(Method::GET, ENDPOINT).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(ApiError::Status {
                status: response.status().as_u16(),
                endpoint: ENDPOINT.to_owned(),
            });
        }

        let bytes = response.bytes().await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        let decode = |source| ApiError::Decode {
            endpoint: ENDPOINT.to_owned(),
            source,
        };
        let value: serde_json::Value = serde_json::from_slice(&bytes).map_err(decode)?;
        match &value {
            serde_json::Value::Null => Ok(None),
            serde_json::Value::Object(map) if map.is_empty() => Ok(None),
            _ => serde_json::from_value(value).map(Some).map_err(decode),
        }
    }

    /// `POST /user/create?referral_code=<code>`.
    pub async fn create_user(&self, referral_code: &str) -> Result<(), ApiError> {
        let request = self
            .api(Method::POST, "/user/create")
            .query(&[("referral_code", referral_code)]);
        Self::send(request, "/user/create").await?;
        Ok(())
    }

    /// `GET /tasks/user?group=cats`.
    pub async fn get_tasks(&self) -> Result<TaskList, ApiError> {
        let request = self
            .api(Method::GET, "/tasks/user")
            .query(&[("group", "cats")]);
        Self::json(request, "/tasks/user").await
    }

    /// `POST /tasks/{id}/{check|complete}[?answer=...]`.
    pub async fn complete_task(
        &self,
        id: &TaskId,
        endpoint: TaskEndpoint,
        answer: Option<&str>,
    ) -> Result<TaskOutcome, ApiError> {
        let path = format!("/tasks/{id}/{endpoint}");
        let mut request = self.api(Method::POST, &path).json(&serde_json::json!({}));
        if let Some(answer) = answer {
            request = request.query(&[("answer", answer)]);
        }
        Self::json(request, &path).await
    }

    /// `GET /user/avatar`.
    pub async fn get_avatar(&self) -> Result<AvatarInfo, ApiError> {
        Self::json(self.api(Method::GET, "/user/avatar"), "/user/avatar").await
    }

    /// `POST /user/avatar/upgrade` with the image in the `photo` field.
    pub async fn upgrade_avatar(&self, image: Vec<u8>) -> Result<AvatarUpgrade, ApiError> {
        let part = reqwest::multipart::Part::bytes(image)
            .file_name(format!("{}.jpg", uuid::Uuid::new_v4().simple()))
            .mime_str("image/jpeg")?;
        let form = reqwest::multipart::Form::new().part("photo", part);
        let request = self.api(Method::POST, "/user/avatar/upgrade").multipart(form);
        Self::json(request, "/user/avatar/upgrade").await
    }

    /// `GET /exchange-claim/check-available`.
    pub async fn check_withdrawal(&self) -> Result<WithdrawalStatus, ApiError> {
        const ENDPOINT: &str = "/exchange-claim/check-available";
        Self::json(self.api(Method::GET, ENDPOINT), ENDPOINT).await
    }

    /// Downloads a random cat picture.
    pub async fn fetch_cat_image(&self) -> Result<Vec<u8>, ApiError> {
        let timestamp = chrono::Utc::now().timestamp_millis().to_string();
        let request = self
            .http
            .get(&self.config.image_url)
            .query(&[("timestamp", timestamp.as_str())])
            .header(header::ACCEPT, IMAGE_ACCEPT)
            .header("sec-fetch-dest", "image")
            .header("sec-fetch-mode", "no-cors");
        let bytes = Self::send(request, "cat image").await?.bytes().await?;
        if bytes.is_empty() {
            return Err(ApiError::EmptyImage);
        }
        Ok(bytes.to_vec())
    }

    /// Returns the public IP the backend sees, as reported by the IP echo service.
    pub async fn check_proxy_ip(&self) -> Result<String, ApiError> {
        let request = self
            .http
            .get(&self.config.ip_check_url)
            .timeout(Duration::from_secs(5));
        let body: serde_json::Value = Self::json(request, "ip check").await?;
        Ok(body
            .get("origin")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("Site is not available")
            .to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorized_returns_new_config() {
        let base = RequestConfig::default();
        let authed = base.authorized("user=abc");
        assert!(base.authorization.is_none());
        assert_eq!(authed.authorization.as_deref(), Some("user=abc"));
        assert_eq!(authed.base_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_with_base_url_routes_everything_locally() {
        let config = RequestConfig::with_base_url("http://127.0.0.1:9000/");
        assert_eq!(config.base_url, "http://127.0.0.1:9000");
        assert_eq!(config.image_url, "http://127.0.0.1:9000/cat");
        assert_eq!(config.ip_check_url, "http://127.0.0.1:9000/ip");
    }

    #[test]
    fn test_invalid_user_agent_is_rejected() {
        let config = RequestConfig::default().user_agent(Some("bad\nagent".to_owned()));
        assert!(matches!(
            config.build_client(),
            Err(ApiError::InvalidHeader("User-Agent"))
        ));
    }
}
