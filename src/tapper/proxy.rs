//! Proxy string parsing.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use url::Url;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProxyError {
    #[error("Unsupported proxy scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Invalid proxy string: {0}")]
    Invalid(String),
}

/// Outbound proxy for API traffic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxySpec {
    pub scheme: String,
    pub host: String,
    pub port: u16,
    pub login: Option<String>,
    pub password: Option<String>,
}

const SCHEMES: [&str; 5] = ["http", "https", "socks4", "socks5", "socks5h"];

impl ProxySpec {
    /// Renders the proxy as a URL accepted by `reqwest::Proxy::all`.
    #[must_use]
    pub fn to_url(&self) -> String {
        match (&self.login, &self.password) {
            (Some(login), Some(password)) => format!(
                "{}://{}:{}@{}:{}",
                self.scheme,
                urlencoding::encode(login),
                urlencoding::encode(password),
                self.host,
                self.port
            ),
            (Some(login), None) => format!(
                "{}://{}@{}:{}",
                self.scheme,
                urlencoding::encode(login),
                self.host,
                self.port
            ),
            _ => format!("{}://{}:{}", self.scheme, self.host, self.port),
        }
    }

    fn from_url(text: &str) -> Result<Self, ProxyError> {
        let url = Url::parse(text).map_err(|_| ProxyError::Invalid(text.to_owned()))?;
        let scheme = url.scheme().to_ascii_lowercase();
        if !SCHEMES.contains(&scheme.as_str()) {
            return Err(ProxyError::UnsupportedScheme(scheme));
        }
        let host = url
            .host_str()
            .ok_or_else(|| ProxyError::Invalid(text.to_owned()))?
            .to_owned();
        let port = url
            .port_or_known_default()
            .ok_or_else(|| ProxyError::Invalid(text.to_owned()))?;
        let decode = |s: &str| {
            urlencoding::decode(s)
                .map(std::borrow::Cow::into_owned)
                .unwrap_or_else(|_| s.to_owned())
        };
        let login = Some(url.username()).filter(|s| !s.is_empty()).map(decode);
        let password = url.password().map(decode);

        Ok(Self {
            scheme,
            host,
            port,
            login,
            password,
        })
    }
}

impl FromStr for ProxySpec {
    type Err = ProxyError;

    /// Accepts `scheme://[login:password@]host:port`, `login:password@host:port`
    /// and `host:port[:login:password]`.
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let text = text.trim();
        if text.contains("://") {
            return Self::from_url(text);
        }
        if text.contains('@') {
            return Self::from_url(&format!("http://{text}"));
        }

        let parts: Vec<&str> = text.split(':').collect();
        let (host, port, login, password) = match parts.as_slice() {
            [host, port] => (*host, *port, None, None),
            [host, port, login, password] => {
                (*host, *port, Some(*login), Some(*password))
            }
            _ => return Err(ProxyError::Invalid(text.to_owned())),
        };
        if host.is_empty() {
            return Err(ProxyError::Invalid(text.to_owned()));
        }
        let port = port
            .parse()
            .map_err(|_| ProxyError::Invalid(text.to_owned()))?;

        Ok(Self {
            scheme: "http".to_owned(),
            host: host.to_owned(),
            port,
            login: login.map(str::to_owned),
            password: password.map(str::to_owned),
        })
    }
}

impl fmt::Display for ProxySpec {
    /// Credentials are left out so the proxy can be logged.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.scheme, self.host, self.port)
    }
}
