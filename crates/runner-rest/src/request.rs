use reqwest::{Method, Url};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RestError {
    #[error("empty request")]
    Empty,

    #[error("invalid HTTP method: {0}")]
    InvalidMethod(String),

    #[error("request has no URL")]
    MissingUrl,

    #[error("relative path '{0}' needs a base URL")]
    NoBaseUrl(String),

    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// A request parsed from command text of the form `<METHOD> <url-or-path> [body]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestRequest {
    pub method: Method,
    pub url: Url,
    pub body: Option<String>,
}

impl RestRequest {
    pub fn parse(command: &str, base_url: Option<&Url>) -> Result<Self, RestError> {
        let command = command.trim();
        if command.is_empty() {
            return Err(RestError::Empty);
        }

        let (method, rest) = split_word(command);
        let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
            .map_err(|_| RestError::InvalidMethod(method.to_string()))?;

        let (target, body) = split_word(rest);
        if target.is_empty() {
            return Err(RestError::MissingUrl);
        }

        let url = resolve(target, base_url)?;
        let body = Some(body.trim()).filter(|b| !b.is_empty()).map(str::to_string);

        Ok(Self { method, url, body })
    }

    /// Body parses as JSON and should be sent as such.
    pub fn is_json(&self) -> bool {
        self.body
            .as_deref()
            .map(|b| serde_json::from_str::<serde_json::Value>(b).is_ok())
            .unwrap_or(false)
    }
}

/// Parse a base URL from configuration.
pub fn parse_base_url(base: &str) -> Result<Url, RestError> {
    Url::parse(base).map_err(|e| RestError::InvalidUrl {
        url: base.to_string(),
        reason: e.to_string(),
    })
}

fn split_word(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(end) => (&s[..end], &s[end..]),
        None => (s, ""),
    }
}

fn resolve(target: &str, base_url: Option<&Url>) -> Result<Url, RestError> {
    if target.starts_with("http://") || target.starts_with("https://") {
        return parse_base_url(target);
    }

    let base = base_url.ok_or_else(|| RestError::NoBaseUrl(target.to_string()))?;
    let joined = format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        target.trim_start_matches('/')
    );
    parse_base_url(&joined)
}
