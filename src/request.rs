//! Per-call request options.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::Auth;
use crate::error::Result;

/// HTTP request method. Only the verbs the service exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMethod {
    Get,
    Put,
    Delete,
    Post,
}

impl RequestMethod {
    /// Method name as sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestMethod::Get => "GET",
            RequestMethod::Put => "PUT",
            RequestMethod::Delete => "DELETE",
            RequestMethod::Post => "POST",
        }
    }

    /// Convert to reqwest::Method.
    #[cfg(feature = "nonblocking")]
    pub(crate) fn to_reqwest(self) -> reqwest::Method {
        match self {
            RequestMethod::Get => reqwest::Method::GET,
            RequestMethod::Put => reqwest::Method::PUT,
            RequestMethod::Delete => reqwest::Method::DELETE,
            RequestMethod::Post => reqwest::Method::POST,
        }
    }
}

/// Options for a single request.
///
/// The same options value works with every verb method. Instance-level
/// auth and default headers are merged in by the service before dispatch;
/// anything set here wins.
#[derive(Debug, Default)]
pub struct RequestOptions {
    /// Per-call credential, overriding the instance-level one.
    pub(crate) auth: Option<Auth>,
    /// Per-call headers. Take precedence over instance defaults.
    pub(crate) headers: BTreeMap<String, String>,
    /// Query parameters appended to the resolved URL.
    pub(crate) query: Vec<(String, String)>,
    /// Form-encoded body.
    pub(crate) data: Option<BTreeMap<String, String>>,
    /// Structured payload, JSON-encoded at dispatch. Takes precedence
    /// over `data` when both are set.
    pub(crate) json: Option<serde_json::Value>,
}

impl RequestOptions {
    /// Create empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the credential for this call only.
    pub fn auth(mut self, auth: Auth) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Add a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Add a query parameter.
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Set a form-encoded body.
    pub fn form(mut self, data: BTreeMap<String, String>) -> Self {
        self.data = Some(data);
        self
    }

    /// Set a structured payload to be JSON-encoded.
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        self.json = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Set a raw JSON payload.
    pub fn json_value(mut self, body: serde_json::Value) -> Self {
        self.json = Some(body);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_as_str() {
        assert_eq!(RequestMethod::Get.as_str(), "GET");
        assert_eq!(RequestMethod::Put.as_str(), "PUT");
        assert_eq!(RequestMethod::Delete.as_str(), "DELETE");
        assert_eq!(RequestMethod::Post.as_str(), "POST");
    }

    #[test]
    fn test_options_builder() {
        let options = RequestOptions::new()
            .auth(Auth::bearer("t0ken"))
            .header("X-Request-Id", "42")
            .query("page", "2");

        assert_eq!(options.auth, Some(Auth::bearer("t0ken")));
        assert_eq!(
            options.headers.get("X-Request-Id"),
            Some(&"42".to_string())
        );
        assert_eq!(options.query, vec![("page".to_string(), "2".to_string())]);
    }

    #[test]
    fn test_json_body() {
        let options = RequestOptions::new()
            .json(&serde_json::json!({"a": 1}))
            .unwrap();

        assert_eq!(options.json, Some(serde_json::json!({"a": 1})));
        assert!(options.data.is_none());
    }

    #[test]
    fn test_form_body() {
        let mut form = BTreeMap::new();
        form.insert("a".to_string(), "1".to_string());
        let options = RequestOptions::new().form(form);

        assert!(options.json.is_none());
        assert_eq!(
            options.data.as_ref().and_then(|d| d.get("a")),
            Some(&"1".to_string())
        );
    }
}
