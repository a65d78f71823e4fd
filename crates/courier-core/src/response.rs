//! Response value produced by one send attempt

use std::collections::BTreeMap;
use std::time::Duration;

/// The outcome of one send attempt
///
/// Success is decided by the status code alone: a failed response is an
/// ordinary value, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: u16,
    headers: BTreeMap<String, String>,
    retry_after: Option<Duration>,
    payload: Vec<u8>,
}

impl Response {
    /// Create a response with a status and payload
    pub fn new(status: u16, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            retry_after: None,
            payload: payload.into(),
        }
    }

    /// A response with an empty payload
    pub fn status_only(status: u16) -> Self {
        Self::new(status, Vec::new())
    }

    /// Add a header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Attach the server's hint for how long to wait before retrying
    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }

    /// HTTP-style status code
    pub fn status(&self) -> u16 {
        self.status
    }

    /// `true` for 2xx statuses
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Look up a header by name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// All headers, sorted by name
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Server hint for how long to wait before retrying
    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }

    /// Response body
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Take the response body
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_range() {
        assert!(Response::status_only(200).is_success());
        assert!(Response::status_only(204).is_success());
        assert!(Response::status_only(299).is_success());
        assert!(!Response::status_only(199).is_success());
        assert!(!Response::status_only(304).is_success());
        assert!(!Response::status_only(429).is_success());
        assert!(!Response::status_only(503).is_success());
    }

    #[test]
    fn test_retry_after_and_headers() {
        let response = Response::new(429, "slow down")
            .with_header("x-request-charge", "1.5")
            .with_retry_after(Duration::from_millis(250));

        assert_eq!(response.retry_after(), Some(Duration::from_millis(250)));
        assert_eq!(response.header("x-request-charge"), Some("1.5"));
        assert_eq!(response.payload(), b"slow down");
        assert_eq!(response.into_payload(), b"slow down".to_vec());
    }
}
