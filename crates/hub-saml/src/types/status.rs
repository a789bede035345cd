//! SAML Status types.
//!
//! Status information returned in SAML protocol responses.

use serde::{Deserialize, Serialize};

use super::status_codes;

/// SAML protocol status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    /// The status code.
    pub status_code: StatusCode,

    /// Optional status message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,

    /// Optional status detail, e.g. `authn-cancel`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_detail: Option<String>,
}

impl Status {
    /// Creates a success status.
    #[must_use]
    pub fn success() -> Self {
        Self::from_code(StatusCode::success())
    }

    /// Creates a status around an existing code.
    #[must_use]
    pub fn from_code(status_code: StatusCode) -> Self {
        Self {
            status_code,
            status_message: None,
            status_detail: None,
        }
    }

    /// Creates a requester error status.
    #[must_use]
    pub fn requester_error(message: impl Into<String>) -> Self {
        Self::from_code(StatusCode::requester()).with_message(message)
    }

    /// Creates a responder error status.
    #[must_use]
    pub fn responder_error(message: impl Into<String>) -> Self {
        Self::from_code(StatusCode::responder()).with_message(message)
    }

    /// Returns true if the top-level code is success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status_code.is_success()
    }

    /// Sets the status message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.status_message = Some(message.into());
        self
    }

    /// Sets the status detail.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.status_detail = Some(detail.into());
        self
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::success()
    }
}

/// SAML status code.
///
/// Status codes can be nested, with a top-level code and optional sub-code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCode {
    /// The status code URI value.
    pub value: String,

    /// Optional nested status code providing more detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<Box<StatusCode>>,
}

impl StatusCode {
    /// Creates a new status code with the given value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            status_code: None,
        }
    }

    /// Creates a success status code.
    #[must_use]
    pub fn success() -> Self {
        Self::new(status_codes::SUCCESS)
    }

    /// Creates a requester error status code.
    #[must_use]
    pub fn requester() -> Self {
        Self::new(status_codes::REQUESTER)
    }

    /// Creates a responder error status code.
    #[must_use]
    pub fn responder() -> Self {
        Self::new(status_codes::RESPONDER)
    }

    /// Adds a sub-status code.
    #[must_use]
    pub fn with_sub_status(mut self, sub: StatusCode) -> Self {
        self.status_code = Some(Box::new(sub));
        self
    }

    /// Adds a sub-status code by value.
    #[must_use]
    pub fn with_sub_value(self, value: impl Into<String>) -> Self {
        self.with_sub_status(Self::new(value))
    }

    /// Returns true if this is a success status code.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.value == status_codes::SUCCESS
    }

    /// Returns the sub-status code value if present.
    #[must_use]
    pub fn sub_status_value(&self) -> Option<&str> {
        self.status_code.as_ref().map(|s| s.value.as_str())
    }

    /// Number of nested sub-status levels below this code.
    #[must_use]
    pub fn nesting_depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self.status_code.as_deref();
        while let Some(code) = current {
            depth += 1;
            current = code.status_code.as_deref();
        }
        depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_success() {
        let status = Status::success();
        assert!(status.is_success());
        assert!(status.status_message.is_none());
    }

    #[test]
    fn status_error() {
        let status = Status::requester_error("Invalid request");
        assert!(!status.is_success());
        assert_eq!(status.status_message.as_deref(), Some("Invalid request"));
    }

    #[test]
    fn status_code_with_sub() {
        let code = StatusCode::requester().with_sub_value(status_codes::NO_AUTHN_CONTEXT);
        assert!(!code.is_success());
        assert_eq!(code.sub_status_value(), Some(status_codes::NO_AUTHN_CONTEXT));
        assert_eq!(code.nesting_depth(), 1);
    }

    #[test]
    fn nesting_depth_counts_every_level() {
        let code = StatusCode::success().with_sub_status(
            StatusCode::new(status_codes::MATCH).with_sub_value(status_codes::NO_MATCH),
        );
        assert_eq!(code.nesting_depth(), 2);
        assert_eq!(StatusCode::success().nesting_depth(), 0);
    }
}
