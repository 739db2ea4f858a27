//! HTTP status code utilities for error normalization and refresh decisions.

/// HTTP status code as reported by the backend.
///
/// `0` means no response was received at all (connectivity loss, timeout).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct HttpStatusCode(pub u16);

impl HttpStatusCode {
    /// Placeholder status for failures where no response arrived.
    pub const NO_RESPONSE: HttpStatusCode = HttpStatusCode(0);

    /// The status the backend uses for an expired or missing access token.
    pub const UNAUTHORIZED: HttpStatusCode = HttpStatusCode(401);

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.0)
    }

    /// 4xx client errors.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.0)
    }

    /// 5xx server errors.
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.0)
    }

    pub fn is_unauthorized(&self) -> bool {
        *self == Self::UNAUTHORIZED
    }

    /// True when no HTTP response was received.
    pub fn is_no_response(&self) -> bool {
        *self == Self::NO_RESPONSE
    }
}

impl From<u16> for HttpStatusCode {
    fn from(code: u16) -> Self {
        HttpStatusCode(code)
    }
}

impl std::fmt::Display for HttpStatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
