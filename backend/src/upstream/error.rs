//! Error types for upstream service calls.
//!
//! Every failure keeps the service it came from and, when the upstream
//! answered at all, its HTTP status so the HTTP layer can relay it.

use std::fmt;

/// Result type for upstream operations
pub type UpstreamResult<T> = Result<T, UpstreamError>;

/// The external services the proxy talks to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Service {
    /// STAC item search
    Stac,
    /// Web Time Series Service (time series and coverage descriptions)
    Wtss,
    /// Free-text geocoder
    Geocoder,
}

impl Service {
    pub fn label(&self) -> &'static str {
        match self {
            Service::Stac => "BDC STAC",
            Service::Wtss => "BDC WTSS",
            Service::Geocoder => "geocoder",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error type for upstream operations
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// The service answered with a non-2xx status.
    #[error("{service} returned HTTP {status}: {body}")]
    Status {
        service: Service,
        status: u16,
        body: String,
    },

    /// The request never produced a response (connect error, timeout, ...).
    #[error("{service} request failed: {message}")]
    Transport {
        service: Service,
        message: String,
        timeout: bool,
    },

    /// The response body did not match the expected schema.
    #[error("{service} returned an unexpected payload: {reason}")]
    Decode { service: Service, reason: String },

    /// Client construction or URL configuration problem.
    #[error("upstream client configuration error: {0}")]
    Configuration(String),
}

/// Longest upstream body kept in an error.
const MAX_BODY_LEN: usize = 512;

impl UpstreamError {
    pub fn status(service: Service, status: u16, body: impl Into<String>) -> Self {
        let mut body: String = body.into();
        if body.len() > MAX_BODY_LEN {
            let mut cut = MAX_BODY_LEN;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
            body.push_str("...");
        }
        UpstreamError::Status {
            service,
            status,
            body,
        }
    }

    pub fn transport(service: Service, err: reqwest::Error) -> Self {
        UpstreamError::Transport {
            service,
            timeout: err.is_timeout(),
            message: err.to_string(),
        }
    }

    pub fn decode(service: Service, reason: impl fmt::Display) -> Self {
        UpstreamError::Decode {
            service,
            reason: reason.to_string(),
        }
    }

    /// The upstream HTTP status, when the service answered.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            UpstreamError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }

    pub fn service(&self) -> Option<Service> {
        match self {
            UpstreamError::Status { service, .. }
            | UpstreamError::Transport { service, .. }
            | UpstreamError::Decode { service, .. } => Some(*service),
            UpstreamError::Configuration(_) => None,
        }
    }
}
