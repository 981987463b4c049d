use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidRequest,
    UpstreamUnavailable,
    PlaceNotFound,
    NoPlacesFound,
    InsufficientPlaces,
    RequestCancelled,
}

impl ErrorKind {
    pub fn as_code(self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::UpstreamUnavailable => "upstream_unavailable",
            Self::PlaceNotFound => "place_not_found",
            Self::NoPlacesFound => "no_places_found",
            Self::InsufficientPlaces => "insufficient_places",
            Self::RequestCancelled => "request_cancelled",
        }
    }
}

/// Failure of a routed query or of one collaborator call inside it.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RouterError {
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("{collaborator} unavailable: {message}")]
    UpstreamUnavailable {
        collaborator: String,
        message: String,
    },

    #[error("place not found: {place_id}")]
    PlaceNotFound { place_id: String },

    #[error("no places found for {city}")]
    NoPlacesFound { city: String },

    #[error("route needs at least {required} places, got {found}")]
    InsufficientPlaces { required: usize, found: usize },

    #[error("request cancelled: {reason}")]
    RequestCancelled { reason: String },
}

impl RouterError {
    pub fn invalid_request<S: Into<String>>(message: S) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn upstream<C: Into<String>, S: Into<String>>(collaborator: C, message: S) -> Self {
        Self::UpstreamUnavailable {
            collaborator: collaborator.into(),
            message: message.into(),
        }
    }

    pub fn place_not_found<S: Into<String>>(place_id: S) -> Self {
        Self::PlaceNotFound {
            place_id: place_id.into(),
        }
    }

    pub fn no_places_found<S: Into<String>>(city: S) -> Self {
        Self::NoPlacesFound { city: city.into() }
    }

    pub fn cancelled<S: Into<String>>(reason: S) -> Self {
        Self::RequestCancelled {
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRequest { .. } => ErrorKind::InvalidRequest,
            Self::UpstreamUnavailable { .. } => ErrorKind::UpstreamUnavailable,
            Self::PlaceNotFound { .. } => ErrorKind::PlaceNotFound,
            Self::NoPlacesFound { .. } => ErrorKind::NoPlacesFound,
            Self::InsufficientPlaces { .. } => ErrorKind::InsufficientPlaces,
            Self::RequestCancelled { .. } => ErrorKind::RequestCancelled,
        }
    }

    /// Only transient upstream failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::UpstreamUnavailable { .. })
    }

    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidRequest { .. } | Self::InsufficientPlaces { .. }
        )
    }

    /// Terminal for one sub-call, but a composite chain may continue past it.
    pub fn is_degradable(&self) -> bool {
        matches!(
            self,
            Self::PlaceNotFound { .. } | Self::NoPlacesFound { .. }
        )
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: String,
}
