//! Mapping of verification failures onto HTTP responses.

use thiserror::Error;

use crate::subscription::SubscriptionError;
use crate::webhook::VerificationFailure;

/// A request the webhook route must refuse before touching the payload.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The delivery signature did not verify
    #[error("webhook signature rejected: {0}")]
    Signature(#[from] VerificationFailure),

    /// The subscription handshake did not verify
    #[error("subscription handshake rejected: {0}")]
    Subscription(#[from] SubscriptionError),
}

impl Rejection {
    /// HTTP status the route handler should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Signature(_) => 401,
            Self::Subscription(_) => 403,
        }
    }

    /// Short machine-readable reason.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Signature(failure) => failure.reason(),
            Self::Subscription(failure) => failure.reason(),
        }
    }
}
