//! Per-call deadlines for collaborator calls.

use std::{future::Future, time::Duration};

use crate::error::ApiError;

/// Code reported when a collaborator call outlives its deadline.
pub const DEADLINE_EXCEEDED: &str = "deadline-exceeded";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline(Duration);

impl Deadline {
    pub fn new(timeout: Duration) -> Self {
        Self(timeout)
    }

    /// Awaits `fut`, failing with a `deadline-exceeded` dependency error on expiry.
    pub async fn within<F: Future>(&self, fut: F) -> Result<F::Output, ApiError> {
        tokio::time::timeout(self.0, fut).await.map_err(|_| {
            ApiError::dependency(
                DEADLINE_EXCEEDED,
                format!("call did not complete within {} ms", self.0.as_millis()),
            )
        })
    }

    /// Awaits a fallible collaborator call, folding its error into an [`ApiError`].
    pub async fn run<T, E, F>(&self, fut: F) -> Result<T, ApiError>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<ApiError>,
    {
        self.within(fut).await?.map_err(Into::into)
    }
}

impl Default for Deadline {
    fn default() -> Self {
        Self(Duration::from_secs(10))
    }
}
