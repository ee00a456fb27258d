//! Per-run cancellation scope.

use super::CancellationToken;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

/// Why a run stopped before finishing a suspension point.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Interruption {
    /// The caller cancelled the run.
    #[error("run cancelled: {0}")]
    Cancelled(String),

    /// The run deadline passed.
    #[error("run deadline exceeded")]
    DeadlineExceeded,
}

/// Cancellation token and optional deadline for one run.
///
/// Every outbound stage call and every backoff sleep goes through
/// [`RunContext::guard`], so a hung stage service cannot hold a run past
/// its deadline.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    token: Arc<CancellationToken>,
    deadline: Option<Instant>,
}

impl RunContext {
    /// Creates a context with a fresh token and no deadline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context bound to a caller-owned token.
    #[must_use]
    pub const fn with_token(token: Arc<CancellationToken>) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Sets an absolute deadline.
    #[must_use]
    pub const fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Sets a deadline relative to now.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Returns the cancellation token.
    #[must_use]
    pub const fn token(&self) -> &Arc<CancellationToken> {
        &self.token
    }

    /// Returns the deadline, if any.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns the reason the run must stop now, if any.
    #[must_use]
    pub fn interruption(&self) -> Option<Interruption> {
        if self.token.is_cancelled() {
            return Some(Interruption::Cancelled(self.token.reason().unwrap_or_default()));
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(Interruption::DeadlineExceeded),
            _ => None,
        }
    }

    /// Drives `future` until it completes, the token is cancelled or the
    /// deadline passes, whichever comes first.
    ///
    /// # Errors
    ///
    /// Returns the [`Interruption`] if the future was abandoned.
    pub async fn guard<F: Future>(&self, future: F) -> Result<F::Output, Interruption> {
        if let Some(interruption) = self.interruption() {
            return Err(interruption);
        }

        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            () = self.token.cancelled() => {
                Err(Interruption::Cancelled(self.token.reason().unwrap_or_default()))
            }
            () = deadline => Err(Interruption::DeadlineExceeded),
            output = future => Ok(output),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_guard_passes_output_through() {
        let ctx = RunContext::new();
        let output = ctx.guard(async { 7 }).await;
        assert_eq!(output, Ok(7));
    }

    #[tokio::test]
    async fn test_guard_rejects_when_already_cancelled() {
        let ctx = RunContext::new();
        ctx.token().cancel("caller gave up");

        let output = ctx.guard(async { 7 }).await;
        assert_eq!(output, Err(Interruption::Cancelled("caller gave up".to_string())));
    }

    #[tokio::test]
    async fn test_guard_stops_hung_future_at_deadline() {
        let ctx = RunContext::new().with_timeout(Duration::from_millis(20));
        let output = ctx.guard(std::future::pending::<()>()).await;
        assert_eq!(output, Err(Interruption::DeadlineExceeded));
        assert_eq!(ctx.interruption(), Some(Interruption::DeadlineExceeded));
    }

    #[tokio::test]
    async fn test_guard_stops_on_cancel_from_other_task() {
        let token = Arc::new(CancellationToken::new());
        let ctx = RunContext::with_token(token.clone());

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            token.cancel("shutdown");
        });

        let output = ctx.guard(std::future::pending::<()>()).await;
        assert_eq!(output, Err(Interruption::Cancelled("shutdown".to_string())));
    }

    #[test]
    fn test_interruption_display() {
        assert_eq!(
            Interruption::Cancelled("user".to_string()).to_string(),
            "run cancelled: user"
        );
        assert_eq!(Interruption::DeadlineExceeded.to_string(), "run deadline exceeded");
    }
}
