//! Timeout enforcement.
//!
//! # Responsibilities
//! - Bound every backend call by a fixed deadline from request start
//! - Let an external cancellation token cut the wait short
//! - Keep timeout errors distinct from transport errors
//! - Carry the same deadline and token over to the response body
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Client disconnect drops the handler future, which drops the forward too
//! - Timed-out requests return 504 Gateway Timeout

use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use thiserror::Error;
use tokio::time::{Instant, Sleep};
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

/// Why a forward did not produce a backend response.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ForwardError {
    #[error("deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),

    #[error("forward cancelled")]
    Cancelled,

    #[error("{0}")]
    Transport(String),
}

/// Deadline plus cancellation for a single backend call.
#[derive(Debug, Clone)]
pub struct ForwardContext {
    started: Instant,
    timeout: Duration,
    cancel: CancellationToken,
}

impl ForwardContext {
    /// Deadline is `timeout` from now; `cancel` aborts early when triggered.
    pub fn new(timeout: Duration, cancel: CancellationToken) -> Self {
        Self {
            started: Instant::now(),
            timeout,
            cancel,
        }
    }

    pub fn deadline(&self) -> Instant {
        self.started + self.timeout
    }

    /// Pollable view of this context's deadline and token, for work that
    /// continues after [`run`](Self::run) returns (the response body).
    pub fn expiry(&self) -> Expiry {
        Expiry {
            timeout: self.timeout,
            sleep: Box::pin(tokio::time::sleep_until(self.deadline())),
            cancelled: Box::pin(self.cancel.clone().cancelled_owned()),
        }
    }

    /// Drive `call` until it finishes, the deadline passes, or the token fires.
    pub async fn run<F, T, E>(&self, call: F) -> Result<T, ForwardError>
    where
        F: Future<Output = Result<T, E>>,
        E: Display,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ForwardError::Cancelled),
            res = tokio::time::timeout_at(self.deadline(), call) => match res {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(e)) => Err(ForwardError::Transport(e.to_string())),
                Err(_) => Err(ForwardError::DeadlineExceeded(self.timeout)),
            },
        }
    }
}

/// Deadline and cancellation of a [`ForwardContext`], polled by hand.
pub struct Expiry {
    timeout: Duration,
    sleep: Pin<Box<Sleep>>,
    cancelled: Pin<Box<WaitForCancellationFutureOwned>>,
}

impl Expiry {
    /// Ready with the reason once the token fires or the deadline passes.
    /// Cancellation is checked first.
    pub fn poll_expired(&mut self, cx: &mut Context<'_>) -> Poll<ForwardError> {
        if self.cancelled.as_mut().poll(cx).is_ready() {
            return Poll::Ready(ForwardError::Cancelled);
        }
        if self.sleep.as_mut().poll(cx).is_ready() {
            return Poll::Ready(ForwardError::DeadlineExceeded(self.timeout));
        }
        Poll::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_deadline_exceeded() {
        let ctx = ForwardContext::new(Duration::from_secs(30), CancellationToken::new());
        let res = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok::<_, std::io::Error>(())
            })
            .await;
        assert_eq!(res, Err(ForwardError::DeadlineExceeded(Duration::from_secs(30))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_completes_before_deadline() {
        let ctx = ForwardContext::new(Duration::from_secs(30), CancellationToken::new());
        let res = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok::<_, std::io::Error>(42)
            })
            .await;
        assert_eq!(res, Ok(42));
    }

    #[tokio::test]
    async fn test_transport_error_is_not_timeout() {
        let ctx = ForwardContext::new(Duration::from_secs(30), CancellationToken::new());
        let res: Result<(), _> = ctx
            .run(async {
                Err(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "connection refused",
                ))
            })
            .await;
        assert_eq!(res, Err(ForwardError::Transport("connection refused".into())));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_cuts_wait_short() {
        let token = CancellationToken::new();
        let ctx = ForwardContext::new(Duration::from_secs(30), token.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            token.cancel();
        });

        let started = Instant::now();
        let res = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok::<_, std::io::Error>(())
            })
            .await;
        assert_eq!(res, Err(ForwardError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(30));
        canceller.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_shares_the_deadline() {
        let ctx = ForwardContext::new(Duration::from_secs(10), CancellationToken::new());
        tokio::time::sleep(Duration::from_secs(4)).await;

        let started = Instant::now();
        let mut expiry = ctx.expiry();
        let err = std::future::poll_fn(|cx| expiry.poll_expired(cx)).await;
        assert_eq!(err, ForwardError::DeadlineExceeded(Duration::from_secs(10)));
        assert!(started.elapsed() >= Duration::from_secs(6));
        assert!(started.elapsed() < Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_observes_cancellation() {
        let token = CancellationToken::new();
        let ctx = ForwardContext::new(Duration::from_secs(30), token.clone());
        let mut expiry = ctx.expiry();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            token.cancel();
        });

        let started = Instant::now();
        let err = std::future::poll_fn(|cx| expiry.poll_expired(cx)).await;
        assert_eq!(err, ForwardError::Cancelled);
        assert!(started.elapsed() < Duration::from_secs(30));
    }
}
