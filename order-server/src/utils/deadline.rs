//! Per-request cancellation
//!
//! Each request runs under a child of the server shutdown token. The child
//! is cancelled when the request timeout elapses, when the server shuts
//! down, or when the request finishes and drops its [`RequestDeadline`].

use std::time::Duration;

use tokio_util::sync::{CancellationToken, DropGuard};

/// Cancellation scope of a single request
#[derive(Debug)]
pub struct RequestDeadline {
    token: CancellationToken,
    // 请求结束时取消 token，同时结束计时任务
    _guard: DropGuard,
}

impl RequestDeadline {
    /// Derive a deadline from `parent` that fires after `timeout`
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(parent: &CancellationToken, timeout: Duration) -> Self {
        let token = parent.child_token();
        let timer = token.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = timer.cancelled() => {}
                _ = tokio::time::sleep(timeout) => {
                    tracing::warn!(
                        timeout_ms = timeout.as_millis() as u64,
                        "Request deadline elapsed"
                    );
                    timer.cancel();
                }
            }
        });

        Self {
            _guard: token.clone().drop_guard(),
            token,
        }
    }

    /// Token to hand to repository calls
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_expired(&self) -> bool {
        self.token.is_cancelled()
    }
}
