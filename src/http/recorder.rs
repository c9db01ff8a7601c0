//! Status capture for outbound responses.
//!
//! The recorder sees every response the handler returns and remembers the
//! status it carries, without touching the response itself.

use axum::http::{Response, StatusCode};

/// Remembers the status code written to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusRecorder {
    status: StatusCode,
    written: bool,
}

impl Default for StatusRecorder {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            written: false,
        }
    }
}

impl StatusRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `status` unless one was already written. Returns whether it was taken.
    pub fn write_header(&mut self, status: StatusCode) -> bool {
        if self.written {
            return false;
        }
        self.status = status;
        self.written = true;
        true
    }

    /// Record `status` even if another code was written first.
    /// Used by error paths that take over after a normal completion was assumed.
    pub fn override_status(&mut self, status: StatusCode) {
        self.status = status;
        self.written = true;
    }

    /// Observe a response on its way to the client and hand it back unchanged.
    pub fn record<B>(&mut self, response: Response<B>) -> Response<B> {
        self.write_header(response.status());
        response
    }

    /// Like [`record`](Self::record) but the response's status always wins.
    pub fn record_override<B>(&mut self, response: Response<B>) -> Response<B> {
        self.override_status(response.status());
        response
    }

    /// The captured status (200 if nothing was written).
    pub fn status(&self) -> StatusCode {
        self.status
    }
}
