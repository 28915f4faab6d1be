//! Map a failed attempt onto the kinds the retry policy decides on.

use super::error::AttemptError;
use super::policy::ErrorKind;

pub fn classify(e: &AttemptError) -> ErrorKind {
    match e {
        AttemptError::Curl(ce) if ce.is_operation_timedout() => ErrorKind::Timeout,
        AttemptError::Curl(ce) if lost_connection(ce) => ErrorKind::Connection,
        AttemptError::Curl(_) | AttemptError::InvalidUrl(_) => ErrorKind::Other,
        AttemptError::Http(429 | 503) => ErrorKind::Throttled,
        AttemptError::Http(code @ 500..=599) => ErrorKind::Http5xx(*code as u16),
        AttemptError::Http(_) => ErrorKind::Other,
        AttemptError::ChecksumMismatch { .. } => ErrorKind::Integrity,
        AttemptError::Storage(_) => ErrorKind::Storage,
    }
}

/// Could not reach the server, or it went away mid-body.
fn lost_connection(e: &curl::Error) -> bool {
    e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_send_error()
        || e.is_recv_error()
        || e.is_read_error()
        || e.is_got_nothing()
        || e.is_partial_file()
}
