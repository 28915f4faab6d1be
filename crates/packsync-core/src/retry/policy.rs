/// High-level classification of a failed attempt for retry purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Operation timed out (connect/read/low-speed).
    Timeout,
    /// Server asked us to slow down (429, 503).
    Throttled,
    /// Network-level failure (connection reset, DNS, short body).
    Connection,
    /// Retryable server error (5xx other than 503).
    Http5xx(u16),
    /// Body did not match the published digest.
    Integrity,
    /// Local write failure while streaming the body.
    Storage,
    /// Anything else (4xx, bad URL); never worth repeating on the same URL.
    Other,
}

impl ErrorKind {
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            ErrorKind::Timeout
                | ErrorKind::Throttled
                | ErrorKind::Connection
                | ErrorKind::Http5xx(_)
        )
    }
}

/// What the transfer unit does after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Repeat the request against the same URL.
    SameUrl,
    /// Give up on this URL and try the next candidate.
    NextCandidate,
    /// Abort the transfer; no other candidate can help.
    Abort,
}

/// Same-URL retry budget. Default is one attempt per URL: mirrors are the retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum attempts against one URL (including the first).
    pub attempts_per_url: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { attempts_per_url: 1 }
    }
}

impl RetryPolicy {
    pub fn new(attempts_per_url: u32) -> Self {
        Self {
            attempts_per_url: attempts_per_url.max(1),
        }
    }

    /// `attempt` is 1-based for the current URL.
    pub fn decide(&self, attempt: u32, kind: ErrorKind) -> RetryDecision {
        match kind {
            ErrorKind::Storage => RetryDecision::Abort,
            ErrorKind::Integrity | ErrorKind::Other => RetryDecision::NextCandidate,
            k if k.is_transient() && attempt < self.attempts_per_url => RetryDecision::SameUrl,
            _ => RetryDecision::NextCandidate,
        }
    }
}
