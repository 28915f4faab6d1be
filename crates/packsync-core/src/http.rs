//! Small curl helpers for metadata: GET into memory, JSON decode, HEAD check.
//!
//! File bodies never go through here; those stream via the transfer unit.
//! Runs in the current thread; call from `spawn_blocking` if used from async code.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::transfer::TransferOptions;

/// Upper bound on a metadata response kept in memory.
const MAX_BODY: usize = 32 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct HttpClient {
    user_agent: String,
    connect_timeout: Duration,
    timeout: Duration,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::from_options(&TransferOptions::default())
    }
}

impl HttpClient {
    pub fn from_options(opts: &TransferOptions) -> Self {
        Self {
            user_agent: opts.user_agent.clone(),
            connect_timeout: opts.connect_timeout,
            timeout: Duration::from_secs(60),
        }
    }

    fn easy(&self, url: &str) -> Result<curl::easy::Easy> {
        let mut easy = curl::easy::Easy::new();
        easy.url(url).with_context(|| format!("invalid URL: {}", url))?;
        easy.follow_location(true)?;
        easy.useragent(&self.user_agent)?;
        easy.connect_timeout(self.connect_timeout)?;
        easy.timeout(self.timeout)?;
        Ok(easy)
    }

    /// GET `url` and return the body. Non-2xx is an error.
    pub fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let mut body: Vec<u8> = Vec::new();
        let mut easy = self.easy(url)?;
        {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| {
                if body.len() + data.len() > MAX_BODY {
                    return Ok(0);
                }
                body.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.perform().with_context(|| format!("GET {} failed", url))?;
        }
        let code = easy.response_code().context("no response code")?;
        if !(200..300).contains(&code) {
            anyhow::bail!("GET {} returned HTTP {}", url, code);
        }
        tracing::debug!(url, bytes = body.len(), "fetched");
        Ok(body)
    }

    pub fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let body = self.get_bytes(url)?;
        serde_json::from_slice(&body).with_context(|| format!("decode JSON from {}", url))
    }

    /// HEAD `url`; true only for a 2xx answer. Network errors count as "absent".
    pub fn exists(&self, url: &str) -> bool {
        match self.head(url) {
            Ok(code) => (200..300).contains(&code),
            Err(e) => {
                tracing::debug!(url, "HEAD failed: {:#}", e);
                false
            }
        }
    }

    fn head(&self, url: &str) -> Result<u32> {
        let mut easy = self.easy(url)?;
        easy.nobody(true)?;
        easy.perform().with_context(|| format!("HEAD {} failed", url))?;
        Ok(easy.response_code()?)
    }
}
