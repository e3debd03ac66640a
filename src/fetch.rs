//! The fetch collaborator used inside tasks.
//!
//! Tasks only need "fetch this URL under this context and tell me the
//! status". `HttpFetcher` does that over HTTP; tests substitute their own
//! `Fetcher`.

use std::time::Duration;

use async_trait::async_trait;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::flog_debug;

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Issue a GET for `url` and return the response status code.
    ///
    /// Returns `Error::Transport` when the request itself fails, and the
    /// context's cause when `ctx` is done before the response arrives.
    async fn fetch(&self, ctx: &Context, url: &str) -> Result<u16>;
}

/// Accept 2xx statuses; anything else is `Error::BadStatus`.
pub fn check_status(url: &str, status: u16) -> Result<()> {
    if (200..300).contains(&status) {
        Ok(())
    } else {
        Err(Error::BadStatus {
            url: url.to_string(),
            status,
        })
    }
}

/// `Fetcher` backed by a reqwest client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| Error::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, ctx: &Context, url: &str) -> Result<u16> {
        flog_debug!("HttpFetcher: GET {}", url);
        tokio::select! {
            biased;
            _ = ctx.done() => Err(ctx.cause().unwrap_or(Error::Cancelled)),
            response = self.client.get(url).send() => {
                let response = response.map_err(|e| Error::Transport(e.to_string()))?;
                let status = response.status().as_u16();
                flog_debug!("HttpFetcher: {} -> {}", url, status);
                Ok(status)
            }
        }
    }
}
