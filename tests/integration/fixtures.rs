//! Test fixtures for integration tests.
//!
//! Provides:
//! - `ScriptedFetcher`, a `Fetcher` whose answers and latencies are fixed
//!   per URL
//! - Task builders that succeed or fail after a delay

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use fanout::config::Config;
use fanout::fetch::Fetcher;
use fanout::orchestration::Task;
use fanout::{Context, Error, Recommender, Result};

pub const CUSTOMER_URL: &str = "mock://customer";
pub const PRODUCT_URL: &str = "mock://product";

/// What a scripted URL answers with.
#[derive(Debug, Clone)]
pub enum Reply {
    Status(u16),
    Fail(String),
}

#[derive(Debug, Clone)]
struct Route {
    reply: Reply,
    latency: Duration,
}

/// A fetcher that answers from a script and records what was asked.
///
/// Like a real client it gives up as soon as the context is done.
#[derive(Default)]
pub struct ScriptedFetcher {
    routes: HashMap<String, Route>,
    calls: AtomicUsize,
    completed: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, url: &str, reply: Reply, latency: Duration) -> Self {
        self.routes.insert(url.to_string(), Route { reply, latency });
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// URLs whose reply was actually produced (not abandoned on cancel).
    pub fn completed(&self) -> Vec<String> {
        self.completed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, ctx: &Context, url: &str) -> Result<u16> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let route = self
            .routes
            .get(url)
            .cloned()
            .ok_or_else(|| Error::Transport(format!("no route to {}", url)))?;

        tokio::select! {
            _ = ctx.done() => Err(ctx.cause().unwrap_or(Error::Cancelled)),
            _ = tokio::time::sleep(route.latency) => {
                self.completed.lock().unwrap().push(url.to_string());
                match route.reply {
                    Reply::Status(status) => Ok(status),
                    Reply::Fail(msg) => Err(Error::Transport(msg)),
                }
            }
        }
    }
}

/// Both endpoints healthy and answering immediately.
pub fn healthy_fetcher() -> ScriptedFetcher {
    ScriptedFetcher::new()
        .route(CUSTOMER_URL, Reply::Status(200), Duration::ZERO)
        .route(PRODUCT_URL, Reply::Status(200), Duration::ZERO)
}

/// Recommender pointed at the mock URLs with the given deadline and
/// customer delay.
pub fn recommender(
    fetcher: Arc<ScriptedFetcher>,
    deadline: Duration,
    customer_delay: Duration,
) -> Recommender {
    let config = Config {
        customer_url: CUSTOMER_URL.to_string(),
        product_url: PRODUCT_URL.to_string(),
        ..Config::default()
    };
    Recommender::new(fetcher, &config)
        .with_deadline(deadline)
        .with_customer_delay(customer_delay)
}

/// Task that sleeps `delay` and then yields `value`.
pub fn succeed_after<T>(delay: Duration, value: T) -> impl Task<Output = T>
where
    T: Send + 'static,
{
    move |_ctx: Context| async move {
        tokio::time::sleep(delay).await;
        Ok::<_, Error>(value)
    }
}

/// Task that sleeps `delay` and then fails with a transport error.
pub fn fail_after<T>(delay: Duration, msg: &str) -> impl Task<Output = T>
where
    T: Send + 'static,
{
    let msg = msg.to_string();
    move |_ctx: Context| async move {
        tokio::time::sleep(delay).await;
        Err::<T, _>(Error::Transport(msg))
    }
}
