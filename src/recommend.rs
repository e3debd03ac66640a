//! Customer/product recommendation: two fetches fanned out under one
//! deadline.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::fetch::{check_status, Fetcher};
use crate::orchestration::join2;
use crate::{flog, flog_debug, flog_warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: u64,
    pub name: String,
}

impl fmt::Display for Customer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Customer{{ID: {}, Name: {}}}", self.id, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: u64,
    pub name: String,
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Product{{ID: {}, Name: {}}}", self.id, self.name)
    }
}

/// Runs the customer and product fetches concurrently.
///
/// The customer task waits `customer_delay` before its request; the product
/// task requests immediately. Either failing cancels the other. Nothing is
/// returned unless both succeed before the deadline.
pub struct Recommender {
    fetcher: Arc<dyn Fetcher>,
    deadline: Duration,
    customer_delay: Duration,
    customer_url: String,
    product_url: String,
}

impl Recommender {
    pub fn new(fetcher: Arc<dyn Fetcher>, config: &Config) -> Self {
        Self {
            fetcher,
            deadline: config.deadline(),
            customer_delay: config.customer_delay(),
            customer_url: config.customer_url.clone(),
            product_url: config.product_url.clone(),
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_customer_delay(mut self, delay: Duration) -> Self {
        self.customer_delay = delay;
        self
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    pub async fn recommend(&self, customer_id: u64) -> Result<(Customer, Product)> {
        self.recommend_within(&Context::background(), customer_id)
            .await
    }

    /// Like `recommend`, but also stops when `parent` is done.
    pub async fn recommend_within(
        &self,
        parent: &Context,
        customer_id: u64,
    ) -> Result<(Customer, Product)> {
        let ctx = Context::with_timeout(parent, self.deadline());
        flog_debug!(
            "recommend: customer {} within {:?}",
            customer_id,
            self.deadline()
        );

        let customer = {
            let fetcher = Arc::clone(&self.fetcher);
            let url = self.customer_url.clone();
            let delay = self.customer_delay;
            move |ctx: Context| fetch_customer(ctx, fetcher, url, delay, customer_id)
        };
        let product = {
            let fetcher = Arc::clone(&self.fetcher);
            let url = self.product_url.clone();
            move |ctx: Context| fetch_product(ctx, fetcher, url, customer_id)
        };

        match join2(&ctx, customer, product).await {
            Ok((customer, product)) => {
                flog!("recommend: {} -> {}", customer, product);
                Ok((customer, product))
            }
            Err(err) => {
                flog_warn!("recommend: customer {} cancelled: {}", customer_id, err);
                Err(err)
            }
        }
    }
}

async fn fetch_customer(
    ctx: Context,
    fetcher: Arc<dyn Fetcher>,
    url: String,
    delay: Duration,
    customer_id: u64,
) -> Result<Customer> {
    tokio::time::sleep(delay).await;
    let status = fetcher
        .fetch(&ctx, &url)
        .await
        .map_err(|e| in_task("customer", e))?;
    check_status(&url, status)?;
    Ok(Customer {
        id: customer_id,
        name: format!("Customer{}", customer_id),
    })
}

async fn fetch_product(
    ctx: Context,
    fetcher: Arc<dyn Fetcher>,
    url: String,
    customer_id: u64,
) -> Result<Product> {
    let status = fetcher
        .fetch(&ctx, &url)
        .await
        .map_err(|e| in_task("product", e))?;
    check_status(&url, status)?;
    Ok(Product {
        id: customer_id,
        name: format!("Product{}", customer_id),
    })
}

/// Name the failing task in transport errors. Context causes pass through
/// untouched.
fn in_task(task: &str, err: Error) -> Error {
    match err {
        Error::Transport(msg) => Error::Transport(format!("in {} task: {}", task, msg)),
        other => other,
    }
}
