pub mod config;
pub mod context;
pub mod error;
pub mod fetch;
pub mod log;
pub mod orchestration;
pub mod recommend;

pub use context::{Canceller, Context};
pub use error::{Error, Result};
pub use recommend::{Customer, Product, Recommender};
