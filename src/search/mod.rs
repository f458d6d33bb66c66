//! Search orchestration module
//!
//! Turns a free-text query into ranked, localized and enriched products,
//! and compares products side by side.

mod compare;
mod enhancer;
mod executor;
mod intent;
mod models;
mod ranking;

pub use compare::CompareProducts;
pub use enhancer::{Enhanced, Enhancer};
pub use executor::SearchOrchestrator;
pub use intent::{infer_category, IntentParser};
pub use models::*;
pub use ranking::{rank, score};
