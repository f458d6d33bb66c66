//! Domain models shared by the pipeline, the gateways and the web layer

mod intent;
mod product;

pub use intent::{Intent, SearchFilters};
pub use product::{Comparison, Price, Product, ProductComparison, Synthesis};
