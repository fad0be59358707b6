//! API request handlers.

mod buckets;
mod datasets;
mod files;
mod health;

pub use buckets::*;
pub use datasets::*;
pub use files::*;
pub use health::*;
