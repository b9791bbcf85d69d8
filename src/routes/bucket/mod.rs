mod handler;
mod model;

pub use handler::{decrement, get_bucket, health, increment, reset};
pub use model::{BucketSnapshot, CountResponse, ResetResponse, TokenInfo};
