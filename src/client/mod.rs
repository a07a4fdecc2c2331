pub mod http;
pub mod identity;
pub mod retry;
pub mod traits;

pub use http::HttpFetcher;
pub use retry::RetryPolicy;
pub use traits::*;
