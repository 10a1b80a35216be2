pub mod queue;
pub mod storage_api;

pub use queue::{InMemoryMessageQueue, SqsMessageQueue};
pub use storage_api::HttpDownstreamClient;
