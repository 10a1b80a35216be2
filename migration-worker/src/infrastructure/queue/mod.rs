pub mod memory;
pub mod sqs;

pub use memory::InMemoryMessageQueue;
pub use sqs::SqsMessageQueue;
