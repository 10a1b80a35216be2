pub mod consumer;

pub use consumer::{InvocationReport, MessageOutcome, MessageReport, MigrationQueueConsumer};
