//! 应用层：命令构造与分发

pub mod builders;
pub mod dispatcher;

pub use builders::{HandlerOutcome, MethodBuilder, PreparedRequest, RequestBuilder, Subject};
pub use dispatcher::{CommandDispatcher, DispatchOutcome};
