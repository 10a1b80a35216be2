pub mod model;
pub mod repositories;

pub use model::{AckPolicy, Command, Envelope, MigrationMethod, TableRef};
pub use repositories::{
    DownstreamClient, DownstreamRequest, DownstreamResponse, FetchOptions, HttpMethod,
    MessageQueue,
};
