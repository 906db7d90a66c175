//! Upstream Module
//!
//! Everything between the orchestrator and the network.
//!
//! # Components
//! - `RequestSpec`: a logical call, independent of base endpoint
//! - `HttpTransport`: the network seam (`ReqwestTransport` in production)
//! - `EndpointSelector`: adaptive multi-endpoint failover
//! - `RetryExecutor`: bounded retries with class-specific backoff

mod failover;
mod request;
mod retry;
mod transport;

#[cfg(test)]
pub(crate) mod mock;

pub use failover::{EndpointReport, EndpointSelector, EndpointStats, FailoverConfig, RECENCY_WINDOW};
pub use request::{HttpMethod, RequestBody, RequestSpec, UpstreamRequest};
pub use retry::{FailureClass, RetryExecutor};
pub use transport::{HttpTransport, ReqwestTransport, UpstreamResponse};
