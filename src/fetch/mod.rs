//! Resilient multi-endpoint fetching.

mod client;
mod options;
mod outcome;
mod transport;

pub use client::ResilientFetchClient;
pub use options::{FetchOptions, OnTotalFailure};
pub use outcome::{FetchOutcome, Freshness, ProbeReport, Source};
pub use transport::{ReqwestTransport, Transport, TransportResponse};
