//! Upstream resolution and fetching.
//!
//! The [`Resolver`] turns a module coordinate into a [`FetchRequest`] by
//! running the configured transforms, and decides whether the open proxy may
//! be used instead. [`UpstreamClient`] implementations download raw archives;
//! [`ProxyClient`] talks to an open module proxy.

pub mod client;
pub mod error;
pub mod goget;
pub mod openproxy;
pub mod path;
pub mod request;
pub mod resolver;
pub mod transform;

pub use client::{HttpClient, TransportClients, UpstreamClient, build_http_client};
pub use error::{UpstreamError, UpstreamResult};
pub use openproxy::{OpenProxyClient, ProxyClient};
pub use request::FetchRequest;
pub use resolver::Resolver;
pub use transform::{Transform, TransformKind};
