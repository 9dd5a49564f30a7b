#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! [stubdns](crate) is a callback-driven DNS stub resolver client for
//! IPv6 networks, with DNS-SD browse/resolve support, NAT64 address
//! synthesis and an optional TCP fallback transport.
//!
//! The engine is sans-network: sockets, the clock and the timer are
//! provided by the embedder through the [`Platform`] trait, and all
//! results are delivered through per-query completion callbacks on the
//! embedder's event loop.

pub(crate) mod bytes;
pub mod constants;
pub mod errors;
pub(crate) mod message;
pub(crate) mod names;

mod client;
pub use client::*;

pub use message::{Flags, Header, RCode, RrClass, RrType};
pub use names::{LabelString, NameString};

#[doc(inline)]
pub use errors::{Error, Result};
