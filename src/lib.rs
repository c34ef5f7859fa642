//! Vetrina: the read-freshness pipeline of the Vetrina marketing site.
//!
//! Public read data reaches consumers through three cooperating layers: a
//! deploy-time snapshot exporter, a wire-level edge cache policy, and a
//! runtime query cache seeded from the snapshots and revalidated against the
//! Content API in the background.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod snapshot;
pub mod util;
