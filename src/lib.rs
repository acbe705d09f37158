//! Key-partitioned fan-out/merge operator ("multi group-by").
//!
//! Elements pulled from a source are classified into zero or more keys, routed
//! to a bounded set of per-key substreams that run concurrently, transformed
//! window by window, and merged back into one result.
//!
//! Import everything you need with: `use multigroup::prelude::*;`

pub mod config;
pub mod domain;
pub mod engine;
pub mod io;
pub mod prelude;
pub mod registry;
pub mod streaming;
