//! # Modcache Core Library
//!
//! This crate contains the core logic of the `modcache` tool – a build-time
//! dependency cache manager for Node-style project trees.
//!
//! One invocation restores previously cached `node_modules` directories into
//! the build tree before the install step, prunes entries the manifest no
//! longer declares, runs `npm install`, and mirrors the final state back
//! into a persistent cache directory for the next build.
//!
//! The library is built for the `modcache` CLI, but the pieces can be reused
//! individually.
//!
//! ## Modules Overview
//! - [`scanner`] – Finding dependency directories in a tree
//! - [`store`] – The persistent cache store and the Link/Copy strategy
//! - [`restore`] – Native rebuilds and restoring cached directories
//! - [`syncback`] – Mirroring the post-install state back into the cache
//! - [`npm`] – Package manager and grunt collaborators
//! - [`envfile`] – Scoped env-file import for the install step
//! - [`manifest`] – `package.json` parsing and the version-pin advisory
//! - [`util`] – Shared utilities (copy, mirror, output indenting)

pub mod scanner;
pub mod store;
pub mod restore;
pub mod syncback;
pub mod npm;
pub mod envfile;
pub mod manifest;
pub mod util;

pub use scanner::*;
pub use store::*;
pub use restore::*;
pub use syncback::*;
pub use npm::*;
pub use envfile::*;
pub use manifest::*;
pub use util::*;
