//! # refit-registry
//!
//! Registry access for refit:
//! - Querying OCI-compatible container registries (tag lists, digests)
//! - Bearer-token authentication with expiry-aware refresh
//! - The version cache answering "best available upgrade" queries
//!
//! # Example
//!
//! ```no_run
//! use refit_pattern::Template;
//! use refit_registry::{RegistryClient, VersionCache};
//! use refit_core::CancelToken;
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = RegistryClient::new("ghcr.io")?;
//! let cache = VersionCache::new();
//! let pattern = Arc::new(Template::compile("myorg/app:{v1.x}", "app-bump")?);
//!
//! let outcome = cache.update(&client, &[pattern], &CancelToken::new()).await?;
//! println!("refreshed {} pattern(s)", outcome.refreshed);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod client;

pub use cache::{UpdateOutcome, VersionCache};
pub use client::RegistryClient;
