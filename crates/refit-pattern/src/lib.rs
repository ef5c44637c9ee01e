//! # refit-pattern
//!
//! The template engine behind refit:
//! - Compiling template strings like `myorg/app:{v1.x}` into part chains
//! - Recognizing concrete image references in arbitrary text (trie matcher)
//! - Rendering a new reference from a resolved version/digest
//!
//! Everything in this crate is synchronous, CPU-only work; patterns are
//! compiled once at configuration-load time and immutable afterwards.
//!
//! # Example
//!
//! ```
//! use refit_pattern::{SearchTree, Template};
//! use std::sync::Arc;
//!
//! let template = Arc::new(Template::compile("myorg/app:{v1.x}", "app-bump").unwrap());
//!
//! let mut tree = SearchTree::new();
//! tree.insert(template.clone());
//!
//! let m = tree.search("image: myorg/app:1.2.0", 0).unwrap();
//! assert_eq!(m.image.versions[0].to_string(), "1.2.0");
//! assert_eq!(&"image: myorg/app:1.2.0"[m.start..m.end], "myorg/app:1.2.0");
//! ```

pub mod error;
pub mod image;
pub mod range;
pub mod search;
pub mod template;
mod token;

pub use error::PatternError;
pub use image::{BoundImage, ImageRef};
pub use range::FloatRange;
pub use search::{PatternMatch, SearchTree};
pub use template::{PatternPart, Template};
