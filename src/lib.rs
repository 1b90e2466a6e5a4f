//! # xsd-lookup
//!
//! An XSD-driven lookup and validation engine for one schema family: given a
//! directory of `.xsd` files, answers "what element declaration governs
//! `name` under this ancestor chain", "what attributes (with restriction
//! metadata) does it carry", "is this attribute value legal", and "what
//! child elements can come next" — all under the schema family's single
//! `xs:` namespace convention, with no general namespace resolution.
//!
//! ## Example
//!
//! ```rust,ignore
//! use xsd_lookup::Engine;
//!
//! let engine = Engine::new("schemas/");
//! engine.get_schema("aiscripts");
//!
//! let hierarchy = vec!["attention".to_string(), "aiscript".to_string()];
//! let attrs = engine.get_element_attributes_with_types("aiscripts", "param", &hierarchy);
//! let outcome = engine.validate_attribute_value("aiscripts", "param", "value", "trade", &hierarchy);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod attributes;
pub mod cache;
pub mod content_model;
pub mod documents;
pub mod engine;
pub mod error;
pub mod index;
pub mod limits;
pub mod loaders;
pub mod locations;
pub mod names;
pub mod node;
pub mod resolver;
pub mod types;
pub mod validation;

pub use engine::{Engine, RestrictionKind};
pub use error::{Error, Result};

/// Version of the xsd-lookup library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The only XML Schema namespace this schema family uses.
pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";
