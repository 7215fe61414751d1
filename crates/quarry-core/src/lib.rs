//! # Quarry Core
//!
//! Entry-level types shared by Quarry catalog clients.
//!
//! This crate has no I/O beyond optional shell defaults and provides:
//!
//! - [`UserParameter`] - a parameter an entry accepts when opened
//! - [`coerce`] - conversion of loosely typed values to a [`ParameterType`]
//! - [`TemplateOptions`] - expansion of `client_env(..)` / `client_shell(..)` defaults
//! - [`PersistMode`] - persistence preference carried to resolved sources
//!
//! ## Example
//!
//! ```rust
//! use quarry_core::{ParameterType, TemplateOptions, UserParameter};
//! use serde_json::json;
//!
//! let param = UserParameter::new("limit", ParameterType::Int).with_default("100");
//! let value = param.resolve_default(&TemplateOptions::default()).unwrap();
//! assert_eq!(value, json!(100));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod parameter;
pub mod persist;
pub mod template;


pub use error::{CoreError, Result};
pub use parameter::{coerce, null_as_default, ParameterType, UserParameter};
pub use persist::PersistMode;
pub use template::TemplateOptions;
