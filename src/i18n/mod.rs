//! Language model of the bot.
//!
//! # Architecture
//!
//! - `language`: the closed `LanguageCode` set and its static metadata
//!   (prompt names, reply labels, secondary-provider codes)
//! - `normalize`: maps provider tags onto `LanguageCode` and enforces the
//!   "no translation into the source language" rule
//! - `routing`: which languages a group's messages are translated into
//!
//! # Example
//!
//! ```rust,ignore
//! use crate::i18n::{normalize_code, LanguageCode};
//!
//! assert_eq!(normalize_code("zh-Hans"), LanguageCode::ZhTw);
//! ```

mod language;
mod normalize;
mod routing;

pub use language::LanguageCode;
pub use normalize::{normalize_code, normalize_translations, Translations};
pub use routing::RoutingTable;
