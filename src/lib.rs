pub mod config;
pub mod deepl;
pub mod detection;
pub mod error;
pub mod formatter;
pub mod i18n;
pub mod line;
pub mod openai;
pub mod security;
pub mod server;
pub mod translation;
