//! Client-side helpers centred on an HTTP request orchestrator.
//!
//! [`http::Http`] wraps a transport, normalizes every backend reply into an
//! [`http::Envelope`] and drives loading/error callbacks around each call.
//! The remaining modules hold the smaller helpers: an expiring key/value
//! cache, AES/Base64/MD5 wrappers and assorted utilities.

pub mod cipher;
pub mod config;
pub mod core;
pub mod http;
pub mod logging;
pub mod storage;
pub mod utils;
