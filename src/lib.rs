//! Face detection post-processing and recognition
//!
//! Turns raw anchor-grid detector outputs into face boxes and landmarks in
//! original-image pixels, and compares or ranks face embeddings.

pub mod config;
pub mod engine;
pub mod error;
pub mod service;
pub mod storage;
pub mod utils;

pub use config::Config;
pub use error::{FaceError, Result};
