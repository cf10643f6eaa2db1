//! radium: client-side glue for the Radium inference server
//!
//! This library provides:
//! - App mode tracking (chat vs deploy) derived from the navigation path
//! - Error classification with an advisory fallback model
//! - An instrumented HTTP transport for the OpenAI-compatible API
//! - A small chat completions client built on that transport

pub mod config;
pub mod llm;
pub mod mode;
pub mod transport;

pub use config::Config;
pub use llm::{
    handle_radium_model_error, ErrorClassifier, InstrumentedTransport, RadiumProvider,
};
pub use mode::{use_app_mode, AppMode, AppModeProvider, ModeHandle};
