//! Radium inference client: transport, logging wrapper, error classification

mod debug_wrapper;
mod error;
mod fallback;
mod log_sink;
mod radium;
pub mod streaming;
mod transport;
mod types;

pub use debug_wrapper::InstrumentedTransport;
pub use error::{LlmError, TransportError};
pub use fallback::{
    classify, handle_radium_model_error, Classifiable, ClassificationSummary, ClassifiedError,
    ErrorCategory, ErrorClassifier, DEFAULT_FALLBACK_MODEL,
};
pub use log_sink::{
    default_sink, DiagnosticSink, LogLevel, LogLine, NullSink, RecordingSink, SharedSink,
    TracingSink,
};
pub use radium::{
    OpenAiCompatConfig, RadiumProvider, DEFAULT_BASE_URL, PLACEHOLDER_API_KEY, PROVIDER_NAME,
};
pub use transport::{
    BodyCopy, BodyStream, HttpRequest, HttpResponse, HttpTransport, ReqwestTransport,
};
pub use types::{ChatMessage, ModelId, Role};
