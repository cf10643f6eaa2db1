//! CLI transport for direct terminal interaction

use crate::config::Config;
use crate::llm::{
    default_sink, ChatMessage, ClassifiedError, ErrorClassifier, LlmError, NullSink,
    OpenAiCompatConfig, RadiumProvider, SharedSink,
};
use crate::mode::AppModeProvider;
use anyhow::{Context, Result};
use colored::Colorize;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

/// Load config from an explicit path, or the default location
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

/// Replay `paths` as a navigation sequence and print the mode after each
pub fn run_mode(config: &Config, paths: &[String]) -> Result<()> {
    let first = paths.first().map(String::as_str).unwrap_or("/");
    let provider = AppModeProvider::with_deploy_prefix(first, config.mode.deploy_prefix.clone());

    for path in paths {
        let mode = provider.observe_path(path);
        println!("{}\t{}", path, mode);
    }
    Ok(())
}

/// Classify an error carrying `message` and print the result as JSON
pub fn run_classify(config: &Config, message: &str, fallback: Option<&str>) -> Result<()> {
    let classifier = classifier(config, Arc::new(NullSink));
    let result = classifier.handle(anyhow::anyhow!(message.to_string()), fallback);
    let json = serde_json::to_string_pretty(&result.summary())?;
    println!("{}", json);
    Ok(())
}

/// Send one prompt to the inference server
pub async fn run_chat(
    config: &Config,
    prompt: &str,
    model: Option<String>,
    stream: bool,
) -> Result<()> {
    let provider = provider(config, model)?;
    let messages = [ChatMessage::user(prompt)];

    let result = if stream {
        let mut out = DeltaWriter::new(std::io::stdout());
        let reply = provider
            .chat_streaming(&messages, |delta| out.write(delta))
            .await;
        out.finish().context("Failed to write streamed reply")?;
        reply.map(|_| ())
    } else {
        provider.chat(&messages).await.map(|reply| println!("{}", reply))
    };

    result.or_else(|e| report_failure(config, e))
}

/// List the models served by the inference server
pub async fn run_models(config: &Config) -> Result<()> {
    let provider = provider(config, None)?;
    match provider.list_models().await {
        Ok(models) => {
            println!("{}", format!("Models on {}", provider.name()).bold());
            for model in models {
                println!("  • {}", model);
            }
            Ok(())
        }
        Err(e) => report_failure(config, e),
    }
}

/// Echoes streamed deltas as they arrive.
///
/// A failed write (closed pipe) stops further output; the error is kept and
/// returned by `finish` once the stream is over.
struct DeltaWriter<W: Write> {
    out: W,
    error: Option<std::io::Error>,
}

impl<W: Write> DeltaWriter<W> {
    fn new(out: W) -> Self {
        Self { out, error: None }
    }

    fn write(&mut self, delta: &str) {
        if self.error.is_some() {
            return;
        }
        let out = &mut self.out;
        if let Err(e) = out.write_all(delta.as_bytes()).and_then(|_| out.flush()) {
            self.error = Some(e);
        }
    }

    fn finish(mut self) -> std::io::Result<()> {
        match self.error.take() {
            Some(e) => Err(e),
            None => writeln!(self.out),
        }
    }
}

fn sink(config: &Config) -> SharedSink {
    if config.logging.log_http_traffic {
        default_sink()
    } else {
        Arc::new(NullSink)
    }
}

fn classifier(config: &Config, sink: SharedSink) -> ErrorClassifier {
    ErrorClassifier::new(sink).with_default_fallback(config.radium.fallback_model.clone())
}

fn provider(config: &Config, model: Option<String>) -> Result<RadiumProvider> {
    let compat =
        OpenAiCompatConfig::from_config(&config.radium).context("Invalid [radium] settings")?;
    let provider = RadiumProvider::instrumented(compat, sink(config));
    Ok(match model {
        Some(model) => provider.with_model(model),
        None => provider,
    })
}

/// Print the classification of a failed call and exit non-zero.
/// The fallback model is only suggested, never called.
fn report_failure(config: &Config, error: LlmError) -> Result<()> {
    let ClassifiedError {
        message,
        fallback_to_model,
        original_error,
        ..
    } = classifier(config, default_sink()).handle(error, None);

    eprintln!("{} {}", "Error:".red().bold(), message);
    eprintln!("  cause: {}", original_error);
    eprintln!("  suggested fallback model: {}", fallback_to_model.cyan());
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ClosedPipe {
        attempts: usize,
    }

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            self.attempts += 1;
            Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_delta_writer_echoes_and_ends_line() {
        let mut out = DeltaWriter::new(Vec::new());
        out.write("Hel");
        out.write("lo");
        let buffer = {
            let DeltaWriter { out: buffer, error } = out;
            assert!(error.is_none());
            buffer
        };
        assert_eq!(buffer, b"Hello");

        let out = DeltaWriter::new(Vec::new());
        assert!(out.finish().is_ok());
    }

    #[test]
    fn test_delta_writer_keeps_first_write_error() {
        let mut out = DeltaWriter::new(ClosedPipe { attempts: 0 });
        out.write("Hel");
        out.write("lo");
        assert_eq!(out.out.attempts, 1);

        let err = out.finish().unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::BrokenPipe);
    }
}
