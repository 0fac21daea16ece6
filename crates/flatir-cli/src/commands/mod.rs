//! CLI command implementations.

pub mod compile;
pub mod dump;
pub mod exec;
pub mod run;

use anyhow::{Context, Result};
use flatir_format::{MappedScope, persist};
use flatir_vm::{Frame, Interpreter, RubyModule, Value};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::Config;

/// Extension of persisted buffers
pub const BUFFER_EXTENSION: &str = "fir";

/// Top-level frame as configured
fn top_level_frame(config: &Config) -> Frame {
    Frame::builder()
        .module(RubyModule::new(config.run.module_name.as_str()))
        .self_name(config.run.self_name.as_str())
        .build()
}

/// Persist `bytes` to `path`, map the file back and run its root scope
pub fn persist_and_execute(bytes: &[u8], path: &Path, config: &Config) -> Result<Value> {
    persist(path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), bytes = bytes.len(), "persisted buffer");
    execute_file(path, config)
}

/// Map the buffer at `path` and run its root scope
pub fn execute_file(path: &Path, config: &Config) -> Result<Value> {
    let mapped =
        MappedScope::open(path).with_context(|| format!("Failed to map {}", path.display()))?;
    let scope = mapped.root()?;
    let mut frame = top_level_frame(config);
    let value = Interpreter::new()
        .execute(scope, &mut frame)
        .with_context(|| format!("{}:{}", display_file(frame.file(), path), frame.line()))?;
    Ok(value)
}

fn display_file<'a>(file: &'a str, fallback: &'a Path) -> std::borrow::Cow<'a, str> {
    if file.is_empty() {
        fallback.to_string_lossy()
    } else {
        file.into()
    }
}

/// Where a buffer compiled from `source` goes
///
/// `output_dir` wins when set; otherwise the buffer sits next to the source.
pub fn buffer_path(source: &Path, output_dir: Option<&Path>) -> PathBuf {
    let with_ext = source.with_extension(BUFFER_EXTENSION);
    match (output_dir, with_ext.file_name()) {
        (Some(dir), Some(name)) => dir.join(name),
        _ => with_ext,
    }
}
