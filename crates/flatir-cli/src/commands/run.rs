//! Run command - compile source, persist it, map it back and execute it.

use anyhow::{Context, Result};
use clap::Args;
use flatir_compiler::Compiler;
use std::path::PathBuf;
use tracing::debug;

use super::{BUFFER_EXTENSION, buffer_path, persist_and_execute};
use crate::config::Config;

#[derive(Args)]
pub struct RunCommand {
    /// Source file to execute
    #[arg(required_unless_present = "eval", conflicts_with = "eval")]
    pub file: Option<PathBuf>,

    /// Inline source to execute instead of a file
    #[arg(short = 'e', long = "eval", value_name = "SRC")]
    pub eval: Option<String>,

    /// Keep the persisted buffer at this path
    #[arg(long, value_name = "PATH")]
    pub keep: Option<PathBuf>,
}

impl RunCommand {
    pub fn run(&self, config: &Config) -> Result<()> {
        let (source, label) = match (&self.eval, &self.file) {
            (Some(src), _) => (src.clone(), "-e".to_string()),
            (None, Some(file)) => (
                std::fs::read_to_string(file)
                    .with_context(|| format!("Failed to read {}", file.display()))?,
                file.display().to_string(),
            ),
            (None, None) => anyhow::bail!("Nothing to run: pass a file or -e"),
        };

        let bytes = Compiler::new(label.as_str())
            .compile_to_buffer(&source)
            .with_context(|| format!("Failed to compile {label}"))?;
        debug!(source = %label, bytes = bytes.len(), "compiled");

        // Temporary directory lives until the run finishes
        let mut scratch = None;
        let path = match self.output_path(config) {
            Some(path) => path,
            None => {
                let dir = tempfile::tempdir().context("Failed to create temporary directory")?;
                let path = dir.path().join(format!("main.{BUFFER_EXTENSION}"));
                scratch = Some(dir);
                path
            }
        };

        let value = persist_and_execute(&bytes, &path, config)?;
        println!("{}", value.inspect());
        drop(scratch);
        Ok(())
    }

    /// Where the buffer is kept, if it outlives the run
    fn output_path(&self, config: &Config) -> Option<PathBuf> {
        if let Some(keep) = &self.keep {
            return Some(keep.clone());
        }
        if !config.compile.keep_buffers {
            return None;
        }
        let source = self
            .file
            .clone()
            .unwrap_or_else(|| PathBuf::from("eval.rb"));
        Some(buffer_path(&source, config.compile.output_dir.as_deref()))
    }
}
