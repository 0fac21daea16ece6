//! Compile command - compile a source file to a persisted buffer.

use anyhow::{Context, Result};
use clap::Args;
use flatir_compiler::Compiler;
use flatir_format::persist;
use std::path::PathBuf;

use super::buffer_path;
use crate::config::Config;

#[derive(Args)]
pub struct CompileCommand {
    /// Source file
    pub file: PathBuf,

    /// Output buffer (defaults to the source name with a `.fir` extension)
    #[arg(short, long, value_name = "OUT")]
    pub output: Option<PathBuf>,
}

impl CompileCommand {
    pub fn run(&self, config: &Config) -> Result<()> {
        let source = std::fs::read_to_string(&self.file)
            .with_context(|| format!("Failed to read {}", self.file.display()))?;
        let label = self.file.display().to_string();
        let bytes = Compiler::new(label.as_str())
            .compile_to_buffer(&source)
            .with_context(|| format!("Failed to compile {label}"))?;

        let output = self
            .output
            .clone()
            .unwrap_or_else(|| buffer_path(&self.file, config.compile.output_dir.as_deref()));
        if let Some(dir) = output.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        persist(&output, &bytes).with_context(|| format!("Failed to write {}", output.display()))?;

        eprintln!("{} -> {} ({} bytes)", label, output.display(), bytes.len());
        Ok(())
    }
}
