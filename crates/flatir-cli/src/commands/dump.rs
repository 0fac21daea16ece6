//! Dump command - disassemble a persisted buffer.

use anyhow::{Context, Result};
use clap::Args;
use flatir_format::{MappedScope, disasm};
use std::path::PathBuf;

#[derive(Args)]
pub struct DumpCommand {
    /// Buffer to inspect
    pub buffer: PathBuf,

    /// Print the decoded IR as JSON instead of a listing
    #[arg(long)]
    pub json: bool,
}

impl DumpCommand {
    pub fn run(&self) -> Result<()> {
        let mapped = MappedScope::open(&self.buffer)
            .with_context(|| format!("Failed to map {}", self.buffer.display()))?;
        let root = mapped.root()?;

        if self.json {
            let scope = root.to_ir()?;
            println!("{}", serde_json::to_string_pretty(&scope)?);
        } else {
            print!("{}", disasm::render(root)?);
        }
        Ok(())
    }
}
