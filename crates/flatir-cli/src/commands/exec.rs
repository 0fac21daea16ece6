//! Exec command - run a persisted buffer.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use super::execute_file;
use crate::config::Config;

#[derive(Args)]
pub struct ExecCommand {
    /// Buffer written by `compile` or `run --keep`
    pub buffer: PathBuf,
}

impl ExecCommand {
    pub fn run(&self, config: &Config) -> Result<()> {
        let value = execute_file(&self.buffer, config)?;
        println!("{}", value.inspect());
        Ok(())
    }
}
