use std::env;
use std::process::Command;

use anyhow::{bail, Context, Result};
use promptmaster_contracts::session::HostKeySelector;
use tracing::info;

/// Host key selection backed by an environment variable the host fills in,
/// plus an optional command that opens the host's own picker.
#[derive(Debug, Clone)]
pub struct EnvKeyHost {
    var: String,
    select_command: Option<String>,
}

impl EnvKeyHost {
    pub fn new(var: impl Into<String>, select_command: Option<String>) -> Self {
        Self {
            var: var.into(),
            select_command: select_command
                .map(|command| command.trim().to_string())
                .filter(|command| !command.is_empty()),
        }
    }
}

impl HostKeySelector for EnvKeyHost {
    fn has_selected_key(&self) -> Result<bool> {
        Ok(env::var(&self.var)
            .map(|value| !value.trim().is_empty())
            .unwrap_or(false))
    }

    fn open_key_selection(&self) -> Result<()> {
        let Some(command) = self.select_command.as_deref() else {
            info!(var = %self.var, "no host selection command configured");
            return Ok(());
        };
        let args = shell_words::split(command)
            .with_context(|| format!("invalid host key selection command `{command}`"))?;
        let Some((program, rest)) = args.split_first() else {
            return Ok(());
        };
        let status = Command::new(program)
            .args(rest)
            .status()
            .with_context(|| format!("failed to start host key selection `{command}`"))?;
        if !status.success() {
            bail!("host key selection `{command}` exited with {status}");
        }
        Ok(())
    }
}
