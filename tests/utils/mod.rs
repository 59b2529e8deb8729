use anyhow::Result;
use std::process::Command;

use super::common::TestEnvironment;

pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandOutput {
    /// Parses every non-empty stdout line as a JSON event.
    pub fn stdout_events(&self) -> Result<Vec<serde_json::Value>> {
        json_lines(&self.stdout)
    }

    pub fn stderr_events(&self) -> Result<Vec<serde_json::Value>> {
        json_lines(&self.stderr)
    }
}

fn json_lines(text: &str) -> Result<Vec<serde_json::Value>> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| Ok(serde_json::from_str(line)?))
        .collect()
}

pub fn run_lyricmv_command(env: &TestEnvironment, args: &[&str]) -> Result<CommandOutput> {
    let output = Command::new(env!("CARGO_BIN_EXE_lyricmv"))
        .args(args)
        .arg("--no-color")
        .current_dir(env.work_dir())
        .env("HOME", env.home())
        .env("XDG_CONFIG_HOME", env.config_home())
        .env("XDG_CACHE_HOME", env.cache_home())
        .env("XDG_DATA_HOME", env.data_home())
        .output()?;

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code: output.status.code().unwrap_or(-1),
    })
}
