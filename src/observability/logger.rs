//! Markdown log of command invocations.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

/// Append-only markdown log of command invocations.
///
/// One section is written when an invocation starts and another when it
/// finishes. The file gets a header the first time it is created.
#[derive(Debug)]
pub struct InvocationLog {
    log_file: PathBuf,
    // Serializes appends so entries from one call never interleave.
    write_lock: Mutex<()>,
}

impl InvocationLog {
    /// Open (or create) an invocation log.
    ///
    /// # Arguments
    /// * `log_file` - Path to log file. If None, creates a timestamped file in temp directory.
    pub fn new(log_file: Option<&Path>) -> Result<Self> {
        let log_file = match log_file {
            Some(p) => p.to_path_buf(),
            None => {
                let mut dir = std::env::temp_dir();
                dir.push("clikit-logs");
                std::fs::create_dir_all(&dir).with_context(|| {
                    format!("Failed to create log directory: {}", dir.display())
                })?;
                let filename = format!(
                    "invocations_{}_{}.md",
                    Utc::now().timestamp_millis(),
                    std::process::id()
                );
                dir.join(filename)
            }
        };

        if let Some(parent) = log_file.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
        }

        let log = Self {
            log_file,
            write_lock: Mutex::new(()),
        };

        if !log.log_file.exists() {
            log.initialize_log_file()?;
        }

        Ok(log)
    }

    fn initialize_log_file(&self) -> Result<()> {
        let mut file = File::create(&self.log_file)
            .with_context(|| format!("Failed to create log file: {}", self.log_file.display()))?;

        let now: DateTime<Utc> = Utc::now();

        writeln!(file, "# Command Invocation Log\n")?;
        writeln!(file, "Log started: {}\n", now.to_rfc3339())?;
        writeln!(file, "---\n")?;

        Ok(())
    }

    fn append_to_log(&self, content: &str) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| anyhow::anyhow!("invocation log lock poisoned"))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file)
            .with_context(|| format!("Failed to open log file: {}", self.log_file.display()))?;

        write!(file, "{}", content).with_context(|| "Failed to write to log file")?;

        Ok(())
    }

    /// Log the start of an invocation.
    ///
    /// # Arguments
    /// * `invocation_id` - Identifier of the invocation.
    /// * `command` - Command key being run.
    /// * `params` - Parameters as passed in.
    /// * `started_at` - Wall-clock start of the invocation.
    pub fn log_invocation_start(
        &self,
        invocation_id: &str,
        command: &str,
        params: &serde_json::Map<String, serde_json::Value>,
        started_at: DateTime<Utc>,
    ) -> Result<()> {
        let content = format!(
            "## Invocation Started - {}\n\n**Id:** {}\n**Command:** `{}`\n**Params:**\n```json\n{}\n```\n\n",
            started_at.to_rfc3339(),
            invocation_id,
            command,
            serde_json::to_string_pretty(params).unwrap_or_default()
        );
        self.append_to_log(&content)
    }

    /// Log the outcome of an invocation.
    ///
    /// # Arguments
    /// * `invocation_id` - Identifier of the invocation.
    /// * `command` - Command key that ran.
    /// * `elapsed` - Wall-clock duration of the invocation.
    /// * `outcome` - `Ok` with the rendered output or `Err` with the failure message.
    pub fn log_invocation_result(
        &self,
        invocation_id: &str,
        command: &str,
        elapsed: Duration,
        outcome: Result<&serde_json::Value, &str>,
    ) -> Result<()> {
        let now: DateTime<Utc> = Utc::now();
        let mut content = format!(
            "### Invocation Finished - {}\n\n**Id:** {}\n**Command:** `{}`\n**Elapsed:** {} ms\n",
            now.to_rfc3339(),
            invocation_id,
            command,
            elapsed.as_millis()
        );

        match outcome {
            Ok(output) => content.push_str(&format!(
                "**Status:** success\n**Output:**\n```json\n{}\n```\n\n",
                serde_json::to_string_pretty(output).unwrap_or_default()
            )),
            Err(message) => {
                content.push_str(&format!("**Status:** failure\n**Error:** {}\n\n", message))
            }
        }

        self.append_to_log(&content)
    }

    /// Get the log file path.
    pub fn log_file(&self) -> &Path {
        &self.log_file
    }
}
