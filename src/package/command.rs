//! Builder for package-manager subprocesses.
//!
//! Every `dpkg`, `dpkg-deb` and `apt-get` invocation goes through
//! [`PackageCommand`] so they share tool lookup, privilege elevation, timeout
//! handling, debug logging and error mapping.

use crate::constants::QUERY_TIMEOUT;
use crate::core::UpdaterError;
use crate::utils::platform::find_tool;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

/// Fluent builder for one package-manager command.
///
/// # Examples
///
/// ```rust,no_run
/// use deb_updater::package::command::PackageCommand;
///
/// # async fn example() -> Result<(), deb_updater::core::UpdaterError> {
/// let output = PackageCommand::new("dpkg-query")
///     .args(["-W", "-f", "${Version}", "discord"])
///     .with_context("Querying installed version")
///     .execute()
///     .await?;
/// println!("{}", output.stdout);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct PackageCommand {
    program: String,
    args: Vec<String>,
    /// Privilege elevation wrapper such as `sudo`
    elevate_with: Option<String>,
    timeout_duration: Duration,
    context: Option<String>,
}

/// Captured result of a successful command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Standard output, lossily decoded
    pub stdout: String,
    /// Standard error, lossily decoded
    pub stderr: String,
}

impl PackageCommand {
    /// Command running `program`, with the query timeout by default.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            elevate_with: None,
            timeout_duration: QUERY_TIMEOUT,
            context: None,
        }
    }

    /// Add one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Run through an elevation wrapper (`sudo`, `doas`, ...) when set.
    #[must_use]
    pub fn elevate_with(mut self, wrapper: Option<&str>) -> Self {
        self.elevate_with = wrapper.filter(|w| !w.trim().is_empty()).map(str::to_string);
        self
    }

    /// Limit how long the command may run.
    #[must_use]
    pub const fn timeout(mut self, duration: Duration) -> Self {
        self.timeout_duration = duration;
        self
    }

    /// Label included in debug logs.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// The command line as it would be shown to a user.
    #[must_use]
    pub fn display_line(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 2);
        if let Some(wrapper) = &self.elevate_with {
            parts.push(wrapper.as_str());
        }
        parts.push(self.program.as_str());
        parts.extend(self.args.iter().map(String::as_str));
        parts.join(" ")
    }

    fn resolve(&self) -> Result<(PathBuf, Vec<String>), UpdaterError> {
        let program = find_tool(&self.program)?;
        match &self.elevate_with {
            Some(wrapper) => {
                let wrapper = find_tool(wrapper)?;
                let mut args = Vec::with_capacity(self.args.len() + 1);
                args.push(program.display().to_string());
                args.extend(self.args.iter().cloned());
                Ok((wrapper, args))
            }
            None => Ok((program, self.args.clone())),
        }
    }

    /// Run the command and capture its output.
    ///
    /// # Errors
    ///
    /// - [`UpdaterError::ToolNotFound`] if the program or wrapper is missing
    /// - [`UpdaterError::CommandTimeout`] if the time limit is exceeded
    /// - [`UpdaterError::CommandFailed`] if it cannot be spawned or exits non-zero
    pub async fn execute(self) -> Result<CommandOutput, UpdaterError> {
        let line = self.display_line();
        let (program, args) = self.resolve()?;

        match &self.context {
            Some(ctx) => tracing::debug!(target: "package", "({ctx}) Executing command: {line}"),
            None => tracing::debug!(target: "package", "Executing command: {line}"),
        }

        let mut cmd = Command::new(&program);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let start = std::time::Instant::now();
        let duration = self.timeout_duration;
        let output = match timeout(duration, cmd.output()).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    target: "package",
                    "Command timed out after {} seconds: {line}",
                    duration.as_secs()
                );
                return Err(UpdaterError::CommandTimeout {
                    command: line,
                    seconds: duration.as_secs(),
                });
            }
        }
        .map_err(|e| UpdaterError::CommandFailed {
            command: line.clone(),
            stderr: format!("failed to spawn: {e}"),
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        tracing::trace!(
            target: "package",
            "Command finished in {:?} with status {:?}",
            start.elapsed(),
            output.status.code()
        );

        if !output.status.success() {
            tracing::debug!(
                target: "package",
                "Command failed with exit code: {:?}",
                output.status.code()
            );
            let message = if stderr.trim().is_empty() {
                match output.status.code() {
                    Some(code) => format!("exited with status {code}"),
                    None => "terminated by signal".to_string(),
                }
            } else {
                stderr.trim().to_string()
            };
            return Err(UpdaterError::CommandFailed {
                command: line,
                stderr: message,
            });
        }

        Ok(CommandOutput {
            stdout,
            stderr,
        })
    }

    /// Run the command and return trimmed stdout.
    ///
    /// # Errors
    ///
    /// Same as [`execute`](Self::execute).
    pub async fn execute_stdout(self) -> Result<String, UpdaterError> {
        Ok(self.execute().await?.stdout.trim().to_string())
    }
}
