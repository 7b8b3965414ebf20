//! systemd service and timer units for daily runs.
//!
//! The timer fires once a day with a randomized delay so a fleet of hosts does
//! not hit the download server at the same moment, and is persistent so a run
//! missed while the host was off happens at next boot.

use crate::constants::{BINARY_NAME, TIMER_RANDOMIZED_DELAY};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tera::{Context as TeraContext, Tera};
use tokio::fs;

const SERVICE_TEMPLATE: &str = r"[Unit]
Description={{ description }}
Wants=network-online.target
After=network-online.target

[Service]
Type=oneshot
ExecStart={{ exec_start }}
Nice=10
IOSchedulingClass=idle
";

const TIMER_TEMPLATE: &str = r"[Unit]
Description=Daily {{ description | lower }}

[Timer]
OnCalendar=daily
RandomizedDelaySec={{ randomized_delay }}
Persistent=true
Unit={{ service_name }}

[Install]
WantedBy=timers.target
";

/// Rendered unit files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleUnits {
    /// Contents of `deb-updater.service`
    pub service: String,
    /// Contents of `deb-updater.timer`
    pub timer: String,
}

impl ScheduleUnits {
    /// File name of the service unit.
    #[must_use]
    pub fn service_name() -> String {
        format!("{BINARY_NAME}.service")
    }

    /// File name of the timer unit.
    #[must_use]
    pub fn timer_name() -> String {
        format!("{BINARY_NAME}.timer")
    }

    /// Write both units into `unit_dir`, returning the written paths.
    ///
    /// # Errors
    ///
    /// Fails if the directory or either file cannot be written.
    pub async fn write_to(&self, unit_dir: &Path) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(unit_dir)
            .await
            .with_context(|| format!("Failed to create unit directory {}", unit_dir.display()))?;

        let mut written = Vec::with_capacity(2);
        for (name, content) in [(Self::service_name(), &self.service), (Self::timer_name(), &self.timer)]
        {
            let path = unit_dir.join(name);
            fs::write(&path, content)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!("Wrote {}", path.display());
            written.push(path);
        }
        Ok(written)
    }
}

/// Quote an `ExecStart` argument if systemd would otherwise split it.
fn quote_arg(arg: &str) -> String {
    if arg.is_empty() || arg.chars().any(|c| c.is_whitespace() || c == '"' || c == '\\') {
        format!("\"{}\"", arg.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        arg.to_string()
    }
}

/// Render the units for the binary at `executable`.
///
/// A non-default `config_path` is passed through to the scheduled command.
///
/// # Errors
///
/// Fails only if a template cannot be rendered.
pub fn render_units(executable: &Path, config_path: Option<&Path>) -> Result<ScheduleUnits> {
    let mut exec = vec![quote_arg(&executable.display().to_string())];
    if let Some(config) = config_path {
        exec.push("--config".to_string());
        exec.push(quote_arg(&config.display().to_string()));
    }
    exec.extend(["--silent", "run", "--scheduled"].map(str::to_string));

    let mut tera = Tera::default();
    tera.add_raw_templates([("service", SERVICE_TEMPLATE), ("timer", TIMER_TEMPLATE)])
        .context("Failed to load unit templates")?;

    let mut context = TeraContext::new();
    context.insert("description", "Update the tracked Debian package");
    context.insert("exec_start", &exec.join(" "));
    context.insert("randomized_delay", TIMER_RANDOMIZED_DELAY);
    context.insert("service_name", &ScheduleUnits::service_name());

    Ok(ScheduleUnits {
        service: tera.render("service", &context).context("Failed to render service unit")?,
        timer: tera.render("timer", &context).context("Failed to render timer unit")?,
    })
}
