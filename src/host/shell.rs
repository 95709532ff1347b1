//! System URL opener.

use crate::error::{Result, UpdateError};
use crate::update::transport::ExternalShell;
use std::process::Stdio;

/// Opens URLs with the platform's default handler.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemShell;

impl ExternalShell for SystemShell {
    fn open_url(&self, url: &str) -> Result<()> {
        let parsed = url::Url::parse(url)
            .map_err(|e| UpdateError::Transport(format!("invalid release URL `{url}`: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(UpdateError::Transport(format!(
                "refusing to open non-web URL `{url}`"
            )));
        }

        let (program, args) = opener_command(std::env::consts::OS, parsed.as_str());
        std::process::Command::new(program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| UpdateError::Transport(format!("cannot run {program}: {e}")))?;
        Ok(())
    }
}

fn opener_command(os: &str, url: &str) -> (&'static str, Vec<String>) {
    match os {
        "macos" => ("open", vec![url.to_owned()]),
        // The empty string is the window title `start` expects before the target.
        "windows" => (
            "cmd",
            vec![
                "/C".to_owned(),
                "start".to_owned(),
                String::new(),
                url.to_owned(),
            ],
        ),
        _ => ("xdg-open", vec![url.to_owned()]),
    }
}
