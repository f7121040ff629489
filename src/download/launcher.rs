//! Handing files to other applications.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{Error, Result};

/// Request to show a file in a viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewIntent {
    pub path: PathBuf,
    pub mime: String,
    /// Set when the user should pick the application themselves.
    pub chooser_title: Option<String>,
}

/// Request to pass a file on to a sharing target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareIntent {
    pub path: PathBuf,
    pub mime: String,
    pub title: String,
}

/// Host integration for opening and sharing files.
pub trait Launcher: Send + Sync {
    /// Open the file. Returns `Error::NoViewerApp` if nothing handles its type.
    fn view(&self, intent: &ViewIntent) -> Result<()>;

    /// Share the file. Returns `Error::NoShareHandler` if nothing can take it.
    fn share(&self, intent: &ShareIntent) -> Result<()>;
}

/// Launches the desktop's default handlers.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLauncher;

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

impl Launcher for SystemLauncher {
    fn view(&self, intent: &ViewIntent) -> Result<()> {
        let name = display_name(&intent.path);
        if intent.chooser_title.is_none() && !has_default_handler(&intent.mime) {
            return Err(Error::NoViewerApp(name));
        }
        if let Some(title) = &intent.chooser_title {
            tracing::info!("{}", title);
        }

        spawn_opener(&intent.path).map_err(|e| {
            tracing::debug!("Opener failed for {}: {}", intent.path.display(), e);
            Error::NoViewerApp(name)
        })
    }

    fn share(&self, intent: &ShareIntent) -> Result<()> {
        tracing::debug!("{}: {} ({})", intent.title, intent.path.display(), intent.mime);
        reveal(&intent.path).map_err(|e| {
            tracing::debug!("Reveal failed for {}: {}", intent.path.display(), e);
            Error::NoShareHandler(display_name(&intent.path))
        })
    }
}

/// Whether the desktop has an application registered for `mime`.
#[cfg(target_os = "linux")]
fn has_default_handler(mime: &str) -> bool {
    Command::new("xdg-mime")
        .args(["query", "default", mime])
        .output()
        .map(|out| out.status.success() && !String::from_utf8_lossy(&out.stdout).trim().is_empty())
        .unwrap_or(false)
}

#[cfg(not(target_os = "linux"))]
fn has_default_handler(_mime: &str) -> bool {
    true
}

fn spawn_opener(path: &Path) -> std::io::Result<()> {
    #[cfg(target_os = "macos")]
    {
        Command::new("open").arg(path).spawn()?;
        return Ok(());
    }
    #[cfg(target_os = "linux")]
    {
        Command::new("xdg-open").arg(path).spawn()?;
        return Ok(());
    }
    #[cfg(target_os = "windows")]
    {
        Command::new("explorer").arg(path).spawn()?;
        return Ok(());
    }
    #[allow(unreachable_code)]
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "opening files is not supported on this platform",
    ))
}

/// Show the file in the desktop file manager so it can be sent on.
fn reveal(path: &Path) -> std::io::Result<()> {
    #[cfg(target_os = "macos")]
    {
        Command::new("open").arg("-R").arg(path).spawn()?;
        return Ok(());
    }
    #[cfg(target_os = "linux")]
    {
        let folder = path.parent().unwrap_or(path);
        Command::new("xdg-open").arg(folder).spawn()?;
        return Ok(());
    }
    #[cfg(target_os = "windows")]
    {
        Command::new("explorer")
            .arg(format!("/select,{}", path.display()))
            .spawn()?;
        return Ok(());
    }
    #[allow(unreachable_code)]
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "sharing files is not supported on this platform",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name() {
        assert_eq!(display_name(Path::new("/d/CMS/Physics/a.pdf")), "a.pdf");
    }
}
