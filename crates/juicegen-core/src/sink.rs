use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Where a rendered unit goes. Units are fully rendered before a sink is
/// touched, so a failed run never leaves a partial file behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sink {
    Stdout,
    File(PathBuf),
}

impl Sink {
    pub fn from_output(output: Option<&Path>) -> Self {
        match output {
            Some(path) => Sink::File(path.to_path_buf()),
            None => Sink::Stdout,
        }
    }

    pub fn write_unit(&self, text: &str) -> Result<()> {
        match self {
            Sink::Stdout => {
                let mut out = std::io::stdout().lock();
                out.write_all(text.as_bytes()).context("write generated unit to stdout")?;
                out.flush().context("flush stdout")?;
            }
            Sink::File(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("create output dir: {}", parent.display()))?;
                }
                std::fs::write(path, text.as_bytes())
                    .with_context(|| format!("write output: {}", path.display()))?;
                tracing::info!(path = %path.display(), bytes = text.len(), "wrote implementation");
            }
        }
        Ok(())
    }
}

/// Fails unless `path` already holds exactly `text`.
pub fn check_unit(path: &Path, text: &str) -> Result<()> {
    let cur = std::fs::read_to_string(path)
        .with_context(|| format!("read existing output: {}", path.display()))?;
    if cur != text {
        anyhow::bail!("generated output differs: {}", path.display());
    }
    Ok(())
}
