//! Save and load trained portfolios as JSON files.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use crate::services::TrainedPortfolio;

/// Write `portfolio` to `path` as JSON, replacing any existing file.
pub fn save_portfolio(portfolio: &TrainedPortfolio, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let json = portfolio.to_json().context("Failed to serialize portfolio")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write portfolio {}", path.display()))?;
    info!(path = %path.display(), "Saved trained portfolio");
    Ok(())
}

/// Read and validate a portfolio written by [`save_portfolio`].
pub fn load_portfolio(path: impl AsRef<Path>) -> Result<TrainedPortfolio> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read portfolio {}", path.display()))?;
    TrainedPortfolio::from_json(&json)
        .with_context(|| format!("Invalid portfolio in {}", path.display()))
}
