use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::{AnalyticsError, Result};

/// Plot-area size in pixels and tick density for chart geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartOptions {
    pub width: f64,
    pub height: f64,
    pub y_tick_count: usize,
    pub x_tick_count: usize,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            width: 640.0,
            height: 320.0,
            y_tick_count: 5,
            x_tick_count: 6,
        }
    }
}

impl ChartOptions {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("width", self.width), ("height", self.height)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(AnalyticsError::InvalidChartOptions(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub chart: ChartOptions,
    /// Students listed in console summaries.
    pub report_limit: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            chart: ChartOptions::default(),
            report_limit: 25,
        }
    }
}

impl AppConfig {
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: AppConfig = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config.chart.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[chart]\nwidth = 800.0").unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.chart.width, 800.0);
        assert_eq!(config.chart.height, 320.0);
        assert_eq!(config.report_limit, 25);
    }

    #[test]
    fn missing_path_uses_defaults() {
        assert_eq!(AppConfig::load(None).unwrap(), AppConfig::default());
    }

    #[test]
    fn rejects_zero_height() {
        let options = ChartOptions {
            height: 0.0,
            ..ChartOptions::default()
        };
        assert!(options.validate().is_err());
    }
}
