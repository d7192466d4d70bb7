use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Composite score cut-offs for the final Buy/Sell decision
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalThresholds {
    pub buy: f64,  // 60
    pub sell: f64, // 40
}

impl Default for SignalThresholds {
    fn default() -> Self {
        Self { buy: 60.0, sell: 40.0 }
    }
}

impl SignalThresholds {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("buy", self.buy), ("sell", self.sell)] {
            if !value.is_finite() || !(0.0..=100.0).contains(&value) {
                bail!("{} threshold must be within 0..=100, got {}", name, value);
            }
        }
        if self.sell >= self.buy {
            bail!("sell threshold ({}) must be below buy threshold ({})", self.sell, self.buy);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwingConfig {
    pub thresholds: SignalThresholds,
    pub fetch_timeout_secs: u64,   // 10
    pub cache_ttl_secs: u64,       // 300 (5 minutes)
    pub max_concurrency: usize,    // 8
    pub prediction_seed: Option<u64>,
    pub data_dir: PathBuf,         // ./data
    /// Attach the per-bar chart history to results
    pub include_chart: bool,       // false
}

impl Default for SwingConfig {
    fn default() -> Self {
        Self {
            thresholds: SignalThresholds::default(),
            fetch_timeout_secs: 10,
            cache_ttl_secs: 300,
            max_concurrency: 8,
            prediction_seed: None,
            data_dir: PathBuf::from("data"),
            include_chart: false,
        }
    }
}

impl SwingConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset keys take the defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let config = Self {
            thresholds: SignalThresholds {
                buy: parse_or(&lookup, "SWING_BUY_THRESHOLD", defaults.thresholds.buy)?,
                sell: parse_or(&lookup, "SWING_SELL_THRESHOLD", defaults.thresholds.sell)?,
            },
            fetch_timeout_secs: parse_or(&lookup, "SWING_FETCH_TIMEOUT_SECS", defaults.fetch_timeout_secs)?,
            cache_ttl_secs: parse_or(&lookup, "SWING_CACHE_TTL_SECS", defaults.cache_ttl_secs)?,
            max_concurrency: parse_or(&lookup, "SWING_MAX_CONCURRENCY", defaults.max_concurrency)?,
            prediction_seed: match lookup("SWING_PREDICTION_SEED") {
                Some(raw) if !raw.trim().is_empty() => Some(
                    raw.trim()
                        .parse()
                        .with_context(|| format!("Invalid SWING_PREDICTION_SEED: {}", raw))?,
                ),
                _ => None,
            },
            data_dir: lookup("SWING_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            include_chart: parse_or(&lookup, "SWING_INCLUDE_CHART", defaults.include_chart)?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.thresholds.validate()?;
        if self.fetch_timeout_secs == 0 {
            bail!("SWING_FETCH_TIMEOUT_SECS must be positive");
        }
        if self.max_concurrency == 0 {
            bail!("SWING_MAX_CONCURRENCY must be positive");
        }
        Ok(())
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: {}", key, raw)),
        None => Ok(default),
    }
}
