use std::str::FromStr;

use anyhow::{bail, Context};

use crate::trend::TrendPolicy;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub max_connections: u32,
    pub trend_policy: TrendPolicy,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .context("DATABASE_URL must be set to a production Postgres instance")?;
        let max_connections =
            parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?;

        let defaults = TrendPolicy::default();
        let trend_policy = TrendPolicy {
            margin_points: parse_or(&lookup, "TREND_MARGIN_POINTS", defaults.margin_points)?,
            medium_std_dev: parse_or(&lookup, "STABILITY_MEDIUM_STD_DEV", defaults.medium_std_dev)?,
            low_std_dev: parse_or(&lookup, "STABILITY_LOW_STD_DEV", defaults.low_std_dev)?,
        };
        for (key, value) in [
            ("TREND_MARGIN_POINTS", trend_policy.margin_points),
            ("STABILITY_MEDIUM_STD_DEV", trend_policy.medium_std_dev),
            ("STABILITY_LOW_STD_DEV", trend_policy.low_std_dev),
        ] {
            if !value.is_finite() || value < 0.0 {
                bail!("{key} must be a finite, non-negative number, got {value}");
            }
        }
        if trend_policy.medium_std_dev > trend_policy.low_std_dev {
            bail!("STABILITY_MEDIUM_STD_DEV must not exceed STABILITY_LOW_STD_DEV");
        }

        Ok(Self {
            database_url,
            max_connections,
            trend_policy,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        None => Ok(default),
    }
}
