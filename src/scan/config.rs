use anyhow::{Result, anyhow};
use chrono::{DateTime, Local, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

use crate::scan::paths::surfscan_home;

pub const DEFAULT_MAX_FILE_AGE_DAYS: u32 = 30;
const MAX_RETENTION_DAYS: u32 = 36_500;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    pub max_age_days: u32,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            max_age_days: DEFAULT_MAX_FILE_AGE_DAYS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// `local`, `utc`, or an IANA zone name such as `Europe/Berlin`.
    pub timezone: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            timezone: "local".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScanConfig {
    pub retention: RetentionConfig,
    pub ledger: LedgerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialScanConfig {
    retention: Option<RetentionConfig>,
    ledger: Option<LedgerConfig>,
    logging: Option<LoggingConfig>,
}

/// Clock zone used to decide which calendar day a record lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionZone {
    Local,
    Utc,
    Named(Tz),
}

impl PartitionZone {
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("local") {
            return Ok(Self::Local);
        }
        if trimmed.eq_ignore_ascii_case("utc") {
            return Ok(Self::Utc);
        }
        trimmed
            .parse::<Tz>()
            .map(Self::Named)
            .map_err(|err| anyhow!("invalid ledger timezone `{trimmed}`: {err}"))
    }

    pub fn date_of(self, at: DateTime<Utc>) -> NaiveDate {
        match self {
            Self::Local => at.with_timezone(&Local).date_naive(),
            Self::Utc => at.date_naive(),
            Self::Named(tz) => at.with_timezone(&tz).date_naive(),
        }
    }

    /// RFC 3339 rendering of `at` in this zone.
    pub fn timestamp(self, at: DateTime<Utc>) -> String {
        use crate::scan::util::iso_timestamp;
        match self {
            Self::Local => iso_timestamp(&at.with_timezone(&Local)),
            Self::Utc => iso_timestamp(&at),
            Self::Named(tz) => iso_timestamp(&at.with_timezone(&tz)),
        }
    }
}

impl ScanConfig {
    pub fn partition_zone(&self) -> Result<PartitionZone> {
        PartitionZone::parse(&self.ledger.timezone)
    }
}

fn env_or_u32(var: &str, fallback: u32) -> u32 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<u32>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_string(var: &str, fallback: &str) -> String {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => fallback.to_string(),
    }
}

fn validate(cfg: &ScanConfig) -> Result<()> {
    let days = cfg.retention.max_age_days;
    if !(1..=MAX_RETENTION_DAYS).contains(&days) {
        return Err(anyhow!(
            "invalid retention max_age_days: require 1 <= days <= {MAX_RETENTION_DAYS}"
        ));
    }
    cfg.partition_zone()?;
    match cfg.logging.level.trim().to_ascii_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "warning" | "error" => {}
        other => {
            return Err(anyhow!(
                "invalid log level `{other}`; expected trace|debug|info|warn|error"
            ));
        }
    }
    Ok(())
}

fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(custom) = env::var("SURFSCAN_CONFIG_PATH") {
        let trimmed = custom.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    surfscan_home().ok().map(|home| home.join("surfscan.toml"))
}

fn merge_toml(base: &mut ScanConfig, raw: &str) -> Result<()> {
    let parsed: PartialScanConfig = toml::from_str(raw)?;
    if let Some(retention) = parsed.retention {
        base.retention = retention;
    }
    if let Some(ledger) = parsed.ledger {
        base.ledger = ledger;
    }
    if let Some(logging) = parsed.logging {
        base.logging = logging;
    }
    Ok(())
}

fn merge_file_config(base: &mut ScanConfig) -> Result<()> {
    let Some(path) = resolve_config_path() else {
        return Ok(());
    };
    if !path.exists() {
        return Ok(());
    }

    let raw = fs::read_to_string(&path)?;
    merge_toml(base, &raw)
        .map_err(|err| anyhow!("failed to parse surfscan config {}: {err}", path.display()))
}

pub fn load_config() -> Result<ScanConfig> {
    let mut cfg = ScanConfig::default();
    merge_file_config(&mut cfg)?;

    cfg.retention.max_age_days =
        env_or_u32("SURFSCAN_MAX_FILE_AGE_DAYS", cfg.retention.max_age_days);
    cfg.ledger.timezone = env_or_string("SURFSCAN_TIMEZONE", &cfg.ledger.timezone);
    cfg.logging.level = env_or_string("SURFSCAN_LOG_LEVEL", &cfg.logging.level);

    validate(&cfg)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::{PartitionZone, ScanConfig, merge_toml, validate};
    use chrono::{NaiveDate, TimeZone, Utc};

    #[test]
    fn defaults_are_valid() {
        let cfg = ScanConfig::default();
        validate(&cfg).expect("defaults validate");
        assert_eq!(cfg.retention.max_age_days, 30);
        assert_eq!(cfg.partition_zone().expect("zone"), PartitionZone::Local);
    }

    #[test]
    fn toml_sections_replace_defaults() {
        let mut cfg = ScanConfig::default();
        merge_toml(
            &mut cfg,
            "[retention]\nmax_age_days = 7\n\n[ledger]\ntimezone = \"Asia/Tokyo\"\n",
        )
        .expect("merge");
        assert_eq!(cfg.retention.max_age_days, 7);
        assert_eq!(cfg.ledger.timezone, "Asia/Tokyo");
        assert_eq!(cfg.logging.level, "info");
        validate(&cfg).expect("valid");
    }

    #[test]
    fn zero_retention_is_rejected() {
        let mut cfg = ScanConfig::default();
        cfg.retention.max_age_days = 0;
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn unknown_zone_and_level_are_rejected() {
        let mut cfg = ScanConfig::default();
        cfg.ledger.timezone = "Mars/Olympus".to_string();
        assert!(validate(&cfg).is_err());

        let mut cfg = ScanConfig::default();
        cfg.logging.level = "loud".to_string();
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn named_zone_shifts_the_partition_day() {
        let at = Utc.with_ymd_and_hms(2025, 10, 9, 23, 30, 0).unwrap();
        let tokyo = PartitionZone::parse("Asia/Tokyo").expect("zone");
        assert_eq!(tokyo.date_of(at), NaiveDate::from_ymd_opt(2025, 10, 10).unwrap());
        assert_eq!(
            PartitionZone::Utc.date_of(at),
            NaiveDate::from_ymd_opt(2025, 10, 9).unwrap()
        );
        assert!(tokyo.timestamp(at).ends_with("+09:00"));
    }
}
