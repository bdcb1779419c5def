//! Engine configuration, loaded once at startup and passed by reference into the
//! engine. Every field has a default so an empty (or missing) TOML file works.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ConfigError;
use crate::patterns::{default_patterns, PatternCatalog, PatternDefinition};

pub const CONFIG_ENV_VAR: &str = "PODCLIP_CONFIG";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub discovery: DiscoveryConfig,
    pub filter: FilterConfig,
    pub grouping: GroupingConfig,
    pub selection: SelectionConfig,
    pub rating: PassConfig,
    pub polish: PassConfig,
    pub provider: ProviderConfig,
    pub channels: Vec<ChannelEntry>,
    pub tiers: HashMap<String, TierPolicy>,
    /// Replaces the built-in pattern catalog when non-empty.
    pub patterns: Vec<PatternDefinition>,
    pub extracted_pattern_weight: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryMode {
    /// One prompt per overlapping window, sequentially.
    Scan,
    /// One prompt for the whole (sampled) transcript.
    SinglePass,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub mode: DiscoveryMode,
    pub window_secs: f64,
    pub overlap_secs: f64,
    pub window_prompt_chars: usize,
    pub single_pass_prompt_chars: usize,
    pub fallback_prompt_chars: usize,
    /// Matches starting before this are dropped, in single-pass mode only.
    pub intro_skip_secs: f64,
    pub default_clip_secs: f64,
    pub max_attempts: u32,
    pub timeout_secs: u64,
    pub retry_backoff_ms: u64,
    pub inter_window_delay_ms: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            mode: DiscoveryMode::Scan,
            window_secs: 120.0,
            overlap_secs: 30.0,
            window_prompt_chars: 4_000,
            single_pass_prompt_chars: 15_000,
            fallback_prompt_chars: 10_000,
            intro_skip_secs: 30.0,
            default_clip_secs: 45.0,
            max_attempts: 2,
            timeout_secs: 120,
            retry_backoff_ms: 500,
            inter_window_delay_ms: 200,
        }
    }
}

impl DiscoveryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DurationBand {
    pub min_secs: f64,
    pub max_secs: f64,
}

impl DurationBand {
    pub fn contains(&self, duration: f64) -> bool {
        duration >= self.min_secs && duration <= self.max_secs
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub bad_openers: Vec<String>,
    pub jargon_terms: Vec<String>,
    pub jargon_threshold: usize,
    pub jargon_window_words: usize,
    pub min_quotable_chars: usize,
    pub scan_duration: DurationBand,
    pub single_pass_duration: DurationBand,
}

impl Default for FilterConfig {
    fn default() -> Self {
        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
        Self {
            bad_openers: strings(&[
                "but ", "so ", "and ", "or ",
                "what we ", "what i ",
                "i mean ", "you know ",
                "like i said", "as i mentioned",
                "going back to", "to your point",
                "um ", "uh ", "yeah ",
                "right so", "okay so",
            ]),
            jargon_terms: strings(&[
                "term structure", "yield curve", "liquidity provision",
                "collateralization ratio", "utilization rate",
                "impermanent loss", "slippage tolerance",
                "rebalancing mechanism", "arbitrage opportunity",
                "cross-margining", "delta neutral",
            ]),
            jargon_threshold: 3,
            jargon_window_words: 50,
            min_quotable_chars: 20,
            scan_duration: DurationBand { min_secs: 15.0, max_secs: 90.0 },
            single_pass_duration: DurationBand { min_secs: 25.0, max_secs: 120.0 },
        }
    }
}

impl FilterConfig {
    pub fn duration_band(&self, mode: DiscoveryMode) -> DurationBand {
        match mode {
            DiscoveryMode::Scan => self.scan_duration,
            DiscoveryMode::SinglePass => self.single_pass_duration,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupingConfig {
    pub merge_gap_secs: f64,
    pub multi_pattern_bonus: f64,
    pub short_bonus_secs: f64,
    pub short_bonus: f64,
    pub very_short_bonus_secs: f64,
    pub very_short_bonus: f64,
    pub numeric_bonus: f64,
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self {
            merge_gap_secs: 30.0,
            multi_pattern_bonus: 1.2,
            short_bonus_secs: 45.0,
            short_bonus: 1.1,
            very_short_bonus_secs: 30.0,
            very_short_bonus: 1.2,
            numeric_bonus: 1.05,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub min_gap_secs: f64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self { min_gap_secs: 300.0 }
    }
}

/// Settings for an optional per-candidate model pass (rating or polishing).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PassConfig {
    pub enabled: bool,
    pub max_concurrency: usize,
    pub timeout_secs: u64,
}

impl Default for PassConfig {
    fn default() -> Self {
        Self { enabled: false, max_concurrency: 4, timeout_secs: 60 }
    }
}

impl PassConfig {
    pub fn enabled() -> Self {
        Self { enabled: true, ..Self::default() }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub kind: String,
    pub model: Option<String>,
    pub base_url: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self { kind: "ollama".to_string(), model: None, base_url: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelEntry {
    pub name: String,
    #[serde(default, alias = "youtube_handle")]
    pub handle: Option<String>,
    #[serde(default = "default_tier")]
    pub tier: String,
    #[serde(default)]
    pub notes: Option<String>,
}

pub const DEFAULT_TIER: &str = "B";

fn default_tier() -> String {
    DEFAULT_TIER.to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierPolicy {
    #[serde(alias = "max_clips_per_video")]
    pub max_clips_per_source: usize,
    #[serde(default)]
    pub min_score_threshold: f64,
    #[serde(default = "default_priority")]
    pub priority_weight: f64,
}

fn default_priority() -> f64 {
    1.0
}

/// Tier "B": the policy for sources nobody configured.
impl Default for TierPolicy {
    fn default() -> Self {
        TierPolicy { max_clips_per_source: 2, min_score_threshold: 0.0, priority_weight: 1.0 }
    }
}

impl TierPolicy {
    pub fn builtin(tier: &str) -> Option<TierPolicy> {
        match tier {
            "A" => Some(TierPolicy { max_clips_per_source: 3, min_score_threshold: 0.0, priority_weight: 1.5 }),
            "B" => Some(TierPolicy::default()),
            "C" => Some(TierPolicy { max_clips_per_source: 1, min_score_threshold: 2.0, priority_weight: 0.5 }),
            _ => None,
        }
    }
}

impl EngineConfig {
    /// Load configuration: explicit path, then `PODCLIP_CONFIG`, then the user
    /// config dir (`~/.config/podclip/config.toml` on Linux), then defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.trim().is_empty() {
                return Self::from_file(Path::new(path.trim()));
            }
        }

        if let Some(path) = default_config_path() {
            if path.exists() {
                return Self::from_file(&path);
            }
            debug!("No config file at {}, using defaults", path.display());
        }

        Ok(Self::default())
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        let config = Self::from_toml_str(&contents)?;
        info!("Loaded config from {} ({} channels, {} tier overrides)",
            path.display(), config.channels.len(), config.tiers.len());
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let d = &self.discovery;
        if d.window_secs <= 0.0 {
            return Err(ConfigError::Invalid("discovery.window_secs must be positive".to_string()));
        }
        if d.overlap_secs < 0.0 || d.overlap_secs >= d.window_secs {
            return Err(ConfigError::Invalid("discovery.overlap_secs must be in [0, window_secs)".to_string()));
        }
        if d.max_attempts == 0 {
            return Err(ConfigError::Invalid("discovery.max_attempts must be at least 1".to_string()));
        }
        for (name, band) in [("scan_duration", self.filter.scan_duration), ("single_pass_duration", self.filter.single_pass_duration)] {
            if band.min_secs < 0.0 || band.max_secs < band.min_secs {
                return Err(ConfigError::Invalid(format!("filter.{} has an empty band", name)));
            }
        }
        for (tier, policy) in &self.tiers {
            if policy.min_score_threshold < 0.0 {
                return Err(ConfigError::Invalid(format!("tiers.{}.min_score_threshold is negative", tier)));
            }
        }
        if self.patterns.iter().any(|p| p.weight < 0.0) {
            return Err(ConfigError::Invalid("pattern weights must be non-negative".to_string()));
        }
        Ok(())
    }

    /// Build the pattern catalog this configuration describes.
    pub fn pattern_catalog(&self) -> PatternCatalog {
        let patterns = if self.patterns.is_empty() {
            default_patterns()
        } else {
            self.patterns.clone()
        };
        PatternCatalog::new(patterns, self.extracted_pattern_weight.unwrap_or(1.0))
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("podclip").join("config.toml"))
}
