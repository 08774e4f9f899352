//! TOML configuration loading and validation.

use std::path::{Path, PathBuf};

use pinwheel::Goal;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Allocation file used when neither the config nor the command names one
/// and no `<investor>_allocation.json` exists.
pub const FALLBACK_ALLOCATION: &str = "pinwheel_allocation.json";

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub investor: InvestorConfig,
    pub goal: GoalConfig,
    #[serde(default)]
    pub files: FilesConfig,
    #[serde(default)]
    pub prices: PricesConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Directory the config was loaded from; default allocation lookup happens here.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InvestorConfig {
    pub name: String,
    #[serde(default)]
    pub portfolio_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoalConfig {
    pub net_worth: f64,
    pub periods: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilesConfig {
    pub allocation: Option<PathBuf>,
    pub balance: Option<PathBuf>,
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PricesConfig {
    #[serde(default = "default_price_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_price_column")]
    pub column: String,
}

fn default_price_dir() -> PathBuf {
    PathBuf::from("./ticker_data")
}
fn default_price_column() -> String {
    "Adj Close".into()
}

impl Default for PricesConfig {
    fn default() -> Self {
        Self {
            dir: default_price_dir(),
            column: default_price_column(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_dir")]
    pub dir: String,
    #[serde(default = "default_audit_file")]
    pub audit_file: String,
}

fn default_log_dir() -> String {
    "./logs".into()
}
fn default_audit_file() -> String {
    "audit.jsonl".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            audit_file: default_audit_file(),
        }
    }
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut config: Config = toml::from_str(&contents)?;
        config.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        config.validate()?;
        Ok(config)
    }

    /// Validate config invariants.
    fn validate(&self) -> Result<()> {
        if self.investor.name.trim().is_empty() {
            return Err(Error::Config("investor name must not be empty".into()));
        }
        if !self.goal.net_worth.is_finite() || self.goal.net_worth <= 0.0 {
            return Err(Error::Config("goal net_worth must be finite and > 0".into()));
        }
        if self.goal.periods <= 0 {
            return Err(Error::Config("goal periods must be > 0".into()));
        }
        if self.prices.column.is_empty() {
            return Err(Error::Config("prices column must not be empty".into()));
        }
        Ok(())
    }

    pub fn goal(&self) -> Goal {
        Goal::new(self.goal.net_worth, self.goal.periods)
    }

    /// Portfolio display name, defaulting to "<investor>'s Portfolio".
    pub fn portfolio_name(&self) -> String {
        self.investor
            .portfolio_name
            .clone()
            .unwrap_or_else(|| format!("{}'s Portfolio", self.investor.name))
    }

    /// Interpret a configured path relative to the config's directory.
    pub fn resolve(&self, p: &Path) -> PathBuf {
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.base_dir.join(p)
        }
    }

    /// Allocation file: the configured one, else `<investor>_allocation.json`
    /// next to the config if present, else [`FALLBACK_ALLOCATION`] there.
    pub fn allocation_path(&self) -> PathBuf {
        match &self.files.allocation {
            Some(p) => self.resolve(p),
            None => default_allocation(&self.base_dir, &self.investor.name),
        }
    }

    pub fn balance_path(&self) -> Option<PathBuf> {
        self.files.balance.as_deref().map(|p| self.resolve(p))
    }

    pub fn output_path(&self) -> Option<PathBuf> {
        self.files.output.as_deref().map(|p| self.resolve(p))
    }

    pub fn price_dir(&self) -> PathBuf {
        self.resolve(&self.prices.dir)
    }

    /// Full path to the audit log file.
    pub fn audit_path(&self) -> PathBuf {
        self.resolve(Path::new(&self.logging.dir))
            .join(&self.logging.audit_file)
    }
}

/// `<dir>/<name>_allocation.json` when it is a file, otherwise the fallback.
pub fn default_allocation(dir: &Path, name: &str) -> PathBuf {
    let personal = dir.join(format!("{name}_allocation.json"));
    if personal.is_file() {
        personal
    } else {
        dir.join(FALLBACK_ALLOCATION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example_toml() -> &'static str {
        r#"
[investor]
name = "Sam"
portfolio_name = "My Portfolio"

[goal]
net_worth = 25000.0
periods = 12

[files]
allocation = "pinwheel_allocation.json"
balance = "balance.csv"
output = "goals.csv"

[prices]
dir = "./ticker_data"

[logging]
dir = "./logs"
audit_file = "audit.jsonl"
"#
    }

    #[test]
    fn parse_example_config() {
        let config: Config = toml::from_str(example_toml()).unwrap();
        assert_eq!(config.investor.name, "Sam");
        assert_eq!(config.goal.periods, 12);
        assert_eq!(config.goal(), Goal::new(25000.0, 12));
        assert_eq!(config.files.balance, Some(PathBuf::from("balance.csv")));
        assert_eq!(config.prices.column, "Adj Close");
        assert_eq!(config.portfolio_name(), "My Portfolio");
    }

    #[test]
    fn optional_sections_default() {
        let toml = "[investor]\nname = \"Sam\"\n[goal]\nnet_worth = 100.0\nperiods = 3\n";
        let config: Config = toml::from_str(toml).unwrap();
        assert!(config.files.allocation.is_none());
        assert_eq!(config.prices.dir, PathBuf::from("./ticker_data"));
        assert_eq!(config.logging.audit_file, "audit.jsonl");
        assert_eq!(config.portfolio_name(), "Sam's Portfolio");
    }

    #[test]
    fn validate_catches_bad_periods() {
        let mut config: Config = toml::from_str(example_toml()).unwrap();
        config.goal.periods = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_catches_bad_net_worth() {
        let mut config: Config = toml::from_str(example_toml()).unwrap();
        config.goal.net_worth = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_catches_empty_name() {
        let mut config: Config = toml::from_str(example_toml()).unwrap();
        config.investor.name = "  ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn audit_path() {
        let config: Config = toml::from_str(example_toml()).unwrap();
        assert_eq!(config.audit_path(), PathBuf::from("./logs/audit.jsonl"));
    }

    #[test]
    fn default_allocation_prefers_personal_file() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            default_allocation(dir.path(), "Sam"),
            dir.path().join(FALLBACK_ALLOCATION)
        );
        std::fs::write(dir.path().join("Sam_allocation.json"), "{}").unwrap();
        assert_eq!(
            default_allocation(dir.path(), "Sam"),
            dir.path().join("Sam_allocation.json")
        );
    }

    #[test]
    fn load_sets_base_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pinwheel.toml");
        let toml = "[investor]\nname = \"Sam\"\n[goal]\nnet_worth = 1.0\nperiods = 1\n";
        std::fs::write(&path, toml).unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.base_dir, dir.path());
        assert_eq!(config.allocation_path(), dir.path().join(FALLBACK_ALLOCATION));
    }

    #[test]
    fn relative_paths_resolve_against_config_dir() {
        let mut config: Config = toml::from_str(example_toml()).unwrap();
        config.base_dir = PathBuf::from("/home/sam/money");
        assert_eq!(
            config.balance_path(),
            Some(PathBuf::from("/home/sam/money/balance.csv"))
        );
        assert_eq!(
            config.output_path(),
            Some(PathBuf::from("/home/sam/money/goals.csv"))
        );
        assert_eq!(
            config.allocation_path(),
            PathBuf::from("/home/sam/money/pinwheel_allocation.json")
        );
        assert_eq!(config.price_dir(), PathBuf::from("/home/sam/money/ticker_data"));
        assert_eq!(
            config.audit_path(),
            PathBuf::from("/home/sam/money/logs/audit.jsonl")
        );
        assert_eq!(
            config.resolve(Path::new("/srv/balance.csv")),
            PathBuf::from("/srv/balance.csv")
        );
    }

    #[test]
    fn load_missing_file() {
        let err = Config::load(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, Error::ConfigRead { .. }));
    }
}
