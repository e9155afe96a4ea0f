// Layered settings: defaults, then an optional config file, then APP_* environment variables.

use anyhow::{Result, ensure};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_LIST_PATH: &str =
    "/system/modules/com.thesys.project.taf/pages/ajax/cbaclicent-list-process.jsp";
pub const DEFAULT_DETAIL_PATH: &str =
    "/system/modules/com.thesys.project.taf/pages/ajax/cbaclicent-detail-process.jsp";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server_address: String,
    pub output_dir: String,
    pub source: SourceSettings,
    pub query: QuerySettings,
    pub pacing: PacingSettings,
}

/// Where the two endpoints live and how to present ourselves to them.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceSettings {
    pub base_url: String,
    pub list_path: String,
    pub detail_path: String,
    pub user_agent: String,
    /// Raw `Cookie` header value for an already authenticated session.
    pub session_cookie: Option<String>,
    pub proxy_url: Option<String>,
}

/// Filters sent to the list endpoint.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct QuerySettings {
    pub acc_id: String,
    pub code1: String,
    pub code2: String,
    pub cust_name: String,
    pub lang: String,
    pub page_size: u32,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct PacingSettings {
    pub page_delay_ms: u64,
    pub detail_concurrency: usize,
    pub detail_delay_ms: u64,
}

impl PacingSettings {
    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    pub fn detail_delay(&self) -> Duration {
        Duration::from_millis(self.detail_delay_ms)
    }
}

impl Settings {
    /// Loads settings from `config.*` in the working directory (or `config_file`)
    /// and the environment. `APP_QUERY__ACC_ID=XYZ` overrides `query.acc_id`.
    pub fn load(config_file: Option<&str>) -> Result<Self> {
        dotenv::dotenv().ok(); // Load .env file if present

        let builder = Self::with_defaults()?
            .add_source(File::with_name(config_file.unwrap_or("config")).required(config_file.is_some()))
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            );

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn with_defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        Ok(Config::builder()
            .set_default("server_address", "127.0.0.1:3000")?
            .set_default("output_dir", "Results")?
            .set_default("source.base_url", "https://www.taftw.org.tw")?
            .set_default("source.list_path", DEFAULT_LIST_PATH)?
            .set_default("source.detail_path", DEFAULT_DETAIL_PATH)?
            .set_default("source.user_agent", DEFAULT_USER_AGENT)?
            .set_default("query.acc_id", "CBA_MS_ID")?
            .set_default("query.code1", "05")?
            .set_default("query.code2", "01")?
            .set_default("query.cust_name", "")?
            .set_default("query.lang", "zh_TW")?
            .set_default("query.page_size", 50)?
            .set_default("pacing.page_delay_ms", 250)?
            .set_default("pacing.detail_concurrency", 8)?
            .set_default("pacing.detail_delay_ms", 100)?)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.source.base_url.starts_with("http://") || self.source.base_url.starts_with("https://"),
            "source.base_url must be an http(s) URL, got '{}'",
            self.source.base_url
        );
        self.query.validate()?;
        ensure!(self.pacing.detail_concurrency > 0, "pacing.detail_concurrency must be at least 1");
        Ok(())
    }
}

impl QuerySettings {
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.acc_id.is_empty(), "query.acc_id must not be empty");
        ensure!(!self.lang.is_empty(), "query.lang must not be empty");
        ensure!(self.page_size > 0, "query.page_size must be at least 1");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> Settings {
        Settings::with_defaults()
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn defaults_match_the_published_query() {
        let settings = defaults();
        assert_eq!(settings.query.acc_id, "CBA_MS_ID");
        assert_eq!(settings.query.code1, "05");
        assert_eq!(settings.query.code2, "01");
        assert_eq!(settings.query.lang, "zh_TW");
        assert_eq!(settings.query.page_size, 50);
        assert_eq!(settings.pacing.page_delay(), Duration::from_millis(250));
        assert_eq!(settings.pacing.detail_concurrency, 8);
        assert_eq!(settings.pacing.detail_delay(), Duration::from_millis(100));
        assert!(settings.source.session_cookie.is_none());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn overrides_replace_defaults() {
        let settings: Settings = Settings::with_defaults()
            .unwrap()
            .set_override("query.page_size", 10)
            .unwrap()
            .set_override("source.session_cookie", "JSESSIONID=abc")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.query.page_size, 10);
        assert_eq!(settings.source.session_cookie.as_deref(), Some("JSESSIONID=abc"));
    }

    #[test]
    fn validation_rejects_unusable_values() {
        let mut settings = defaults();
        settings.query.page_size = 0;
        assert!(settings.validate().is_err());

        let mut settings = defaults();
        settings.pacing.detail_concurrency = 0;
        assert!(settings.validate().is_err());

        let mut settings = defaults();
        settings.source.base_url = "ftp://example.test".into();
        assert!(settings.validate().is_err());
    }
}
