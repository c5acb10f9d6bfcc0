pub mod analysis;
pub mod domain;
pub mod ingest;
pub mod llm;
pub mod notify;
pub mod pipeline;
pub mod storage;
pub mod time;

pub mod config {
    use anyhow::Context;
    use std::path::PathBuf;

    const DEFAULT_TICKER_DB_PATH: &str = "ticker_db.json";
    const DEFAULT_USER_INFO_PATH: &str = "user_information.json";
    const DEFAULT_POSITIONS_DIR: &str = "pending_positions";

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub llm_provider: Option<String>,
        pub openai_api_key: Option<String>,
        pub anthropic_api_key: Option<String>,
        pub alpha_vantage_api_key: Option<String>,
        pub bing_search_key: Option<String>,
        pub smtp_host: Option<String>,
        pub smtp_username: Option<String>,
        pub smtp_password: Option<String>,
        pub sender_email: Option<String>,
        pub receiver_email: Option<String>,
        pub admin_name: Option<String>,
        pub admin_password: Option<String>,
        pub database_url: Option<String>,
        pub sentry_dsn: Option<String>,
        pub ticker_db_path: PathBuf,
        pub user_info_path: PathBuf,
        pub positions_dir: PathBuf,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                llm_provider: std::env::var("LLM_PROVIDER").ok(),
                openai_api_key: std::env::var("OPENAI_API_KEY").ok(),
                anthropic_api_key: std::env::var("ANTHROPIC_API_KEY").ok(),
                alpha_vantage_api_key: std::env::var("ALPHA_VANTAGE_API_KEY").ok(),
                bing_search_key: std::env::var("BING_SEARCH_KEY").ok(),
                smtp_host: std::env::var("SMTP_HOST").ok(),
                smtp_username: std::env::var("SMTP_USERNAME").ok(),
                smtp_password: std::env::var("SMTP_PASSWORD").ok(),
                sender_email: std::env::var("SENDER_EMAIL").ok(),
                receiver_email: std::env::var("RECEIVER_EMAIL").ok(),
                admin_name: std::env::var("ADMIN_NAME").ok(),
                admin_password: std::env::var("ADMIN_PASSWORD").ok(),
                database_url: std::env::var("DATABASE_URL").ok(),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
                ticker_db_path: path_var("TICKER_DB_PATH", DEFAULT_TICKER_DB_PATH),
                user_info_path: path_var("USER_INFO_PATH", DEFAULT_USER_INFO_PATH),
                positions_dir: path_var("POSITIONS_DIR", DEFAULT_POSITIONS_DIR),
            })
        }

        pub fn require_database_url(&self) -> anyhow::Result<&str> {
            self.database_url
                .as_deref()
                .context("DATABASE_URL is required")
        }

        pub fn require_openai_api_key(&self) -> anyhow::Result<&str> {
            self.openai_api_key
                .as_deref()
                .context("OPENAI_API_KEY is required")
        }

        pub fn require_anthropic_api_key(&self) -> anyhow::Result<&str> {
            self.anthropic_api_key
                .as_deref()
                .context("ANTHROPIC_API_KEY is required")
        }

        pub fn require_alpha_vantage_api_key(&self) -> anyhow::Result<&str> {
            self.alpha_vantage_api_key
                .as_deref()
                .context("ALPHA_VANTAGE_API_KEY is required")
        }

        pub fn require_bing_search_key(&self) -> anyhow::Result<&str> {
            self.bing_search_key
                .as_deref()
                .context("BING_SEARCH_KEY is required")
        }

        pub fn require_smtp_host(&self) -> anyhow::Result<&str> {
            self.smtp_host.as_deref().context("SMTP_HOST is required")
        }

        pub fn require_sender_email(&self) -> anyhow::Result<&str> {
            self.sender_email
                .as_deref()
                .context("SENDER_EMAIL is required")
        }

        pub fn require_receiver_email(&self) -> anyhow::Result<&str> {
            self.receiver_email
                .as_deref()
                .context("RECEIVER_EMAIL is required")
        }

        /// Admin identity for the interactive variant: `(name, password)`.
        pub fn require_admin(&self) -> anyhow::Result<(&str, &str)> {
            let name = self.admin_name.as_deref().context("ADMIN_NAME is required")?;
            let password = self
                .admin_password
                .as_deref()
                .context("ADMIN_PASSWORD is required")?;
            Ok((name, password))
        }
    }

    fn path_var(key: &str, default: &str) -> PathBuf {
        std::env::var(key)
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(default))
    }
}
