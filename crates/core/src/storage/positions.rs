use crate::domain::position::UserPosition;
use anyhow::Context;
use std::path::{Path, PathBuf};

#[async_trait::async_trait]
pub trait PositionStore: Send + Sync {
    /// Current holding for `ticker`, writing the default record on first access.
    async fn load_or_init(&self, ticker: &str) -> anyhow::Result<UserPosition>;
}

/// One `<TICKER>.json` file per ticker in a directory.
#[derive(Debug, Clone)]
pub struct JsonFilePositionStore {
    dir: PathBuf,
}

impl JsonFilePositionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, ticker: &str) -> PathBuf {
        self.dir.join(format!("{ticker}.json"))
    }

    fn write_default(&self, path: &Path) -> anyhow::Result<UserPosition> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create positions dir {}", self.dir.display()))?;
        let position = UserPosition::default();
        let body = serde_json::to_string(&position).context("failed to encode position")?;
        std::fs::write(path, body)
            .with_context(|| format!("failed to write position {}", path.display()))?;
        Ok(position)
    }
}

#[async_trait::async_trait]
impl PositionStore for JsonFilePositionStore {
    async fn load_or_init(&self, ticker: &str) -> anyhow::Result<UserPosition> {
        let path = self.path_for(ticker);
        match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw)
                .with_context(|| format!("failed to parse position {}", path.display())),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(ticker, path = %path.display(), "no position on file; initialising");
                self.write_default(&path)
            }
            Err(err) => {
                Err(err).with_context(|| format!("failed to read position {}", path.display()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position::PositionKind;

    #[tokio::test]
    async fn default_record_round_trips_without_reinit() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFilePositionStore::new(dir.path().join("pending_positions"));

        let first = store.load_or_init("AAPL").await.unwrap();
        assert_eq!(first, UserPosition::default());
        assert_eq!(first.amount, "0");
        assert_eq!(first.position_kind, PositionKind::None);

        let path = store.path_for("AAPL");
        let written = std::fs::read_to_string(&path).unwrap();
        let modified = std::fs::metadata(&path).unwrap().modified().unwrap();

        let second = store.load_or_init("AAPL").await.unwrap();
        assert_eq!(second, first);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), written);
        assert_eq!(std::fs::metadata(&path).unwrap().modified().unwrap(), modified);
    }

    #[tokio::test]
    async fn reads_existing_legacy_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFilePositionStore::new(dir.path());
        std::fs::write(store.path_for("NVDA"), r#"{"amount": "300", "buy_type": "short"}"#).unwrap();

        let pos = store.load_or_init("NVDA").await.unwrap();
        assert_eq!(pos.amount, "300");
        assert_eq!(pos.position_kind, PositionKind::Short);
    }

    #[tokio::test]
    async fn corrupt_record_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFilePositionStore::new(dir.path());
        std::fs::write(store.path_for("TSLA"), "not json").unwrap();
        assert!(store.load_or_init("TSLA").await.is_err());
    }
}
