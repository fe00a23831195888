//! Portfolio store: sled-backed key → JSON records.
//!
//! One sled handle per process. [`PortfolioStore::shared`] opens it on first use
//! and hands back the same instance afterwards.

use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::VitaeResult;
use crate::portfolio::PortfolioRecord;

pub const DEFAULT_STORE_PATH: &str = "./data/portfolios";
const PORTFOLIO_PREFIX: &str = "portfolio:";

static SHARED_STORE: OnceCell<PortfolioStore> = OnceCell::new();

/// Key → JSON store for portfolio records.
#[derive(Clone)]
pub struct PortfolioStore {
    db: sled::Db,
}

impl PortfolioStore {
    /// Open a store at `path` (or the default path).
    pub fn open(path: Option<impl AsRef<Path>>) -> VitaeResult<Self> {
        let p: PathBuf = path
            .map(|x| x.as_ref().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_PATH));
        let db = sled::open(&p)?;
        tracing::info!(path = %p.display(), "[VITAE] Portfolio store opened");
        Ok(Self { db })
    }

    /// Process-wide store: connect once, reuse afterwards. `path` only matters on the first call.
    pub fn shared(path: Option<impl AsRef<Path>>) -> VitaeResult<&'static PortfolioStore> {
        SHARED_STORE.get_or_try_init(|| Self::open(path))
    }

    /// Insert and wait for the write to reach disk without blocking the runtime thread.
    pub async fn put_json<T: Serialize>(&self, key: &str, value: &T) -> VitaeResult<()> {
        let bytes = serde_json::to_vec(value)?;
        self.db.insert(key.as_bytes(), bytes)?;
        self.db.flush_async().await?;
        Ok(())
    }

    /// `Ok(None)` for a missing key. A value that no longer parses is logged and treated as missing.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> VitaeResult<Option<T>> {
        let Some(bytes) = self.db.get(key.as_bytes())? else {
            return Ok(None);
        };
        match serde_json::from_slice(&bytes) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::error!(key, error = %e, "[VITAE] Failed to parse stored record");
                Ok(None)
            }
        }
    }

    pub async fn save_portfolio(&self, record: &PortfolioRecord) -> VitaeResult<()> {
        self.put_json(&portfolio_key(&record.slug), record).await
    }

    pub fn get_portfolio(&self, slug: &str) -> VitaeResult<Option<PortfolioRecord>> {
        self.get_json(&portfolio_key(slug))
    }
}

fn portfolio_key(slug: &str) -> String {
    format!("{}{}", PORTFOLIO_PREFIX, slug)
}
