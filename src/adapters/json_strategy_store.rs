//! JSON file strategy store: one object mapping id -> saved strategy.

use crate::domain::error::TrendgridError;
use crate::domain::strategy::SavedStrategy;
use crate::ports::strategy_store_port::StrategyStore;
use log::debug;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

type StrategyMap = BTreeMap<String, SavedStrategy>;

pub struct JsonStrategyStore {
    path: PathBuf,
}

impl JsonStrategyStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn load(&self) -> Result<StrategyMap, TrendgridError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(StrategyMap::new()),
            Err(e) => {
                return Err(TrendgridError::Store {
                    reason: format!("failed to read {}: {}", self.path.display(), e),
                });
            }
        };
        if content.trim().is_empty() {
            return Ok(StrategyMap::new());
        }
        serde_json::from_str(&content).map_err(|e| TrendgridError::Store {
            reason: format!("corrupt store {}: {}", self.path.display(), e),
        })
    }

    fn persist(&self, strategies: &StrategyMap) -> Result<(), TrendgridError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| TrendgridError::Store {
                reason: format!("failed to create {}: {}", parent.display(), e),
            })?;
        }
        let json = serde_json::to_string_pretty(strategies)?;
        fs::write(&self.path, json).map_err(|e| TrendgridError::Store {
            reason: format!("failed to write {}: {}", self.path.display(), e),
        })
    }
}

impl StrategyStore for JsonStrategyStore {
    fn list(&self) -> Result<Vec<SavedStrategy>, TrendgridError> {
        let mut strategies: Vec<SavedStrategy> = self.load()?.into_values().collect();
        strategies.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(strategies)
    }

    fn save(&self, strategy: &SavedStrategy) -> Result<String, TrendgridError> {
        let mut strategies = self.load()?;
        if strategies.insert(strategy.id.clone(), strategy.clone()).is_some() {
            debug!("overwriting saved strategy {}", strategy.id);
        }
        self.persist(&strategies)?;
        Ok(strategy.id.clone())
    }

    fn delete(&self, id: &str) -> Result<(), TrendgridError> {
        let mut strategies = self.load()?;
        if strategies.remove(id).is_none() {
            return Err(TrendgridError::StrategyNotFound { id: id.to_string() });
        }
        self.persist(&strategies)
    }
}
