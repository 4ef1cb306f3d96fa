//! Saved strategy persistence port trait.

use crate::domain::error::TrendgridError;
use crate::domain::strategy::SavedStrategy;

/// Key-value store of saved strategies keyed by `SavedStrategy::id`.
pub trait StrategyStore {
    /// Newest first by `created_at`.
    fn list(&self) -> Result<Vec<SavedStrategy>, TrendgridError>;

    /// Insert or overwrite; returns the id written.
    fn save(&self, strategy: &SavedStrategy) -> Result<String, TrendgridError>;

    fn delete(&self, id: &str) -> Result<(), TrendgridError>;
}
