use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::AppError;
use crate::exploration::catalog::SchoolBand;
use crate::exploration::engine::CareerExplorationEngine;

/// Shared application state injected into all route handlers via Axum extractors.
/// One engine per school band, each with its own catalog and session store.
#[derive(Clone)]
pub struct AppState {
    pub engines: Arc<HashMap<SchoolBand, Arc<CareerExplorationEngine>>>,
}

impl AppState {
    /// Resolves the band path segment to its engine.
    pub fn engine(&self, band: &str) -> Result<Arc<CareerExplorationEngine>, AppError> {
        let band = SchoolBand::parse(band)
            .ok_or_else(|| AppError::NotFound(format!("Unknown school band '{band}'")))?;
        self.engines
            .get(&band)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("No engine for band '{}'", band.as_str())))
    }
}
