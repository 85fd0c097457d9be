use crate::error::AppError;
use crate::services::ingest;
use crate::services::table::Table;
use parking_lot::RwLock;
use polars::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// Holds one table per upload, keyed by an opaque id the client passes back
/// in the visualize form. A normalized CSV snapshot per upload lives in the
/// upload dir so chart requests survive a map miss (e.g. process restart);
/// the raw upload is kept alongside for inspection.
pub struct DatasetStore {
    upload_dir: PathBuf,
    datasets: RwLock<HashMap<Uuid, Arc<Table>>>,
}

impl DatasetStore {
    pub fn new(upload_dir: &Path) -> std::io::Result<Self> {
        fs::create_dir_all(upload_dir)?;
        Ok(Self {
            upload_dir: upload_dir.to_path_buf(),
            datasets: RwLock::new(HashMap::new()),
        })
    }

    pub fn insert(&self, original_name: &str, raw: &[u8], table: Table) -> Result<Uuid, AppError> {
        let id = Uuid::new_v4();

        fs::write(self.raw_path(id), raw)?;

        let snapshot = self.snapshot_path(id);
        let mut df = table.dataframe().clone();
        let mut file = fs::File::create(&snapshot)?;
        CsvWriter::new(&mut file)
            .finish(&mut df)
            .map_err(|e| AppError::Internal(format!("Failed to write snapshot: {}", e)))?;

        self.datasets.write().insert(id, Arc::new(table));
        tracing::info!("stored dataset {} from upload {:?}", id, original_name);
        Ok(id)
    }

    pub fn get(&self, id: Uuid) -> Result<Arc<Table>, AppError> {
        if let Some(table) = self.datasets.read().get(&id) {
            return Ok(Arc::clone(table));
        }

        let snapshot = self.snapshot_path(id);
        if !snapshot.exists() {
            return Err(AppError::UnknownDataset(id.to_string()));
        }
        tracing::info!("reloading dataset {} from snapshot", id);
        let table = Arc::new(ingest::read_csv_path(&snapshot)?);
        self.datasets.write().insert(id, Arc::clone(&table));
        Ok(table)
    }

    fn snapshot_path(&self, id: Uuid) -> PathBuf {
        self.upload_dir.join(format!("{}.csv", id))
    }

    fn raw_path(&self, id: Uuid) -> PathBuf {
        self.upload_dir.join(format!("{}.upload", id))
    }
}
