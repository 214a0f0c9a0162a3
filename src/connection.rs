use anyhow::{Context, Result};
use std::path::Path;

use lotto_lib::SqliteBlobStore;

pub fn blob_store(database_path: &Path) -> Result<SqliteBlobStore> {
    SqliteBlobStore::open(database_path)
        .with_context(|| format!("could not open archive database at {}", database_path.display()))
}
