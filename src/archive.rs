use tracing::warn;

use crate::database::BlobStore;
use crate::errors::LottoResult;
use crate::types::DrawArchive;

/// Key the whole archive document is stored under.
pub const ARCHIVE_KEY: &str = "draws_json";

/// Load/save of the draw archive as one JSON document in a blob store.
pub struct DrawArchiveStore<B> {
    blob: B,
}

impl<B: BlobStore> DrawArchiveStore<B> {
    pub fn new(blob: B) -> Self {
        Self { blob }
    }

    /// Never fails: a missing, unreadable or unparsable blob yields an empty
    /// archive so a corrupt cache can always be rebuilt by syncing.
    pub fn load(&self) -> DrawArchive {
        let raw = match self.blob.get(ARCHIVE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return DrawArchive::new(),
            Err(e) => {
                warn!("could not read draw archive, starting empty: {}", e);
                return DrawArchive::new();
            }
        };

        let archive = match serde_json::from_str::<DrawArchive>(&raw) {
            Ok(archive) => archive,
            Err(e) => {
                warn!("stored draw archive is corrupt, starting empty: {}", e);
                return DrawArchive::new();
            }
        };

        if let Err(reason) = archive.check_integrity() {
            warn!("stored draw archive is inconsistent, starting empty: {}", reason);
            return DrawArchive::new();
        }
        archive
    }

    /// Serialize the full archive and replace the stored blob.
    pub fn save(&self, archive: &DrawArchive) -> LottoResult<()> {
        let raw = serde_json::to_string(archive)?;
        self.blob.set(ARCHIVE_KEY, &raw)
    }
}
