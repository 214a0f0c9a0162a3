use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::api::{DrawSource, parse_draw_response, parse_snapshot};
use crate::archive::DrawArchiveStore;
use crate::database::BlobStore;
use crate::errors::{LottoError, LottoResult};
use crate::types::{DrawArchive, DrawLookup, ImportReport, SyncProgress, SyncReport};

pub const DEFAULT_MAX_PROBES: u32 = 5000;
pub const DEFAULT_CHECKPOINT_INTERVAL: u32 = 20;
pub const DEFAULT_CHECKPOINT_PAUSE: Duration = Duration::from_millis(50);

#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Upper bound on requests issued by a single sync.
    pub max_probes: u32,
    /// Appended draws between intermediate saves.
    pub checkpoint_interval: u32,
    /// Pause after each intermediate save; zero just yields.
    pub checkpoint_pause: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_probes: DEFAULT_MAX_PROBES,
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
            checkpoint_pause: DEFAULT_CHECKPOINT_PAUSE,
        }
    }
}

/// Releases the single-flight flag when dropped.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> LottoResult<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| LottoError::SyncInProgress)?;
        Ok(Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Working state of one sync call.
struct Progress {
    archive: DrawArchive,
    cursor: u32,
    added: u32,
    unsaved: u32,
}

/// Extends the stored archive by probing the source one draw number at a time.
///
/// Only one sync (or snapshot import) may run per engine; an overlapping call
/// fails with [`LottoError::SyncInProgress`]. Two engines over the same blob
/// store are not coordinated.
pub struct SyncEngine<S, B> {
    source: S,
    store: DrawArchiveStore<B>,
    config: SyncConfig,
    running: AtomicBool,
}

impl<S: DrawSource, B: BlobStore> SyncEngine<S, B> {
    pub fn new(source: S, store: DrawArchiveStore<B>, config: SyncConfig) -> Self {
        Self {
            source,
            store,
            config,
            running: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> &DrawArchiveStore<B> {
        &self.store
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub async fn sync(&self) -> LottoResult<SyncReport> {
        self.sync_with_progress(|_| {}).await
    }

    /// Run a sync, calling `on_progress` after every checkpoint and once at completion.
    pub async fn sync_with_progress<F>(&self, mut on_progress: F) -> LottoResult<SyncReport>
    where
        F: FnMut(&SyncProgress),
    {
        let _guard = InFlight::acquire(&self.running)?;

        let archive = self.store.load();
        let cursor = archive.latest_draw_number();
        info!("🔄 Starting draw sync after draw {}", cursor);

        let mut progress = Progress {
            archive,
            cursor,
            added: 0,
            unsaved: 0,
        };

        if let Err(e) = self.probe_until_exhausted(&mut progress, &mut on_progress).await {
            warn!(
                "sync aborted after {} new draws (latest {}): {}",
                progress.added, progress.cursor, e
            );
            if progress.unsaved > 0 {
                if let Err(save_err) = self.store.save(&progress.archive) {
                    warn!("could not persist draws appended before the failure: {}", save_err);
                }
            }
            return Err(e);
        }

        if progress.unsaved > 0 {
            self.store.save(&progress.archive)?;
        }

        let report = SyncReport {
            latest_draw_number: progress.cursor,
            added: progress.added,
        };
        on_progress(&SyncProgress {
            latest_draw_number: report.latest_draw_number,
            added: report.added,
            message: format!(
                "Sync complete: latest draw {} ({} new)",
                report.latest_draw_number, report.added
            ),
        });
        info!(
            "✅ Sync complete: latest draw {}, {} new",
            report.latest_draw_number, report.added
        );
        Ok(report)
    }

    async fn probe_until_exhausted<F>(&self, progress: &mut Progress, on_progress: &mut F) -> LottoResult<()>
    where
        F: FnMut(&SyncProgress),
    {
        for _ in 0..self.config.max_probes {
            let next = progress.cursor.checked_add(1).ok_or_else(|| {
                LottoError::Persistence(format!("draw {} is the last representable draw number", progress.cursor))
            })?;
            let body = self.source.fetch_draw(next).await?;

            let draw = match parse_draw_response(&body)? {
                DrawLookup::NotFound => {
                    debug!("draw {} not available yet, source exhausted", next);
                    return Ok(());
                }
                DrawLookup::Found(draw) => draw,
            };

            if draw.draw_number != next {
                return Err(LottoError::contract(
                    format!("requested draw {} but received draw {}", next, draw.draw_number),
                    &body,
                ));
            }

            progress.archive.push(draw);
            progress.cursor = next;
            progress.added += 1;
            progress.unsaved += 1;

            if progress.added % self.config.checkpoint_interval.max(1) == 0 {
                self.checkpoint(progress, on_progress).await?;
            }
        }

        Err(LottoError::ProbeLimitExceeded {
            limit: self.config.max_probes,
        })
    }

    async fn checkpoint<F>(&self, progress: &mut Progress, on_progress: &mut F) -> LottoResult<()>
    where
        F: FnMut(&SyncProgress),
    {
        self.store.save(&progress.archive)?;
        progress.unsaved = 0;

        let message = format!(
            "Syncing... saved {} new draws (latest draw {})",
            progress.added, progress.cursor
        );
        info!("{}", message);
        on_progress(&SyncProgress {
            latest_draw_number: progress.cursor,
            added: progress.added,
            message,
        });

        if self.config.checkpoint_pause.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.config.checkpoint_pause).await;
        }
        Ok(())
    }

    /// Append the draws of a `draws.json` snapshot that continue the stored run.
    ///
    /// Draws at or below the current tail are skipped; merging stops at the
    /// first gap so the archive stays contiguous.
    pub fn import_snapshot(&self, body: &str) -> LottoResult<ImportReport> {
        let _guard = InFlight::acquire(&self.running)?;

        let mut draws = parse_snapshot(body)?;
        draws.sort_by_key(|d| d.draw_number);

        let mut archive = self.store.load();
        let mut cursor = archive.latest_draw_number();
        let mut added = 0u32;
        let mut skipped = 0u32;

        for draw in draws {
            if draw.draw_number <= cursor {
                skipped += 1;
                continue;
            }
            if Some(draw.draw_number) != cursor.checked_add(1) {
                warn!(
                    "snapshot jumps from draw {} to {}, stopping merge",
                    cursor, draw.draw_number
                );
                break;
            }
            cursor = draw.draw_number;
            archive.push(draw);
            added += 1;
        }

        if added > 0 {
            self.store.save(&archive)?;
        }
        info!(
            "📦 Snapshot import: {} new, {} already present, latest draw {}",
            added, skipped, cursor
        );

        Ok(ImportReport {
            latest_draw_number: cursor,
            added,
            skipped,
        })
    }
}
