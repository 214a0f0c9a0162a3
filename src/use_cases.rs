use anyhow::{Result, anyhow};
use rand::rngs::StdRng;
use reqwest::Client;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use lotto_lib::{
    BlobStore, DrawSource, RecommendationSampler, SyncEngine, fetch_snapshot, format_won,
    normalize_set_count,
};

/// Upper bound on ticket lines per tool call.
pub const MAX_SETS_PER_REQUEST: usize = 100;

pub struct SyncUseCase<S, B> {
    engine: Arc<SyncEngine<S, B>>,
    client: Client,
    snapshot_url: String,
}

impl<S: DrawSource, B: BlobStore> SyncUseCase<S, B> {
    pub fn new(engine: Arc<SyncEngine<S, B>>, client: Client, snapshot_url: String) -> Self {
        Self {
            engine,
            client,
            snapshot_url,
        }
    }

    pub async fn sync_draws(&self, _arguments: &HashMap<String, Value>) -> Result<String> {
        let mut status = Vec::new();
        let report = self
            .engine
            .sync_with_progress(|p| status.push(p.message.clone()))
            .await
            .map_err(|e| anyhow!("Sync failed: {}", e))?;

        Ok(json!({
            "success": true,
            "latest_draw_number": report.latest_draw_number,
            "added": report.added,
            "status": status.last().cloned().unwrap_or_default(),
            "progress": status
        })
        .to_string())
    }

    pub async fn import_snapshot(&self, _arguments: &HashMap<String, Value>) -> Result<String> {
        let body = fetch_snapshot(&self.client, &self.snapshot_url)
            .await
            .map_err(|e| anyhow!("Snapshot download failed: {}", e))?;
        let report = self
            .engine
            .import_snapshot(&body)
            .map_err(|e| anyhow!("Snapshot import failed: {}", e))?;

        Ok(json!({
            "success": true,
            "latest_draw_number": report.latest_draw_number,
            "added": report.added,
            "skipped": report.skipped,
            "status": format!("Update complete (latest draw: {})", report.latest_draw_number)
        })
        .to_string())
    }
}

pub struct ArchiveUseCase<S, B> {
    engine: Arc<SyncEngine<S, B>>,
}

impl<S: DrawSource, B: BlobStore> ArchiveUseCase<S, B> {
    pub fn new(engine: Arc<SyncEngine<S, B>>) -> Self {
        Self { engine }
    }

    pub async fn archive_status(&self, _arguments: &HashMap<String, Value>) -> Result<String> {
        let archive = self.engine.store().load();
        Ok(json!({
            "success": true,
            "draw_count": archive.len(),
            "latest_draw_number": archive.latest_draw_number(),
            "sync_in_progress": self.engine.is_running()
        })
        .to_string())
    }

    pub async fn get_latest_draws(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let limit = arguments
            .get("limit")
            .and_then(|v| v.as_u64())
            .map(|l| l as usize)
            .unwrap_or(10);

        let archive = self.engine.store().load();
        let results = archive.latest(limit);

        Ok(json!({
            "success": true,
            "results": results
        })
        .to_string())
    }

    pub async fn get_draw(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let draw_number = arguments
            .get("draw_number")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| anyhow!("Missing draw_number parameter"))?;
        let draw_number = u32::try_from(draw_number).map_err(|_| anyhow!("draw_number out of range"))?;

        let archive = self.engine.store().load();
        Ok(json!({
            "success": true,
            "result": archive.find(draw_number)
        })
        .to_string())
    }
}

pub struct RecommendationUseCase<S, B> {
    engine: Arc<SyncEngine<S, B>>,
    sampler: Mutex<RecommendationSampler<StdRng>>,
}

impl<S: DrawSource, B: BlobStore> RecommendationUseCase<S, B> {
    pub fn new(engine: Arc<SyncEngine<S, B>>, sampler: RecommendationSampler<StdRng>) -> Self {
        Self {
            engine,
            sampler: Mutex::new(sampler),
        }
    }

    pub async fn recommend_numbers(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        // numbers or numeric strings; anything else falls back to the default
        let requested = arguments.get("sets").and_then(|v| {
            v.as_i64()
                .or_else(|| v.as_str().and_then(|s| s.trim().parse::<i64>().ok()))
        });
        let set_count = normalize_set_count(requested).min(MAX_SETS_PER_REQUEST);

        let latest = self.engine.store().load().latest_draw_number();
        let recommendation = self
            .sampler
            .lock()
            .map_err(|_| anyhow!("sampler lock poisoned"))?
            .recommend(set_count, latest);

        Ok(json!({
            "success": true,
            "strategy": "random",
            "sets": recommendation.sets,
            "lines": recommendation.lines(),
            "total_cost": recommendation.total_cost,
            "total_cost_display": format_won(recommendation.total_cost),
            "latest_draw_number": recommendation.latest_draw_number,
            "issued_at": recommendation.issued_at.to_rfc3339()
        })
        .to_string())
    }
}
