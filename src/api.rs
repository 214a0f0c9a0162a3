use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::errors::{LottoError, LottoResult};
use crate::types::{Draw, DrawLookup, LottoApiResponse};

pub const DRAW_LOOKUP_URL: &str = "https://www.dhlottery.co.kr/common.do";
pub const SNAPSHOT_URL: &str = "https://raw.githubusercontent.com/happylie/lotto_data/main/draws.json";

/// Remote source of draws, asked one draw number at a time.
///
/// Implementations return the raw response body; classifying it into a draw,
/// "not found" or a contract violation is done by [`parse_draw_response`].
/// Transport failures and non-success statuses are `SourceUnavailable`.
#[async_trait]
pub trait DrawSource: Send + Sync {
    async fn fetch_draw(&self, draw_number: u32) -> LottoResult<String>;
}

pub struct HttpDrawSource {
    client: Client,
    base_url: String,
}

impl HttpDrawSource {
    pub fn new(timeout: Duration) -> LottoResult<Self> {
        Self::with_base_url(DRAW_LOOKUP_URL, timeout)
    }

    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> LottoResult<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl DrawSource for HttpDrawSource {
    async fn fetch_draw(&self, draw_number: u32) -> LottoResult<String> {
        debug!("probing draw {}", draw_number);
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("method", "getLottoNumber".to_string()),
                ("drwNo", draw_number.to_string()),
            ])
            .send()
            .await
            .map_err(|e| LottoError::SourceUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LottoError::SourceUnavailable(format!(
                "HTTP {} for draw {}",
                status.as_u16(),
                draw_number
            )));
        }

        response
            .text()
            .await
            .map_err(|e| LottoError::SourceUnavailable(e.to_string()))
    }
}

pub fn build_client(timeout: Duration) -> LottoResult<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| LottoError::SourceUnavailable(format!("could not build HTTP client: {}", e)))
}

fn looks_like_markup(body: &str) -> bool {
    body.trim_start().starts_with('<')
}

/// Classify one lookup response body.
pub fn parse_draw_response(body: &str) -> LottoResult<DrawLookup> {
    if looks_like_markup(body) {
        return Err(LottoError::contract("non-JSON payload", body));
    }

    let response: LottoApiResponse = serde_json::from_str(body)
        .map_err(|e| LottoError::contract(format!("unexpected response shape: {}", e), body))?;

    match response.return_value.as_str() {
        "fail" => Ok(DrawLookup::NotFound),
        "success" => {
            let draw = draw_from_response(response)
                .ok_or_else(|| LottoError::contract("success response missing draw fields", body))?;
            draw.validate().map_err(|reason| LottoError::contract(reason, body))?;
            Ok(DrawLookup::Found(draw))
        }
        other => Err(LottoError::contract(
            format!("unknown returnValue \"{}\"", other),
            body,
        )),
    }
}

fn draw_from_response(response: LottoApiResponse) -> Option<Draw> {
    Some(Draw {
        draw_number: response.draw_number?,
        date: response.draw_date?,
        numbers: [
            response.number1?,
            response.number2?,
            response.number3?,
            response.number4?,
            response.number5?,
            response.number6?,
        ],
        bonus: response.bonus?,
    })
}

/// Download a complete `draws.json` snapshot.
pub async fn fetch_snapshot(client: &Client, url: &str) -> LottoResult<String> {
    let response = client
        .get(url)
        .header("Cache-Control", "no-store")
        .send()
        .await
        .map_err(|e| LottoError::SourceUnavailable(e.to_string()))?;

    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| LottoError::SourceUnavailable(e.to_string()))?;
    if !status.is_success() {
        return Err(LottoError::SourceUnavailable(format!(
            "Download failed: HTTP {}",
            status.as_u16()
        )));
    }
    Ok(text)
}

#[derive(Deserialize)]
struct SnapshotDocument {
    draws: Option<Vec<Draw>>,
}

/// Parse and validate a `{"draws": [...]}` snapshot document.
pub fn parse_snapshot(body: &str) -> LottoResult<Vec<Draw>> {
    if looks_like_markup(body) {
        return Err(LottoError::contract("non-JSON snapshot", body));
    }

    let document: SnapshotDocument = serde_json::from_str(body)
        .map_err(|e| LottoError::contract(format!("invalid snapshot: {}", e), body))?;
    let draws = document
        .draws
        .ok_or_else(|| LottoError::contract("invalid snapshot format (missing draws array)", body))?;

    for draw in &draws {
        draw.validate().map_err(|reason| LottoError::contract(reason, body))?;
    }
    Ok(draws)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn success_body(n: u32) -> String {
        json!({
            "returnValue": "success",
            "drwNo": n,
            "drwNoDate": "2002-12-07",
            "drwtNo1": 10, "drwtNo2": 23, "drwtNo3": 29,
            "drwtNo4": 33, "drwtNo5": 37, "drwtNo6": 40,
            "bnusNo": 16,
            "totSellamnt": 3681782000u64
        })
        .to_string()
    }

    fn assert_contract_violation(result: LottoResult<DrawLookup>) -> String {
        match result {
            Err(LottoError::SourceContractViolation { excerpt, .. }) => excerpt,
            other => panic!("expected contract violation, got {:?}", other),
        }
    }

    #[test]
    fn success_response_becomes_draw() {
        let lookup = parse_draw_response(&success_body(1)).unwrap();
        assert_eq!(
            lookup,
            DrawLookup::Found(Draw {
                draw_number: 1,
                date: "2002-12-07".to_string(),
                numbers: [10, 23, 29, 33, 37, 40],
                bonus: 16,
            })
        );
    }

    #[test]
    fn fail_response_is_not_found() {
        assert_eq!(
            parse_draw_response(r#"{"returnValue":"fail"}"#).unwrap(),
            DrawLookup::NotFound
        );
    }

    #[test]
    fn html_page_is_contract_violation_with_excerpt() {
        let page = "\n  <!DOCTYPE html>\n<html><head><title>Service unavailable</title></head></html>";
        let excerpt = assert_contract_violation(parse_draw_response(page));
        assert!(excerpt.starts_with("<!DOCTYPE html> <html>"));
    }

    #[test]
    fn garbage_and_incomplete_bodies_are_contract_violations() {
        assert_contract_violation(parse_draw_response("definitely not json"));
        assert_contract_violation(parse_draw_response(r#"{"status":"ok"}"#));
        assert_contract_violation(parse_draw_response(r#"{"returnValue":"maintenance"}"#));
        assert_contract_violation(parse_draw_response(
            r#"{"returnValue":"success","drwNo":3,"drwNoDate":"2002-12-21"}"#,
        ));
    }

    #[test]
    fn invalid_numbers_are_contract_violations() {
        let body = success_body(1).replace("\"drwtNo6\":40", "\"drwtNo6\":10");
        assert_contract_violation(parse_draw_response(&body));
    }

    #[test]
    fn snapshot_parses_draws() {
        let body = json!({
            "draws": [
                {"drwNo": 1, "drwNoDate": "2002-12-07", "numbers": [10, 23, 29, 33, 37, 40], "bnusNo": 16},
                {"draw_number": 2, "date": "2002-12-14", "numbers": [9, 13, 21, 25, 32, 42], "bonus": 2}
            ]
        })
        .to_string();
        let draws = parse_snapshot(&body).unwrap();
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[1].draw_number, 2);
    }

    #[test]
    fn snapshot_without_draws_array_is_rejected() {
        match parse_snapshot(r#"{"items": []}"#) {
            Err(LottoError::SourceContractViolation { reason, .. }) => {
                assert!(reason.contains("missing draws array"))
            }
            other => panic!("expected contract violation, got {:?}", other),
        }
        assert!(matches!(
            parse_snapshot("<html>404: Not Found</html>"),
            Err(LottoError::SourceContractViolation { .. })
        ));
    }
}
