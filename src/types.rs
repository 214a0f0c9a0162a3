use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::utils::{pad2, set_letter};

pub const MIN_NUMBER: u8 = 1;
pub const MAX_NUMBER: u8 = 45;
pub const NUMBERS_PER_SET: usize = 6;

/// One historical draw.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Draw {
    #[serde(alias = "drwNo")]
    pub draw_number: u32,
    #[serde(alias = "drwNoDate")]
    pub date: String,
    pub numbers: [u8; NUMBERS_PER_SET],
    #[serde(alias = "bnusNo")]
    pub bonus: u8,
}

impl Draw {
    /// Checks the structural rules every stored draw must satisfy.
    pub fn validate(&self) -> Result<(), String> {
        if self.draw_number == 0 {
            return Err("draw number must be positive".to_string());
        }
        let mut seen = HashSet::with_capacity(NUMBERS_PER_SET);
        for &n in &self.numbers {
            if !(MIN_NUMBER..=MAX_NUMBER).contains(&n) {
                return Err(format!(
                    "draw {}: number {} outside {}..={}",
                    self.draw_number, n, MIN_NUMBER, MAX_NUMBER
                ));
            }
            if !seen.insert(n) {
                return Err(format!("draw {}: duplicate number {}", self.draw_number, n));
            }
        }
        if !(MIN_NUMBER..=MAX_NUMBER).contains(&self.bonus) {
            return Err(format!(
                "draw {}: bonus {} outside {}..={}",
                self.draw_number, self.bonus, MIN_NUMBER, MAX_NUMBER
            ));
        }
        Ok(())
    }
}

/// The persisted, append-only draw history, ordered by draw number.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct DrawArchive {
    #[serde(default)]
    pub draws: Vec<Draw>,
}

impl DrawArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw number of the tail, or 0 for an empty archive. Sync resumes from here.
    pub fn latest_draw_number(&self) -> u32 {
        self.draws.last().map(|d| d.draw_number).unwrap_or(0)
    }

    /// Every draw is well-formed and draw numbers run 1, 2, ..., n.
    pub fn check_integrity(&self) -> Result<(), String> {
        for (idx, draw) in self.draws.iter().enumerate() {
            draw.validate()?;
            let expected = idx as u64 + 1;
            if u64::from(draw.draw_number) != expected {
                return Err(format!(
                    "draw {} stored at position {}, archive is not contiguous",
                    draw.draw_number, expected
                ));
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.draws.len()
    }

    pub fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }

    pub fn push(&mut self, draw: Draw) {
        self.draws.push(draw);
    }

    /// Most recent draws, newest first.
    pub fn latest(&self, limit: usize) -> Vec<&Draw> {
        self.draws.iter().rev().take(limit).collect()
    }

    pub fn find(&self, draw_number: u32) -> Option<&Draw> {
        // contiguous from 1, so the index is known; fall back to a scan otherwise
        let idx = (draw_number as usize).checked_sub(1)?;
        match self.draws.get(idx) {
            Some(d) if d.draw_number == draw_number => Some(d),
            _ => self.draws.iter().find(|d| d.draw_number == draw_number),
        }
    }
}

/// Raw response of the draw lookup endpoint.
#[derive(Deserialize, Debug)]
pub struct LottoApiResponse {
    #[serde(rename = "returnValue")]
    pub return_value: String,
    #[serde(rename = "drwNo")]
    pub draw_number: Option<u32>,
    #[serde(rename = "drwNoDate")]
    pub draw_date: Option<String>,
    #[serde(rename = "drwtNo1")]
    pub number1: Option<u8>,
    #[serde(rename = "drwtNo2")]
    pub number2: Option<u8>,
    #[serde(rename = "drwtNo3")]
    pub number3: Option<u8>,
    #[serde(rename = "drwtNo4")]
    pub number4: Option<u8>,
    #[serde(rename = "drwtNo5")]
    pub number5: Option<u8>,
    #[serde(rename = "drwtNo6")]
    pub number6: Option<u8>,
    #[serde(rename = "bnusNo")]
    pub bonus: Option<u8>,
}

/// Outcome of asking the source for one draw number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawLookup {
    Found(Draw),
    NotFound,
}

/// One generated ticket line.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RecommendationSet {
    pub numbers: [u8; NUMBERS_PER_SET],
}

/// A full generated ticket as handed to the display side.
#[derive(Serialize, Debug, Clone)]
pub struct Recommendation {
    pub sets: Vec<RecommendationSet>,
    pub total_cost: u64,
    pub latest_draw_number: u32,
    pub issued_at: DateTime<Local>,
}

impl Recommendation {
    /// Ticket lines as `A  01 02 03 04 05 06`.
    pub fn lines(&self) -> Vec<String> {
        self.sets
            .iter()
            .enumerate()
            .map(|(i, set)| format!("{}  {}", set_letter(i), set))
            .collect()
    }
}

impl fmt::Display for RecommendationSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let padded: Vec<String> = self.numbers.iter().map(|&n| pad2(n)).collect();
        write!(f, "{}", padded.join(" "))
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub latest_draw_number: u32,
    pub added: u32,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct SyncProgress {
    pub latest_draw_number: u32,
    pub added: u32,
    pub message: String,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportReport {
    pub latest_draw_number: u32,
    pub added: u32,
    pub skipped: u32,
}
