use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};
use serde::Serialize;
use tracing::warn;

use crate::dataset::{Dataset, PlayerKey};
use crate::error::EngineResult;
use crate::percentile::{MetricSummary, describe_metric};
use crate::profile::{PlayerProfile, classify};
use crate::similarity::{SimilarityOptions, SimilarityResult, rank_similar_with};

/// Everything the scouting views show for one player.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerReport {
    pub player: PlayerKey,
    pub profile: PlayerProfile,
    pub summaries: Vec<MetricSummary>,
    pub similar: Vec<SimilarityResult>,
    /// Set when the similarity ranking failed; the rest of the report is
    /// still usable.
    pub similarity_error: Option<String>,
}

impl PlayerReport {
    pub fn build<S: AsRef<str>, F: AsRef<str>>(
        dataset: &Dataset,
        player: &PlayerKey,
        metrics: &[S],
        features: &[F],
        options: &SimilarityOptions,
    ) -> EngineResult<Self> {
        let profile = classify(dataset, player, metrics)?;
        let summaries = profile
            .percentiles
            .iter()
            .map(|p| describe_metric(dataset, player, &p.metric))
            .collect::<EngineResult<Vec<_>>>()?;

        let (similar, similarity_error) = match rank_similar_with(dataset, player, features, options) {
            Ok(rows) => (rows, None),
            Err(err) => {
                warn!(%err, "similarity ranking failed");
                (Vec::new(), Some(err.to_string()))
            }
        };

        Ok(Self {
            player: profile.player.clone(),
            profile,
            summaries,
            similar,
            similarity_error,
        })
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("serialize report")?;
        fs::write(path, json).with_context(|| format!("failed writing report to {}", path.display()))
    }

    pub fn write_xlsx(&self, path: &Path) -> Result<()> {
        let mut percentile_rows = vec![vec![
            "Metric".to_string(),
            "Value".to_string(),
            "Percentile".to_string(),
            "Band".to_string(),
            "Flag".to_string(),
        ]];
        for p in &self.profile.percentiles {
            let flag = if self.profile.strengths.contains(&p.metric) {
                "strength"
            } else if self.profile.weaknesses.contains(&p.metric) {
                "weakness"
            } else {
                ""
            };
            percentile_rows.push(vec![
                p.metric.clone(),
                fmt_num(p.value),
                fmt_num(p.percentile),
                format!("{:?}", p.band),
                flag.to_string(),
            ]);
        }
        for s in &self.profile.skipped {
            percentile_rows.push(vec![
                s.metric.clone(),
                String::new(),
                String::new(),
                String::new(),
                format!("skipped: {}", s.reason),
            ]);
        }

        let mut similar_rows = vec![vec![
            "Rank".to_string(),
            "Player".to_string(),
            "Team".to_string(),
            "Season".to_string(),
            "Score".to_string(),
            "Cosine".to_string(),
            "Distance".to_string(),
            "Euclidean %".to_string(),
        ]];
        for (rank, row) in self.similar.iter().enumerate() {
            similar_rows.push(vec![
                (rank + 1).to_string(),
                row.player.name.clone(),
                row.player.team.clone().unwrap_or_default(),
                row.player.season.clone().unwrap_or_default(),
                fmt_num(row.score),
                row.cosine.map(fmt_num).unwrap_or_default(),
                fmt_num(row.distance),
                fmt_num(row.euclidean_similarity),
            ]);
        }
        if let Some(err) = self.similarity_error.as_ref() {
            similar_rows.push(vec![String::new(), format!("error: {err}")]);
        }

        let mut summary_rows = vec![vec![
            "Metric".to_string(),
            "Count".to_string(),
            "Mean".to_string(),
            "Median".to_string(),
            "Std Dev".to_string(),
            "Min".to_string(),
            "Max".to_string(),
            "Player".to_string(),
            "Rank".to_string(),
        ]];
        for s in &self.summaries {
            summary_rows.push(vec![
                s.metric.clone(),
                s.count.to_string(),
                fmt_num(s.mean),
                fmt_num(s.median),
                s.std_dev.map(fmt_num).unwrap_or_default(),
                fmt_num(s.min),
                fmt_num(s.max),
                fmt_num(s.player_value),
                format!("{}/{}", s.rank, s.total),
            ]);
        }
        summary_rows.push(Vec::new());
        summary_rows.push(vec![
            "Mean percentile".to_string(),
            fmt_num(self.profile.mean_percentile),
        ]);
        summary_rows.push(vec!["Tier".to_string(), self.profile.tier.label().to_string()]);

        let mut workbook = Workbook::new();
        {
            let sheet = workbook.add_worksheet();
            sheet.set_name("Percentiles")?;
            write_rows(sheet, &percentile_rows)?;
        }
        {
            let sheet = workbook.add_worksheet();
            sheet.set_name("Similar")?;
            write_rows(sheet, &similar_rows)?;
        }
        {
            let sheet = workbook.add_worksheet();
            sheet.set_name("Summary")?;
            write_rows(sheet, &summary_rows)?;
        }
        workbook
            .save(path)
            .with_context(|| format!("failed writing workbook to {}", path.display()))?;
        Ok(())
    }
}

fn fmt_num(v: f64) -> String {
    format!("{v:.2}")
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32, col_idx as u16, value)
                .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}
