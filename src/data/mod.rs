//! Data: the story's tabular inputs.
//!
//! Loads permits and demolitions from CSV, validates every field, and assigns
//! the load-time classification flags. Records are read-only afterwards
//! except for the positional fields the scene writes.

pub mod classify;
pub mod loader;
pub mod narrative;
pub mod records;

use std::collections::BTreeSet;
use std::path::Path;

use chrono::NaiveDate;
use log::info;
use rand::SeedableRng;
use rand::rngs::SmallRng;

use crate::config::StoryConfig;
use crate::error::DataError;

use loader::DemolitionFields;
pub use records::{DemolitionRecord, PermitRecord};

#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub permits: Vec<PermitRecord>,
    pub demolitions: Vec<DemolitionRecord>,
    /// Sorted, unique demolition dates of records shown on the map.
    pub demolition_dates: Vec<NaiveDate>,
}

impl Dataset {
    pub fn load(
        permits_path: &Path,
        demolitions_path: &Path,
        config: &StoryConfig,
    ) -> Result<Self, DataError> {
        let permits = loader::load_permits(permits_path, &config.data)?;
        let rows = loader::load_demolitions(demolitions_path)?;
        let dataset = Self::assemble(permits, rows, config);
        info!(
            "dataset: {} permit years, {} demolitions, {} map dates",
            dataset.permits.len(),
            dataset.demolitions.len(),
            dataset.demolition_dates.len()
        );
        Ok(dataset)
    }

    /// Classify validated rows, then drop demolitions before the configured
    /// start date.
    pub fn assemble(
        permits: Vec<PermitRecord>,
        rows: Vec<DemolitionFields>,
        config: &StoryConfig,
    ) -> Self {
        let mut rng = SmallRng::seed_from_u64(config.seed);
        let demolitions: Vec<DemolitionRecord> = rows
            .into_iter()
            .map(|row| classify::classify(row, &config.data, &mut rng))
            .filter(|d| d.demolition_date >= config.data.min_demolition_date)
            .collect();
        let demolition_dates = map_dates(&demolitions);
        Dataset {
            permits,
            demolitions,
            demolition_dates,
        }
    }

    pub fn from_records(permits: Vec<PermitRecord>, demolitions: Vec<DemolitionRecord>) -> Self {
        let demolition_dates = map_dates(&demolitions);
        Dataset {
            permits,
            demolitions,
            demolition_dates,
        }
    }

    pub fn total_permits(&self) -> u64 {
        self.permits.iter().map(|p| u64::from(p.permit_count)).sum()
    }
}

fn map_dates(demolitions: &[DemolitionRecord]) -> Vec<NaiveDate> {
    demolitions
        .iter()
        .filter(|d| d.show_on_map)
        .map(|d| d.demolition_date)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
