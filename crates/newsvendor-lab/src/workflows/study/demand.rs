use std::fmt::Debug;
use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::config::{DemandMode, StudyConfig};

/// Supplies realized demand for a round. Screen text never asks the source
/// how it works: participants are always told demand is uniformly random.
pub trait DemandSource: Debug + Send + Sync {
    fn next_demand(&self, round: u32) -> Result<u32, DemandError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DemandError {
    #[error("no scripted demand for round {round} (sequence holds {len} values)")]
    SequenceExhausted { round: u32, len: usize },
}

/// Independent uniform draws over an inclusive range.
#[derive(Debug)]
pub struct RandomUniform {
    min: u32,
    max: u32,
    rng: Mutex<StdRng>,
}

impl RandomUniform {
    pub fn new(min: u32, max: u32) -> Self {
        Self::with_rng(min, max, StdRng::from_entropy())
    }

    pub fn seeded(min: u32, max: u32, seed: u64) -> Self {
        Self::with_rng(min, max, StdRng::seed_from_u64(seed))
    }

    fn with_rng(min: u32, max: u32, rng: StdRng) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        Self {
            min,
            max,
            rng: Mutex::new(rng),
        }
    }
}

impl DemandSource for RandomUniform {
    fn next_demand(&self, _round: u32) -> Result<u32, DemandError> {
        let mut rng = self
            .rng
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(rng.gen_range(self.min..=self.max))
    }
}

/// Pre-scripted demand, one value per round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedSequence {
    values: Vec<u32>,
}

impl FixedSequence {
    pub fn new(values: Vec<u32>) -> Self {
        Self { values }
    }
}

impl DemandSource for FixedSequence {
    fn next_demand(&self, round: u32) -> Result<u32, DemandError> {
        round
            .checked_sub(1)
            .and_then(|index| self.values.get(index as usize))
            .copied()
            .ok_or(DemandError::SequenceExhausted {
                round,
                len: self.values.len(),
            })
    }
}

/// Builds the source selected by the study configuration.
pub fn demand_source_for(config: &StudyConfig) -> Box<dyn DemandSource> {
    match &config.demand_mode {
        DemandMode::Random { seed: Some(seed) } => Box::new(RandomUniform::seeded(
            config.demand_min,
            config.demand_max,
            *seed,
        )),
        DemandMode::Random { seed: None } => {
            Box::new(RandomUniform::new(config.demand_min, config.demand_max))
        }
        DemandMode::Fixed(values) => Box::new(FixedSequence::new(values.clone())),
    }
}
