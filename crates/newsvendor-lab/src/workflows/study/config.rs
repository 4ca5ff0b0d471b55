use serde::Serialize;

use super::scoring::Pricing;

/// Largest order a participant may place in a single round.
pub const MAX_ORDER: u32 = 300;

/// How realized demand is produced for each round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DemandMode {
    /// Uniform draw over the configured range, optionally seeded.
    Random { seed: Option<u64> },
    /// Pre-scripted demand per round, indexed by `round - 1`.
    Fixed(Vec<u32>),
}

/// How a participant ends up in one of the two framing conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameMode {
    Random,
    /// Participants state the group number handed out by the operator.
    Group,
}

/// Operator-controlled parameters of the experiment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyConfig {
    pub access_code: String,
    pub price: u32,
    pub cost: u32,
    pub demand_min: u32,
    pub demand_max: u32,
    pub rounds: u32,
    pub demand_mode: DemandMode,
    pub frame_mode: FrameMode,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            access_code: "START".to_string(),
            price: 10,
            cost: 3,
            demand_min: 50,
            demand_max: 150,
            rounds: 10,
            demand_mode: DemandMode::Random { seed: None },
            frame_mode: FrameMode::Random,
        }
    }
}

impl StudyConfig {
    pub fn pricing(&self) -> Pricing {
        Pricing {
            price: self.price,
            cost: self.cost,
        }
    }

    pub fn validate(&self) -> Result<(), StudyConfigError> {
        if self.access_code.is_empty() {
            return Err(StudyConfigError::EmptyAccessCode);
        }
        if self.price == 0 {
            return Err(StudyConfigError::ZeroPrice);
        }
        if self.cost > self.price {
            return Err(StudyConfigError::CostAbovePrice {
                price: self.price,
                cost: self.cost,
            });
        }
        // the warm-up offers price, margin and cost as answers
        let margin = self.price - self.cost;
        if self.cost == 0 || margin == 0 || margin == self.cost {
            return Err(StudyConfigError::AmbiguousPricing {
                price: self.price,
                cost: self.cost,
            });
        }
        if self.demand_min > self.demand_max {
            return Err(StudyConfigError::DemandRange {
                min: self.demand_min,
                max: self.demand_max,
            });
        }
        if self.rounds == 0 {
            return Err(StudyConfigError::NoRounds);
        }
        if let DemandMode::Fixed(sequence) = &self.demand_mode {
            if sequence.len() != self.rounds as usize {
                return Err(StudyConfigError::SequenceLength {
                    expected: self.rounds,
                    actual: sequence.len(),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StudyConfigError {
    #[error("access code must not be empty")]
    EmptyAccessCode,
    #[error("unit price must be greater than zero")]
    ZeroPrice,
    #[error("unit cost {cost} exceeds unit price {price}")]
    CostAbovePrice { price: u32, cost: u32 },
    #[error("unit price {price} and cost {cost} make price, cost and margin indistinguishable")]
    AmbiguousPricing { price: u32, cost: u32 },
    #[error("demand minimum {min} exceeds maximum {max}")]
    DemandRange { min: u32, max: u32 },
    #[error("at least one round is required")]
    NoRounds,
    #[error("fixed demand sequence has {actual} values but {expected} rounds are configured")]
    SequenceLength { expected: u32, actual: usize },
}
