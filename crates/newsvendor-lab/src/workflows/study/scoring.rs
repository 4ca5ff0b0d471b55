use serde::Serialize;

/// Unit economics shared by every round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pricing {
    pub price: u32,
    pub cost: u32,
}

impl Pricing {
    pub const fn unit_margin(self) -> i64 {
        self.price as i64 - self.cost as i64
    }

    /// Products keeping at least half the price as margin count as high margin.
    pub fn is_high_margin(self) -> bool {
        self.price > 0 && self.unit_margin() * 2 >= self.price as i64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoundOutcome {
    pub sold: u32,
    pub profit: i64,
    pub waste_loss: i64,
    pub opportunity_loss: i64,
}

/// Scores one round. Leftover stock is thrown away; unmet demand is lost.
pub fn score(order: u32, demand: u32, pricing: Pricing) -> RoundOutcome {
    let price = pricing.price as i64;
    let cost = pricing.cost as i64;
    let sold = order.min(demand);
    let profit = sold as i64 * price - order as i64 * cost;

    let (waste_loss, opportunity_loss) = if demand < order {
        ((order - demand) as i64 * cost, 0)
    } else {
        (0, (demand - order) as i64 * pricing.unit_margin())
    };

    RoundOutcome {
        sold,
        profit,
        waste_loss,
        opportunity_loss,
    }
}
