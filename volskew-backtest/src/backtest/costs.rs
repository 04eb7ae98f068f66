//! Trading cost model.
//!
//! Default: $1.50 commission + $0.10 slippage per side, round trip charged
//! against $10,000 of capital per trade (0.032% of capital).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Flat per-trade cost, expressed as a fraction of deployed capital.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostModel {
    /// Commission per side.
    pub commission: Decimal,
    /// Slippage per side.
    pub slippage: Decimal,
    /// Capital deployed per trade.
    pub capital_per_trade: Decimal,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            commission: Decimal::new(150, 2),
            slippage: Decimal::new(10, 2),
            capital_per_trade: Decimal::from(10_000),
        }
    }
}

impl CostModel {
    /// Cost of one side (entry or exit).
    pub fn per_side(&self) -> Decimal {
        self.commission + self.slippage
    }

    /// Cost of entry plus exit.
    pub fn round_trip(&self) -> Decimal {
        self.per_side() * Decimal::from(2)
    }

    /// Round-trip cost as a fraction of capital per trade.
    pub fn cost_fraction(&self) -> f64 {
        if self.capital_per_trade <= Decimal::ZERO {
            return 0.0;
        }
        (self.round_trip() / self.capital_per_trade)
            .try_into()
            .unwrap_or(0.0)
    }
}
