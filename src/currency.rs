//! Log-space currency accumulator. The main rho drives publication; theories
//! with several resource pools add auxiliary currencies with the same
//! contract. The only mutation paths are per-tick rate contributions and
//! purchase deductions.

use crate::logspace::{add2, subtract};

#[derive(Debug, Clone)]
pub struct Currency {
    pub symbol: &'static str,
    /// Balance as log10; `-inf` is an empty pool.
    pub value: f64,
}

impl Currency {
    pub fn rho() -> Self {
        Currency::new("rho")
    }

    pub fn new(symbol: &'static str) -> Self {
        Currency {
            symbol,
            value: f64::NEG_INFINITY,
        }
    }

    /// Fold a per-tick rate contribution into the balance.
    pub fn add(&mut self, log_rate: f64) {
        self.value = add2(self.value, log_rate);
    }

    /// Deduct a purchase cost. The purchase loop checks affordability first;
    /// calling this with `cost > value` violates the log-subtract contract.
    pub fn subtract(&mut self, cost: f64) {
        self.value = subtract(self.value, cost);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_and_deducts() {
        let mut c = Currency::rho();
        assert_eq!(c.value, f64::NEG_INFINITY);
        c.add(1.0); // +10
        c.add(1.0); // +10
        assert!((c.value - 20f64.log10()).abs() < 1e-12);
        c.subtract(1.0); // -10
        assert!((c.value - 1.0).abs() < 1e-12);
    }
}
