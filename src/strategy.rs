//! # Strategy — Catalogs, Categories, and Candidate Selection
//!
//! Every theory ships a catalog of named strategies. A request can name one
//! strategy directly, or name a *category*; a category expands to every
//! catalog entry whose filter admits the current state (play-style match,
//! rho window, forced prerequisites), and the driver simulates all of them
//! and keeps the best.
//!
//! Filters live here, in plain `fn` tables, deliberately away from the
//! engine: they encode tuning knowledge ("coast variants only pay off once
//! publications slow down"), not simulation semantics.

use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::theory::TheoryId;

/// Play-style a strategy is suited for, most to least hands-on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum Category {
    /// Frequent manual purchases and milestone swaps.
    Active,
    /// Checks in a few times per publication.
    SemiIdle,
    /// Set-and-forget.
    Idle,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Active => "active",
            Category::SemiIdle => "semi-idle",
            Category::Idle => "idle",
        };
        f.write_str(name)
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "active" => Ok(Category::Active),
            "semi-idle" | "semiidle" | "semi_idle" => Ok(Category::SemiIdle),
            "idle" => Ok(Category::Idle),
            _ => bail!("unknown category {s:?}; supported: active, semi-idle, idle"),
        }
    }
}

/// State a filter sees when deciding whether a strategy is a candidate.
#[derive(Debug, Clone, Copy)]
pub struct FilterArgs<'a> {
    pub category: Category,
    /// Previous publication rho, as log10.
    pub rho: f64,
    /// Strategy chosen for the previous publication (chained runs).
    pub last_strat: &'a str,
}

impl FilterArgs<'_> {
    fn active(&self) -> bool {
        self.category == Category::Active
    }

    fn semi_idle(&self) -> bool {
        self.category == Category::SemiIdle
    }

    fn idle(&self) -> bool {
        self.category == Category::Idle
    }
}

/// Catalog entry: a strategy name, the category filter that nominates it,
/// and a forced prerequisite that holds regardless of category.
pub struct StratDef {
    pub name: &'static str,
    pub filter: fn(&FilterArgs) -> bool,
    pub forced: fn(&FilterArgs) -> bool,
}

const ALWAYS: fn(&FilterArgs) -> bool = |_| true;

// ── Per-theory catalogs ────────────────────────────────────────────
//
// Rho windows: active refinements only become candidates once their extra
// terms exist (milestone thresholds), and coast variants once publication
// cycles are long enough that coasting saves real time.

const T1_STRATS: &[StratDef] = &[
    // Plain T1 doubles as the low-rho fallback for every category.
    StratDef { name: "T1", filter: |a| a.idle() && a.rho < 100.0 || a.rho < 50.0, forced: ALWAYS },
    StratDef { name: "T1Coast", filter: |a| a.idle(), forced: |a| a.rho >= 30.0 },
    StratDef { name: "T1C34", filter: |a| a.semi_idle() && a.rho < 150.0, forced: |a| a.rho >= 25.0 },
    StratDef { name: "T1C34Coast", filter: |a| a.semi_idle(), forced: |a| a.rho >= 30.0 },
    StratDef { name: "T1C4", filter: |a| a.semi_idle() && a.rho < 150.0, forced: |a| a.rho >= 50.0 },
    StratDef { name: "T1C4Coast", filter: |a| a.semi_idle(), forced: |a| a.rho >= 50.0 },
    StratDef { name: "T1Ratio", filter: |a| a.active() && a.rho < 250.0, forced: |a| a.rho >= 50.0 },
    StratDef { name: "T1RatioCoast", filter: |a| a.active(), forced: |a| a.rho >= 75.0 },
    StratDef { name: "T1SolarXLII", filter: |a| a.active(), forced: |a| a.rho >= 175.0 },
    StratDef { name: "T1SolarXLIICoast", filter: |a| a.active(), forced: |a| a.rho >= 175.0 },
];

const T2_STRATS: &[StratDef] = &[
    StratDef { name: "T2", filter: |a| a.idle() || a.rho < 50.0, forced: ALWAYS },
    StratDef { name: "T2QS", filter: |a| a.semi_idle(), forced: |a| a.rho >= 50.0 },
    StratDef { name: "T2MS", filter: |a| a.active() && a.rho < 250.0, forced: |a| a.rho >= 50.0 },
    StratDef { name: "T2MC", filter: |a| a.active(), forced: |a| a.rho >= 250.0 },
    StratDef { name: "T2MCAlt", filter: |a| a.active(), forced: |a| a.rho >= 250.0 },
    StratDef { name: "T2MCAlt2", filter: |a| a.active(), forced: |a| a.rho >= 250.0 },
    StratDef { name: "T2MCAlt3", filter: |a| a.active(), forced: |a| a.rho >= 250.0 },
];

const T5_STRATS: &[StratDef] = &[
    StratDef { name: "T5", filter: |a| a.semi_idle() && a.rho < 150.0 || a.rho < 25.0, forced: ALWAYS },
    StratDef { name: "T5Idle", filter: |a| a.idle(), forced: |a| a.rho >= 25.0 },
    StratDef { name: "T5IdleCoast", filter: |a| a.idle(), forced: |a| a.rho >= 50.0 },
    StratDef { name: "T5AI2", filter: |a| a.active() || a.semi_idle(), forced: |a| a.rho >= 25.0 },
    StratDef { name: "T5AI2Coast", filter: |a| a.active() || a.semi_idle(), forced: |a| a.rho >= 50.0 },
];

const T6_STRATS: &[StratDef] = &[
    StratDef { name: "T6", filter: |a| a.idle() && a.rho < 150.0 || a.rho < 100.0, forced: ALWAYS },
    StratDef { name: "T6C5", filter: |a| a.idle() && a.rho >= 100.0, forced: |a| a.rho >= 50.0 },
    StratDef { name: "T6C5Coast", filter: |a| a.idle(), forced: |a| a.rho >= 100.0 },
    StratDef { name: "T6Snax", filter: |a| a.semi_idle(), forced: |a| a.rho >= 100.0 },
    StratDef { name: "T6SnaxCoast", filter: |a| a.semi_idle(), forced: |a| a.rho >= 150.0 },
    StratDef { name: "T6C5d", filter: |a| a.active() && a.rho < 800.0, forced: |a| a.rho >= 50.0 },
    StratDef { name: "T6C5dCoast", filter: |a| a.active() && a.rho < 800.0, forced: |a| a.rho >= 100.0 },
    StratDef { name: "T6AI", filter: |a| a.active(), forced: |a| a.rho >= 100.0 },
    StratDef { name: "T6AICoast", filter: |a| a.active(), forced: |a| a.rho >= 150.0 },
];

pub fn catalog(theory: TheoryId) -> &'static [StratDef] {
    match theory {
        TheoryId::T1 => T1_STRATS,
        TheoryId::T2 => T2_STRATS,
        TheoryId::T5 => T5_STRATS,
        TheoryId::T6 => T6_STRATS,
    }
}

/// Expand a category into the candidate strategy names for the given state.
pub fn strategies_for(
    theory: TheoryId,
    category: Category,
    rho: f64,
    last_strat: &str,
) -> Vec<&'static str> {
    let args = FilterArgs { category, rho, last_strat };
    catalog(theory)
        .iter()
        .filter(|s| (s.filter)(&args) && (s.forced)(&args))
        .map(|s| s.name)
        .collect()
}

/// Whether `name` is a catalog strategy of `theory`.
pub fn is_known_strat(theory: TheoryId, name: &str) -> bool {
    catalog(theory).iter().any(|s| s.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theory::{t1, t2, t5, t6};

    /// Every catalog name must be accepted by its theory's parser, or a
    /// category expansion would abort mid-request.
    #[test]
    fn catalogs_match_theory_parsers() {
        let parsers: [(TheoryId, &[&str]); 4] = [
            (TheoryId::T1, t1::STRAT_NAMES),
            (TheoryId::T2, t2::STRAT_NAMES),
            (TheoryId::T5, t5::STRAT_NAMES),
            (TheoryId::T6, t6::STRAT_NAMES),
        ];
        for (theory, known) in parsers {
            for def in catalog(theory) {
                assert!(
                    known.contains(&def.name),
                    "{theory}: catalog entry {} has no parser",
                    def.name
                );
            }
        }
    }

    #[test]
    fn categories_never_expand_empty() {
        for theory in TheoryId::ALL {
            for category in [Category::Active, Category::SemiIdle, Category::Idle] {
                for rho in [0.0, 50.0, 200.0, 500.0, 1000.0] {
                    let names = strategies_for(theory, category, rho, "");
                    assert!(
                        !names.is_empty(),
                        "{theory}/{category} at rho {rho} has no candidates"
                    );
                }
            }
        }
    }

    #[test]
    fn solar_needs_high_rho() {
        let low = strategies_for(TheoryId::T1, Category::Active, 100.0, "");
        assert!(!low.contains(&"T1SolarXLII"));
        let high = strategies_for(TheoryId::T1, Category::Active, 200.0, "");
        assert!(high.contains(&"T1SolarXLII"));
    }

    #[test]
    fn category_parsing() {
        assert_eq!("semi-idle".parse::<Category>().unwrap(), Category::SemiIdle);
        assert!("hyperactive".parse::<Category>().is_err());
    }
}
