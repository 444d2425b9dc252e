//! Tick-stepping and recording knobs, loadable from a TOML file and
//! overridable per-flag on the command line.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Engine tuning shared by every simulation of a request.
///
/// `dt` is the initial tick length in game-seconds, grown geometrically by
/// `ddt` each tick so long runs stay tractable. `purchase_window` bounds how
/// far (in log10 units) below the previous publication a purchase may occur
/// and still be recorded in the variable table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub dt: f64,
    pub ddt: f64,
    pub purchase_window: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            dt: 1.5,
            ddt: 1.0001,
            purchase_window: 10.0,
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Settings> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading settings file {}", path.display()))?;
        let settings: Settings = toml::from_str(&raw)
            .with_context(|| format!("parsing settings file {}", path.display()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.dt > 0.0, "dt must be positive, got {}", self.dt);
        anyhow::ensure!(
            self.ddt >= 1.0,
            "ddt must be at least 1, got {}",
            self.ddt
        );
        anyhow::ensure!(
            self.purchase_window >= 0.0,
            "purchase_window must be non-negative, got {}",
            self.purchase_window
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let s = Settings::default();
        assert_eq!(s.dt, 1.5);
        assert_eq!(s.ddt, 1.0001);
        assert_eq!(s.purchase_window, 10.0);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "dt = 0.5").unwrap();
        let s = Settings::load(f.path()).unwrap();
        assert_eq!(s.dt, 0.5);
        assert_eq!(s.ddt, 1.0001);
    }

    #[test]
    fn rejects_unknown_keys_and_bad_values() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "dtt = 0.5").unwrap();
        assert!(Settings::load(f.path()).is_err());

        let mut g = tempfile::NamedTempFile::new().unwrap();
        writeln!(g, "ddt = 0.9").unwrap();
        assert!(Settings::load(g.path()).is_err());
    }
}
