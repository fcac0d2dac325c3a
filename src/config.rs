//! Configuration surface for the checks and worker pool this crate owns.

use crate::error::FmsrError;

/// Which MDS-family properties to verify on a candidate repair matrix.
///
/// erMDS is always effectively required; it's the minimal condition under
/// which the repaired encoding matrix stays MDS. `mds` and `rmds` are
/// strictly stronger and far more expensive to check. This is the single
/// definition `repair()` itself validates against — there is no separate,
/// unvalidated copy of this type at the `fmsr::repair` call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RepairChecks {
    pub mds: bool,
    pub rmds: bool,
}

impl RepairChecks {
    pub fn validate(&self) -> Result<(), FmsrError> {
        if self.rmds && !self.mds {
            return Err(FmsrError::RmdsRequiresMds);
        }
        Ok(())
    }
}

/// Tunables for the FMSR repair search and the matrix multiply fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FmsrConfig {
    /// Worker count for `matrix::mul_parallel`. 1 disables the rayon fan-out.
    pub workers: usize,
    /// Total rounds the repair search may spend before giving up.
    pub num_checks_threshold: u32,
    /// Rounds spent on the lazy geometric-row heuristic before going fully random.
    pub lazy_threshold: u32,
    pub checks: RepairChecks,
}

impl Default for FmsrConfig {
    fn default() -> Self {
        Self {
            workers: 7,
            num_checks_threshold: 1_000_000_000,
            lazy_threshold: 512,
            checks: RepairChecks::default(),
        }
    }
}

impl FmsrConfig {
    pub fn validate(&self) -> Result<(), FmsrError> {
        if self.workers == 0 {
            return Err(FmsrError::ZeroWorkers);
        }
        if self.lazy_threshold > self.num_checks_threshold {
            return Err(FmsrError::InvalidThresholds {
                lazy: self.lazy_threshold,
                total: self.num_checks_threshold,
            });
        }
        self.checks.validate()
    }

    pub fn from_toml(s: &str) -> Result<Self, FmsrError> {
        #[derive(serde::Deserialize)]
        struct Root {
            fmsr: Fmsr,
        }

        #[derive(serde::Deserialize)]
        struct Fmsr {
            workers: Option<usize>,
            num_checks_threshold: Option<u32>,
            lazy_threshold: Option<u32>,
            checks: Option<ChecksSection>,
        }

        #[derive(serde::Deserialize)]
        struct ChecksSection {
            mds: Option<bool>,
            rmds: Option<bool>,
        }

        let raw: Root = toml::from_str(s).map_err(|_| FmsrError::InvalidToml)?;
        let defaults = FmsrConfig::default();
        let checks = raw.fmsr.checks.map(|c| RepairChecks {
            mds: c.mds.unwrap_or(defaults.checks.mds),
            rmds: c.rmds.unwrap_or(defaults.checks.rmds),
        });
        let cfg = FmsrConfig {
            workers: raw.fmsr.workers.unwrap_or(defaults.workers),
            num_checks_threshold: raw
                .fmsr
                .num_checks_threshold
                .unwrap_or(defaults.num_checks_threshold),
            lazy_threshold: raw.fmsr.lazy_threshold.unwrap_or(defaults.lazy_threshold),
            checks: checks.unwrap_or(defaults.checks),
        };
        cfg.validate()?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(FmsrConfig::default().validate().is_ok());
    }

    #[test]
    fn rmds_without_mds_is_rejected() {
        let cfg = FmsrConfig {
            checks: RepairChecks {
                mds: false,
                rmds: true,
            },
            ..FmsrConfig::default()
        };
        assert_eq!(cfg.validate(), Err(FmsrError::RmdsRequiresMds));
    }

    #[test]
    fn parse_config_toml() {
        let toml_str = r#"
            [fmsr]
            workers = 4
            lazy_threshold = 256

            [fmsr.checks]
            mds = true
        "#;
        let cfg = FmsrConfig::from_toml(toml_str).unwrap();
        assert_eq!(cfg.workers, 4);
        assert_eq!(cfg.lazy_threshold, 256);
        assert_eq!(cfg.num_checks_threshold, 1_000_000_000);
        assert!(cfg.checks.mds);
        assert!(!cfg.checks.rmds);
    }

    #[test]
    fn invalid_toml_combo_is_rejected() {
        let toml_str = r#"
            [fmsr]
            [fmsr.checks]
            rmds = true
        "#;
        assert_eq!(
            FmsrConfig::from_toml(toml_str),
            Err(FmsrError::RmdsRequiresMds)
        );
    }
}
