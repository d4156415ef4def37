//! Parameter-file parsing and CLI override merge (spec §6). Ported
//! from the column-oriented reader under `original_source/Input/`
//! (listed in its `_INDEX.md`): each non-blank, non-`#`-prefixed line
//! is `NAME VALUE UNIT TYPE [POSSIBLE_VALUES...]`, whitespace
//! separated, read in a fixed declared order.

use crate::error::{FilamentSlidingError, Result};
use std::collections::BTreeMap;
use std::io::{BufRead, Write};
use std::path::Path;

/// The full set of run parameters this simulator needs, in the fixed
/// order the parameter file declares them (spec §6). Field names match
/// the `-N/-LM/-NP/-K/-GV`-style CLI flags' long forms.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameters {
    pub n_sites_fixed: usize,
    pub lattice_spacing: f64,
    pub n_passive: usize,
    pub n_dual: usize,
    pub n_active: usize,
    pub spring_constant: f64,
    pub rho: f64,
    pub diffusion_coefficient: f64,
    pub time_step: f64,
    pub n_equilibrate_steps: u64,
    pub n_run_steps: u64,
    pub graphics_interval: u64,
}

/// Declares, in order, the name/unit/type-hint each line of a
/// parameter file must carry. Order is load-bearing: the reader
/// rejects a file whose lines are out of this sequence (spec §6).
const FIELD_ORDER: &[(&str, &str, &str)] = &[
    ("N_SITES_FIXED", "sites", "int"),
    ("LATTICE_SPACING", "um", "float"),
    ("N_PASSIVE", "count", "int"),
    ("N_DUAL", "count", "int"),
    ("N_ACTIVE", "count", "int"),
    ("SPRING_CONSTANT", "pN/um", "float"),
    ("RHO", "dimensionless", "float"),
    ("DIFFUSION_COEFFICIENT", "um^2/s", "float"),
    ("TIME_STEP", "s", "float"),
    ("N_EQUILIBRATE_STEPS", "count", "int"),
    ("N_RUN_STEPS", "count", "int"),
    ("GRAPHICS_INTERVAL", "count", "int"),
];

impl Parameters {
    /// A reasonable default configuration, written out by
    /// `write_default` when no parameter file exists and the user
    /// accepts the interactive create-default prompt (spec §6).
    pub fn defaults() -> Self {
        Parameters {
            n_sites_fixed: 2000,
            lattice_spacing: 0.008,
            n_passive: 50,
            n_dual: 0,
            n_active: 0,
            spring_constant: 40.0,
            rho: 1.4,
            diffusion_coefficient: 2.0,
            time_step: 1e-5,
            n_equilibrate_steps: 100_000,
            n_run_steps: 1_000_000,
            graphics_interval: 1000,
        }
    }

    /// Parses a whitespace-column parameter file. Blank lines and
    /// lines starting with `#` are skipped; every remaining line must
    /// match `FIELD_ORDER`'s next expected name.
    pub fn parse(contents: &str) -> Result<Self> {
        let mut values: BTreeMap<&str, String> = BTreeMap::new();
        let mut expected = FIELD_ORDER.iter();

        for (line_no, raw_line) in contents.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut columns = line.split_whitespace();
            let name = columns.next().ok_or_else(|| {
                FilamentSlidingError::input(format!("line {}: missing NAME column", line_no + 1))
            })?;
            let value = columns.next().ok_or_else(|| {
                FilamentSlidingError::input(format!(
                    "line {}: missing VALUE column for {name}",
                    line_no + 1
                ))
            })?;
            // UNIT and TYPE columns (and any POSSIBLE_VALUES) are
            // documentation for the human editing the file; the
            // reader only validates that they are present.
            if columns.next().is_none() {
                return Err(FilamentSlidingError::input(format!(
                    "line {}: missing UNIT column for {name}",
                    line_no + 1
                )));
            }
            if columns.next().is_none() {
                return Err(FilamentSlidingError::input(format!(
                    "line {}: missing TYPE column for {name}",
                    line_no + 1
                )));
            }

            let (expected_name, _, _) = expected.next().ok_or_else(|| {
                FilamentSlidingError::input(format!(
                    "line {}: unexpected extra parameter {name}",
                    line_no + 1
                ))
            })?;
            if name != *expected_name {
                return Err(FilamentSlidingError::input(format!(
                    "line {}: expected parameter {expected_name}, found {name}",
                    line_no + 1
                )));
            }
            values.insert(*expected_name, value.to_string());
        }

        if expected.next().is_some() {
            return Err(FilamentSlidingError::input(
                "parameter file ended before all required parameters were read",
            ));
        }

        Self::from_map(&values)
    }

    fn from_map(values: &BTreeMap<&str, String>) -> Result<Self> {
        let get_f64 = |name: &str| -> Result<f64> {
            values
                .get(name)
                .ok_or_else(|| FilamentSlidingError::input(format!("missing parameter {name}")))?
                .parse::<f64>()
                .map_err(|e| {
                    FilamentSlidingError::input(format!("parameter {name} is not a valid float: {e}"))
                })
        };
        let get_usize = |name: &str| -> Result<usize> {
            values
                .get(name)
                .ok_or_else(|| FilamentSlidingError::input(format!("missing parameter {name}")))?
                .parse::<usize>()
                .map_err(|e| {
                    FilamentSlidingError::input(format!("parameter {name} is not a valid integer: {e}"))
                })
        };
        let get_u64 = |name: &str| -> Result<u64> {
            values
                .get(name)
                .ok_or_else(|| FilamentSlidingError::input(format!("missing parameter {name}")))?
                .parse::<u64>()
                .map_err(|e| {
                    FilamentSlidingError::input(format!("parameter {name} is not a valid integer: {e}"))
                })
        };

        let rho = get_f64("RHO")?;
        if !(rho < 1.5) {
            return Err(FilamentSlidingError::input(format!(
                "RHO must be strictly less than 1.5, got {rho}"
            )));
        }

        Ok(Parameters {
            n_sites_fixed: get_usize("N_SITES_FIXED")?,
            lattice_spacing: get_f64("LATTICE_SPACING")?,
            n_passive: get_usize("N_PASSIVE")?,
            n_dual: get_usize("N_DUAL")?,
            n_active: get_usize("N_ACTIVE")?,
            spring_constant: get_f64("SPRING_CONSTANT")?,
            rho,
            diffusion_coefficient: get_f64("DIFFUSION_COEFFICIENT")?,
            time_step: get_f64("TIME_STEP")?,
            n_equilibrate_steps: get_u64("N_EQUILIBRATE_STEPS")?,
            n_run_steps: get_u64("N_RUN_STEPS")?,
            graphics_interval: get_u64("GRAPHICS_INTERVAL")?,
        })
    }

    /// Reads and parses a parameter file from disk.
    pub fn read_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Writes this configuration out in the column format `parse`
    /// reads back, one line per `FIELD_ORDER` entry.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        let rows: [(&str, String); 12] = [
            ("N_SITES_FIXED", self.n_sites_fixed.to_string()),
            ("LATTICE_SPACING", self.lattice_spacing.to_string()),
            ("N_PASSIVE", self.n_passive.to_string()),
            ("N_DUAL", self.n_dual.to_string()),
            ("N_ACTIVE", self.n_active.to_string()),
            ("SPRING_CONSTANT", self.spring_constant.to_string()),
            ("RHO", self.rho.to_string()),
            ("DIFFUSION_COEFFICIENT", self.diffusion_coefficient.to_string()),
            ("TIME_STEP", self.time_step.to_string()),
            ("N_EQUILIBRATE_STEPS", self.n_equilibrate_steps.to_string()),
            ("N_RUN_STEPS", self.n_run_steps.to_string()),
            ("GRAPHICS_INTERVAL", self.graphics_interval.to_string()),
        ];
        for ((name, unit, ty), (_, value)) in FIELD_ORDER.iter().zip(rows.iter()) {
            writeln!(writer, "{name}\t{value}\t{unit}\t{ty}")?;
        }
        Ok(())
    }

    /// Applies CLI overrides in place. Each `Option` field left `None`
    /// leaves the parsed-file value untouched (spec §6's additive
    /// `-N/-LM/-NP/-K/-GV` flags).
    pub fn apply_overrides(&mut self, overrides: &ParameterOverrides) {
        if let Some(v) = overrides.n_sites_fixed {
            self.n_sites_fixed = v;
        }
        if let Some(v) = overrides.lattice_spacing {
            self.lattice_spacing = v;
        }
        if let Some(v) = overrides.n_passive {
            self.n_passive = v;
        }
        if let Some(v) = overrides.n_dual {
            self.n_dual = v;
        }
        if let Some(v) = overrides.n_active {
            self.n_active = v;
        }
        if let Some(v) = overrides.spring_constant {
            self.spring_constant = v;
        }
        if let Some(v) = overrides.graphics_interval {
            self.graphics_interval = v;
        }
    }
}

/// CLI-supplied overrides, each corresponding to one closed CLI flag
/// (`-N`, `-LM`, `-NP`, `-K`, `-GV`); `None` means "use the parameter
/// file's value" (spec §6).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterOverrides {
    pub n_sites_fixed: Option<usize>,
    pub lattice_spacing: Option<f64>,
    pub n_passive: Option<usize>,
    pub n_dual: Option<usize>,
    pub n_active: Option<usize>,
    pub spring_constant: Option<f64>,
    pub graphics_interval: Option<u64>,
}

/// Interactively prompts whether to create a default parameter file at
/// `path` when it does not already exist, writing `Parameters::defaults()`
/// on acceptance (spec §6).
pub fn create_default_if_missing<R: BufRead, W: Write>(
    path: &Path,
    mut prompt_reader: R,
    mut prompt_writer: W,
) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    writeln!(
        prompt_writer,
        "No parameter file found at {}. Create one with default values? [y/N]",
        path.display()
    )?;
    let mut answer = String::new();
    prompt_reader.read_line(&mut answer)?;
    if answer.trim().eq_ignore_ascii_case("y") {
        let file = std::fs::File::create(path)?;
        Parameters::defaults().write_to(file)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_file() -> String {
        let mut buf = Vec::new();
        Parameters::defaults().write_to(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn parse_round_trips_defaults() {
        let text = sample_file();
        let parsed = Parameters::parse(&text).unwrap();
        assert_eq!(parsed, Parameters::defaults());
    }

    #[test]
    fn parse_skips_blank_and_comment_lines() {
        let mut text = String::from("# a comment\n\n");
        text.push_str(&sample_file());
        let parsed = Parameters::parse(&text).unwrap();
        assert_eq!(parsed, Parameters::defaults());
    }

    #[test]
    fn parse_rejects_out_of_order_parameter() {
        let text = "N_PASSIVE\t5\tcount\tint\nN_SITES_FIXED\t10\tsites\tint\n";
        assert!(Parameters::parse(text).is_err());
    }

    #[test]
    fn parse_rejects_rho_at_or_above_1_5() {
        let mut p = Parameters::defaults();
        p.rho = 1.5;
        let mut buf = Vec::new();
        p.write_to(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(Parameters::parse(&text).is_err());
    }

    #[test]
    fn parse_rejects_incomplete_file() {
        let text = "N_SITES_FIXED\t10\tsites\tint\n";
        assert!(Parameters::parse(text).is_err());
    }

    #[test]
    fn apply_overrides_only_touches_set_fields() {
        let mut p = Parameters::defaults();
        let original_rho = p.rho;
        let overrides = ParameterOverrides {
            n_passive: Some(7),
            ..Default::default()
        };
        p.apply_overrides(&overrides);
        assert_eq!(p.n_passive, 7);
        assert_eq!(p.rho, original_rho);
    }
}
