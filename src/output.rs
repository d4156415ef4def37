//! Output file writers (spec §6): the four per-run result files plus
//! the run log, each a fixed-column plain-text format mirroring the
//! original's `Output/` writers (listed in `original_source/_INDEX.md`).

use crate::error::Result;
use crate::statistics::{DynamicsEstimate, Histogram, Statistics};
use std::io::Write;

/// One row of `<run>.filament_positions_and_crosslinker_numbers.txt`:
/// the mobile filament's position and per-type linker populations at a
/// single recorded macro step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionRecord {
    pub time: f64,
    pub mobile_position: f64,
    pub n_passive_full: usize,
    pub n_dual_full: usize,
    pub n_active_full: usize,
}

pub fn write_position_records<W: Write>(mut writer: W, records: &[PositionRecord]) -> Result<()> {
    writeln!(
        writer,
        "# time\tmobile_position\tn_passive_full\tn_dual_full\tn_active_full"
    )?;
    for r in records {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}",
            r.time, r.mobile_position, r.n_passive_full, r.n_dual_full, r.n_active_full
        )?;
    }
    Ok(())
}

/// `<run>.statistical_analysis.txt`: one labeled `mean ± sem (n)` line
/// per tracked quantity.
pub fn write_statistics<W: Write>(mut writer: W, entries: &[(&str, Statistics)]) -> Result<()> {
    for (label, stats) in entries {
        writeln!(
            writer,
            "{label}\t{}\t{}\t{}",
            stats.mean(),
            stats.sem(),
            stats.count()
        )?;
    }
    Ok(())
}

/// `<run>.positional_histogram.txt`: bin edges and counts, outer
/// catch-all buckets on their own trailing lines.
pub fn write_histogram<W: Write>(mut writer: W, histogram: &Histogram) -> Result<()> {
    writeln!(writer, "# lower_edge\tupper_edge\tcount")?;
    let edges = histogram.edges();
    for (i, count) in histogram.bin_counts().iter().enumerate() {
        writeln!(writer, "{}\t{}\t{count}", edges[i], edges[i + 1])?;
    }
    writeln!(writer, "below\t{}\t{}", edges[0], histogram.below())?;
    writeln!(
        writer,
        "above\t{}\t{}",
        edges.last().unwrap(),
        histogram.above()
    )?;
    Ok(())
}

/// `<run>.actin_dynamics_estimates.txt`: drift and diffusion rate per
/// tip-offset bin.
pub fn write_dynamics_estimate<W: Write>(mut writer: W, estimate: &DynamicsEstimate) -> Result<()> {
    writeln!(writer, "# tip_offset\tdrift\tdiffusion")?;
    let mut bins: Vec<i64> = estimate.bins().collect();
    bins.sort_unstable();
    for bin in bins {
        let offset = crate::statistics::TipOffsetBin(bin);
        let drift = estimate.drift(offset).unwrap_or(f64::NAN);
        let diffusion = estimate.diffusion(offset).unwrap_or(f64::NAN);
        writeln!(writer, "{bin}\t{drift}\t{diffusion}")?;
    }
    Ok(())
}

/// `<run>.log.txt`: a running plain-text log of run-level events,
/// independent of the `log`/`env_logger` facade used for developer
/// diagnostics — this is the scientific record a later analysis script
/// reads back.
pub struct RunLog<W: Write> {
    writer: W,
}

impl<W: Write> RunLog<W> {
    pub fn new(writer: W) -> Self {
        RunLog { writer }
    }

    pub fn record(&mut self, time: f64, message: &str) -> Result<()> {
        writeln!(self.writer, "[{time}] {message}")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statistics::TipOffsetBin;

    #[test]
    fn write_position_records_includes_header_and_rows() {
        let mut buf = Vec::new();
        let records = [PositionRecord {
            time: 1.0,
            mobile_position: 0.5,
            n_passive_full: 3,
            n_dual_full: 0,
            n_active_full: 1,
        }];
        write_position_records(&mut buf, &records).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("# time"));
        assert!(text.contains("1\t0.5\t3\t0\t1"));
    }

    #[test]
    fn write_histogram_includes_outer_buckets() {
        let mut h = Histogram::new(vec![0.0, 1.0, 2.0]).unwrap();
        h.add_sample(-5.0);
        h.add_sample(0.5);
        h.add_sample(50.0);
        let mut buf = Vec::new();
        write_histogram(&mut buf, &h).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("below\t0\t1"));
        assert!(text.contains("above\t2\t1"));
    }

    #[test]
    fn write_dynamics_estimate_sorts_bins() {
        let mut d = DynamicsEstimate::new();
        d.record(TipOffsetBin(2), 0.1);
        d.record(TipOffsetBin(-1), 0.2);
        let mut buf = Vec::new();
        write_dynamics_estimate(&mut buf, &d).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let pos_neg = text.find("-1").unwrap();
        let pos_two = text.find("2\t").unwrap();
        assert!(pos_neg < pos_two);
    }

    #[test]
    fn run_log_formats_timestamp_and_message() {
        let mut buf = Vec::new();
        {
            let mut log = RunLog::new(&mut buf);
            log.record(0.5, "equilibration complete").unwrap();
        }
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "[0.5] equilibration complete\n");
    }
}
