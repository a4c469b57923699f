//! CSV telemetry: a header line followed by one data line per improvement
//! plus a final line, written with the `csv` crate. When `--output_file` is
//! set, rows go to `<path>.running` and the file is renamed to `<path>` once
//! the run ends cleanly (including a signal-interrupted stop, which counts
//! as clean); otherwise every row is logged at `info!` instead, so telemetry
//! is never silently dropped.

use std::fs::File;
use std::time::Instant;

use crate::assignment::Assignment;
use crate::config::Config;
use crate::error::{Result, WvcpError};
use crate::mcts::McstStats;

/// The fixed "run parameters" column list echoed on every line: a fixed,
/// documented column list rather than a free-form map so columns are stable
/// across runs.
const RUN_PARAM_COLUMNS: &[&str] =
    &["problem", "instance", "method", "initialization", "local_search", "simulation", "seed", "time_limit"];

/// Sink for CSV telemetry rows; either a `csv::Writer` over `<path>.running`
/// or a passthrough to `log::info!`.
#[derive(Debug)]
pub struct CsvLog {
    sink: Sink,
    start: Instant,
    run_params: Vec<String>,
    final_path: Option<String>,
    running_path: Option<String>,
}

#[derive(Debug)]
enum Sink {
    File(csv::Writer<File>),
    Log,
}

impl CsvLog {
    /// Opens `<output_file>.running` (or falls back to logging) and writes
    /// the header line.
    pub fn open(config: &Config, method_name: &str) -> Result<Self> {
        let run_params = vec![
            config.problem.clone(),
            config.instance.clone(),
            method_name.to_string(),
            format!("{:?}", config.initialization),
            format!("{:?}", config.local_search),
            config.simulation.map(|s| format!("{:?}", s)).unwrap_or_else(|| "none".to_string()),
            config.rand_seed.to_string(),
            format!("{:.3}", config.time_limit.as_secs_f64()),
        ];

        let (sink, running_path, final_path) = match &config.output_file {
            Some(path) => {
                let running_path = format!("{path}.running");
                let file = File::create(&running_path)
                    .map_err(|source| WvcpError::Io { path: running_path.clone(), source })?;
                (Sink::File(csv::WriterBuilder::new().has_headers(false).from_writer(file)), Some(running_path), Some(path.clone()))
            }
            None => (Sink::Log, None, None),
        };

        let mut log = Self { sink, start: Instant::now(), run_params, final_path, running_path };
        let header = log.header_row(config.method == crate::config::MethodKind::Mcts);
        log.write_row(&header)?;
        Ok(log)
    }

    fn header_row(&self, is_mcts: bool) -> Vec<String> {
        let mut cols: Vec<String> = RUN_PARAM_COLUMNS.iter().map(|s| s.to_string()).collect();
        cols.push("date".to_string());
        cols.push("turn".to_string());
        cols.push("elapsedSeconds".to_string());
        if is_mcts {
            cols.extend(["depth", "totalNodes", "liveNodes", "treeHeight"].iter().map(|s| s.to_string()));
        }
        cols.extend(["nbColors", "nbConflicts", "score", "coloring"].iter().map(|s| s.to_string()));
        cols
    }

    /// Writes one data line: run parameters, date, turn, elapsed time,
    /// optional MCTS extras, then the coloring summary and the `colorOfV0: …
    /// :colorOfVn-1` string.
    pub fn write_line(&mut self, turn: u64, assignment: &Assignment, mcts: Option<&McstStats>) -> Result<()> {
        let mut row = self.run_params.clone();
        row.push(unix_timestamp());
        row.push(turn.to_string());
        row.push(format!("{:.3}", self.start.elapsed().as_secs_f64()));
        if let Some(stats) = mcts {
            row.push(stats.depth.to_string());
            row.push(stats.total_nodes.to_string());
            row.push(stats.live_nodes.to_string());
            row.push(stats.tree_height.to_string());
        }
        row.push(assignment.n_used_colors().to_string());
        row.push(assignment.penalty().to_string());
        row.push(assignment.score().to_string());
        row.push(coloring_string(assignment));
        self.write_row(&row)
    }

    fn write_row(&mut self, row: &[String]) -> Result<()> {
        match &mut self.sink {
            Sink::File(writer) => {
                writer.write_record(row).map_err(|source| WvcpError::Io {
                    path: self.running_path.clone().unwrap_or_default(),
                    source: std::io::Error::new(std::io::ErrorKind::Other, source),
                })?;
                writer.flush().map_err(|source| WvcpError::Io {
                    path: self.running_path.clone().unwrap_or_default(),
                    source,
                })
            }
            Sink::Log => {
                log::info!("{}", row.join(","));
                Ok(())
            }
        }
    }

    /// Closes the writer and renames `<path>.running` to `<path>`. A no-op
    /// when logging rather than writing a file.
    pub fn finish(self) -> Result<()> {
        if let (Sink::File(mut writer), Some(running), Some(final_path)) = (self.sink, self.running_path, self.final_path) {
            writer.flush().map_err(|source| WvcpError::Io { path: running.clone(), source })?;
            drop(writer);
            std::fs::rename(&running, &final_path)
                .map_err(|source| WvcpError::Io { path: final_path, source })?;
        }
        Ok(())
    }
}

fn unix_timestamp() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs().to_string()).unwrap_or_else(|_| "0".to_string())
}

fn coloring_string(assignment: &Assignment) -> String {
    (0..assignment.n())
        .map(|v| assignment.color_of(v).map(|c| c.to_string()).unwrap_or_else(|| "-1".to_string()))
        .collect::<Vec<_>>()
        .join(":")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use crate::graph::Graph;
    use clap::Parser;

    fn test_config() -> Config {
        let cli = Cli::parse_from(["wvcp-mcts", "--instance", "k3"]);
        Config::from_cli(&cli, 3).unwrap()
    }

    #[test]
    fn logs_when_no_output_file_configured() {
        let config = test_config();
        let mut log = CsvLog::open(&config, "local_search").unwrap();
        let g = Graph::new("k3", vec![vec![1, 2], vec![0, 2], vec![0, 1]], vec![3, 2, 1]);
        let a = Assignment::new(&g);
        log.write_line(1, &a, None).unwrap();
        log.finish().unwrap();
    }

    #[test]
    fn coloring_string_marks_uncolored_as_negative_one() {
        let g = Graph::new("k3", vec![vec![1, 2], vec![0, 2], vec![0, 1]], vec![3, 2, 1]);
        let a = Assignment::new(&g);
        assert_eq!(coloring_string(&a), "-1:-1:-1");
    }
}
