//! `<name>_exec_times.csv`: one execution time per periodic invocation.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::warn;

pub(crate) const HEADER: &str = "ExecutionTime_us";

pub(crate) struct TimingLog {
    path: PathBuf,
    writer: BufWriter<File>,
    failed: bool,
}

impl TimingLog {
    /// Truncates `path` and writes the header.
    pub(crate) fn create(path: &Path) -> io::Result<Self> {
        let mut writer = BufWriter::new(File::create(path)?);
        writeln!(writer, "{HEADER}")?;
        Ok(Self {
            path: path.to_path_buf(),
            writer,
            failed: false,
        })
    }

    pub(crate) fn record(&mut self, exec_us: f64) {
        if self.failed {
            return;
        }
        if let Err(e) = writeln!(self.writer, "{exec_us:.2}") {
            warn!(path = %self.path.display(), error = %e, "Timing log write failed, disabling");
            self.failed = true;
        }
    }

    pub(crate) fn flush(&mut self) {
        if let Err(e) = self.writer.flush() {
            warn!(path = %self.path.display(), error = %e, "Timing log flush failed");
        }
    }
}

/// Path of the timing log for service `name` inside `dir`.
pub fn timing_log_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}_exec_times.csv"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_then_two_decimal_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = timing_log_path(dir.path(), "LOGGER");
        let mut log = TimingLog::create(&path).unwrap();
        log.record(12.3456);
        log.record(7.0);
        log.flush();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "ExecutionTime_us\n12.35\n7.00\n");
        assert!(path.ends_with("LOGGER_exec_times.csv"));
    }
}
