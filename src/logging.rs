//! Log setup for the quiesce binary.
//!
//! Logs always go to a file under the platform data directory. With
//! `--verbose` every record is copied to stderr as well.

use eyre::{Context, Result};
use log::info;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

/// Writer that duplicates log output to stderr.
struct TeeWriter<W: Write> {
    file: W,
}

impl<W: Write> Write for TeeWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write_all(buf)?;
        io::stderr().write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()?;
        io::stderr().flush()
    }
}

/// Filter taken from config; `RUST_LOG` wins when it is set.
fn config_filter(rust_log_set: bool, log_level: Option<&str>) -> Option<&str> {
    if rust_log_set { None } else { log_level }
}

pub fn setup_logging(verbose: bool, log_level: Option<&str>) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("quiesce")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("quiesce.log");

    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file)
        .context("Failed to open log file")?;

    let mut builder = env_logger::Builder::from_default_env();
    if let Some(filter) = config_filter(std::env::var_os("RUST_LOG").is_some(), log_level) {
        builder.parse_filters(filter);
    }
    let target: Box<dyn Write + Send> = if verbose {
        Box::new(TeeWriter { file })
    } else {
        Box::new(file)
    };
    builder.target(env_logger::Target::Pipe(target));
    builder.init();

    if verbose {
        info!("Logging initialized, writing to: {} and stderr", log_file.display());
    } else {
        info!("Logging initialized, writing to: {}", log_file.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_filter_used_without_rust_log() {
        assert_eq!(config_filter(false, Some("debug")), Some("debug"));
        assert_eq!(config_filter(false, None), None);
    }

    #[test]
    fn test_rust_log_overrides_config_filter() {
        assert_eq!(config_filter(true, Some("debug")), None);
    }

    #[test]
    fn test_tee_writer_keeps_file_copy() {
        let mut tee = TeeWriter { file: Vec::new() };
        tee.write_all(b"WARN quiesce: animation stalled\n").unwrap();
        tee.flush().unwrap();
        assert_eq!(tee.file, b"WARN quiesce: animation stalled\n");
    }
}
