//! Copy command implementation

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use tome_io::{FileSource, PrefetchConfig, PrefetchStats, PrefetchStream};

use crate::utils;

/// Prefetch settings gathered from the command line.
#[derive(Debug, Default)]
pub struct ConfigOverrides {
    pub config_path: Option<String>,
    pub capacity: Option<usize>,
    pub max_chunk_size: Option<usize>,
    pub blocking_chunk_size: Option<usize>,
}

impl ConfigOverrides {
    /// Loads the config file, if any, and applies the individual overrides on top.
    pub fn resolve(&self) -> Result<PrefetchConfig> {
        let mut config = match &self.config_path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file: {path}"))?;
                serde_json::from_str::<PrefetchConfig>(&text)
                    .with_context(|| format!("Invalid config file: {path}"))?
            }
            None => PrefetchConfig::default(),
        };
        if let Some(capacity) = self.capacity {
            config = config.with_capacity(capacity);
        }
        if let Some(max_chunk_size) = self.max_chunk_size {
            config = config.with_max_chunk_size(max_chunk_size);
        }
        if let Some(blocking_chunk_size) = self.blocking_chunk_size {
            config = config.with_blocking_chunk_size(blocking_chunk_size);
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug)]
pub struct CopySummary {
    pub bytes: u64,
    pub elapsed: Duration,
    pub stats: PrefetchStats,
}

/// Run the copy command
pub fn run(overrides: ConfigOverrides, input: String, output: String) -> Result<()> {
    let config = overrides.resolve()?;
    let size = utils::validate_input_file(Path::new(&input))?;
    println!("Copying {input} ({}) to {output}", utils::format_size(size));
    log::debug!("prefetch config: {config:?}");

    let summary = copy_file(Path::new(&input), Path::new(&output), config)?;

    println!("Copy completed:");
    println!("  Total time: {:.3} seconds", summary.elapsed.as_secs_f64());
    println!("  Bytes copied: {}", utils::format_size(summary.bytes));
    if let Some(throughput) = utils::format_throughput(summary.bytes, summary.elapsed) {
        println!("  Throughput: {throughput}");
    }
    println!("  Source reads: {}", summary.stats.source_reads);
    println!("  Producer waits (buffer full): {}", summary.stats.producer_waits);
    println!("  Consumer waits (buffer empty): {}", summary.stats.consumer_waits);
    Ok(())
}

/// Copies `input` to `output`, reading the input ahead on a background producer.
pub fn copy_file(input: &Path, output: &Path, config: PrefetchConfig) -> Result<CopySummary> {
    let start_time = Instant::now();

    let source = FileSource::open(input)
        .with_context(|| format!("Failed to open input: {}", input.display()))?;
    let stream = PrefetchStream::new(source, config).context("Failed to start prefetching")?;

    let file = File::create(output)
        .with_context(|| format!("Failed to create output: {}", output.display()))?;
    let mut writer = BufWriter::new(file);
    let bytes = std::io::copy(&mut &stream, &mut writer)
        .with_context(|| format!("Failed to copy {}", input.display()))?;
    writer.flush().context("Failed to flush output")?;

    let stats = stream.stats();
    stream.close()?;
    Ok(CopySummary {
        bytes,
        elapsed: start_time.elapsed(),
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tome_testkit::data_gen::{generate_temp_file, pseudo_random_bytes};

    #[test]
    fn test_copy_file() {
        let input = generate_temp_file(1_000_003, 42).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("copy.bin");

        let config = PrefetchConfig::new(64 * 1024, 16 * 1024, 4 * 1024);
        let summary = copy_file(input.path(), &output, config).unwrap();
        assert_eq!(summary.bytes, 1_000_003);
        assert_eq!(summary.stats.bytes_consumed, 1_000_003);
        assert_eq!(std::fs::read(&output).unwrap(), pseudo_random_bytes(1_000_003, 42));
    }

    #[test]
    fn test_copy_empty_file() {
        let input = generate_temp_file(0, 1).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("empty.bin");
        let summary = copy_file(input.path(), &output, PrefetchConfig::default()).unwrap();
        assert_eq!(summary.bytes, 0);
        assert!(std::fs::read(&output).unwrap().is_empty());
    }

    #[test]
    fn test_resolve_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefetch.json");
        std::fs::write(&path, r#"{ "capacity": 8192, "max_chunk_size": 1024 }"#).unwrap();

        let overrides = ConfigOverrides {
            config_path: Some(path.to_string_lossy().into_owned()),
            max_chunk_size: Some(2048),
            ..Default::default()
        };
        let config = overrides.resolve().unwrap();
        assert_eq!(config.capacity, 8192);
        assert_eq!(config.max_chunk_size, 2048);
        assert_eq!(
            config.blocking_chunk_size,
            PrefetchConfig::DEFAULT_BLOCKING_CHUNK_SIZE
        );
    }

    #[test]
    fn test_resolve_rejects_zero_capacity() {
        let overrides = ConfigOverrides {
            capacity: Some(0),
            ..Default::default()
        };
        let err = overrides.resolve().unwrap_err();
        assert!(err.to_string().contains("capacity"), "{err}");
    }
}
