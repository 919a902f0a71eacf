use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod logging;
mod utils;

#[derive(Parser)]
#[command(name = "tome-cmd")]
#[command(about = "Command-line utility for prefetched copies and parallel file checksums")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy a file through a background-prefetching stream
    Copy {
        /// Path to a JSON file with prefetch settings
        #[arg(long)]
        config: Option<String>,

        /// Ring buffer capacity in bytes (overrides the config file)
        #[arg(long)]
        capacity: Option<usize>,

        /// Largest read-ahead chunk when the source has data ready
        #[arg(long)]
        max_chunk: Option<usize>,

        /// Largest read-ahead chunk when a read may block
        #[arg(long)]
        blocking_chunk: Option<usize>,

        /// File to read
        input: String,

        /// File to create or overwrite
        output: String,
    },

    /// Hash a file in fixed-size chunks processed in parallel
    Checksum {
        /// Chunk size in bytes
        #[arg(long, default_value_t = commands::checksum::DEFAULT_CHUNK_SIZE)]
        chunk_size: u64,

        /// Number of worker threads (defaults to the number of CPUs)
        #[arg(long)]
        threads: Option<usize>,

        /// File to hash
        input: String,
    },
}

fn main() -> Result<()> {
    logging::init()?;
    let cli = Cli::parse();

    match cli.command {
        Commands::Copy {
            config,
            capacity,
            max_chunk,
            blocking_chunk,
            input,
            output,
        } => commands::copy::run(
            commands::copy::ConfigOverrides {
                config_path: config,
                capacity,
                max_chunk_size: max_chunk,
                blocking_chunk_size: blocking_chunk,
            },
            input,
            output,
        ),
        Commands::Checksum {
            chunk_size,
            threads,
            input,
        } => commands::checksum::run(chunk_size, threads, input),
    }
}
