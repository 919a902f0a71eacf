//! Checksum command implementation

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use tome_workflow::{StepRange, ThreadPool, WorkPartitioner};

use crate::utils;

pub const DEFAULT_CHUNK_SIZE: u64 = 4 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChecksum {
    pub file_size: u64,
    pub chunk_size: u64,
    /// xxh3 hash of every chunk, in file order.
    pub chunk_hashes: Vec<u64>,
}

impl FileChecksum {
    /// xxh3 over the little-endian concatenation of the chunk hashes.
    pub fn digest(&self) -> u64 {
        let bytes = self
            .chunk_hashes
            .iter()
            .flat_map(|h| h.to_le_bytes())
            .collect::<Vec<u8>>();
        xxhash_rust::xxh3::xxh3_64(&bytes)
    }
}

/// Run the checksum command
pub fn run(chunk_size: u64, threads: Option<usize>, input: String) -> Result<()> {
    let path = Path::new(&input);
    let size = utils::validate_input_file(path)?;
    let pool = match threads {
        Some(n) => {
            anyhow::ensure!(n > 0, "--threads must be positive");
            ThreadPool::new(n)
        }
        None => ThreadPool::with_default_threads(),
    };
    println!(
        "Hashing {input} ({}) in chunks of {} on {} threads",
        utils::format_size(size),
        utils::format_size(chunk_size),
        pool.num_threads()
    );

    let start_time = Instant::now();
    let checksum = checksum_file(path, chunk_size, pool)?;
    let elapsed = start_time.elapsed();

    println!("Checksum completed:");
    println!("  Total time: {:.3} seconds", elapsed.as_secs_f64());
    println!("  Chunks: {}", checksum.chunk_hashes.len());
    if let Some(throughput) = utils::format_throughput(checksum.file_size, elapsed) {
        println!("  Throughput: {throughput}");
    }
    println!("  Digest: {:016x}", checksum.digest());
    Ok(())
}

/// Hashes every `chunk_size` slice of the file at `path` in parallel on `pool`.
pub fn checksum_file(path: &Path, chunk_size: u64, pool: ThreadPool) -> Result<FileChecksum> {
    anyhow::ensure!(chunk_size > 0, "Chunk size must be positive");
    let file_size = std::fs::metadata(path)
        .with_context(|| format!("Failed to stat {}", path.display()))?
        .len();
    let chunk_count = file_size.div_ceil(chunk_size);
    let chunk_count_i64 = i64::try_from(chunk_count).context("Too many chunks")?;

    let hashes: Arc<Vec<AtomicU64>> =
        Arc::new((0..chunk_count).map(|_| AtomicU64::new(0)).collect());
    let reader = ChunkReader {
        path: path.to_path_buf(),
        file_size,
        chunk_size,
    };
    let partitioner = WorkPartitioner::new(Arc::new(pool)).with_stop_on_fault(true);
    {
        let hashes = hashes.clone();
        partitioner
            .execute(StepRange::new(0, chunk_count_i64, 1), move |index| {
                let hash = reader.hash_chunk(index as u64)?;
                hashes[index as usize].store(hash, Ordering::Relaxed);
                Ok::<_, std::io::Error>(())
            })
            .with_context(|| format!("Failed to hash {}", path.display()))?;
    }

    Ok(FileChecksum {
        file_size,
        chunk_size,
        chunk_hashes: hashes.iter().map(|h| h.load(Ordering::Relaxed)).collect(),
    })
}

struct ChunkReader {
    path: PathBuf,
    file_size: u64,
    chunk_size: u64,
}

impl ChunkReader {
    fn hash_chunk(&self, index: u64) -> std::io::Result<u64> {
        let offset = index * self.chunk_size;
        let len = self.chunk_size.min(self.file_size - offset) as usize;
        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; len];
        file.read_exact(&mut buf)?;
        log::trace!("hashed chunk {index} ({len} bytes at {offset})");
        Ok(xxhash_rust::xxh3::xxh3_64(&buf))
    }
}
