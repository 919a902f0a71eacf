//! Synthetic payloads for stream and checksum tests.

use std::io::Write;

/// Returns `len` pseudo-random bytes. The same `seed` always yields the same bytes.
pub fn pseudo_random_bytes(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = fastrand::Rng::with_seed(seed);
    let mut data = vec![0u8; len];
    rng.fill(&mut data);
    data
}

/// Splits `len` into consecutive chunk sizes in `1..=max_chunk`, drawn from `seed`.
pub fn random_chunk_sizes(len: usize, max_chunk: usize, seed: u64) -> Vec<usize> {
    assert_ne!(max_chunk, 0);
    let mut rng = fastrand::Rng::with_seed(seed);
    let mut sizes = Vec::new();
    let mut remaining = len;
    while remaining > 0 {
        let size = rng.usize(1..=max_chunk).min(remaining);
        sizes.push(size);
        remaining -= size;
    }
    sizes
}

/// Writes `data` to a new temporary file, deleted when the returned handle drops.
pub fn write_temp_file(data: &[u8]) -> anyhow::Result<tempfile::NamedTempFile> {
    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(data)?;
    file.flush()?;
    Ok(file)
}

/// Creates a temporary file holding `len` bytes of [`pseudo_random_bytes`].
pub fn generate_temp_file(len: usize, seed: u64) -> anyhow::Result<tempfile::NamedTempFile> {
    write_temp_file(&pseudo_random_bytes(len, seed))
}
