use anyhow::{ensure, Result};
use sha2::{Digest, Sha256};

/// SHA256 verification for downloaded tool binaries
///
/// yt-dlp publishes a `SHA2-256SUMS` file with every release; expected hashes are read
/// from there instead of being pinned in the source.
pub struct ChecksumManager;

impl ChecksumManager {
    /// Hex SHA256 of an in-memory buffer
    pub fn hash_bytes(data: &[u8]) -> String {
        format!("{:x}", Sha256::digest(data))
    }

    /// Verify a downloaded buffer before it is written to disk
    pub fn verify_bytes(data: &[u8], expected_hash: &str) -> Result<()> {
        let hash = Self::hash_bytes(data);

        ensure!(
            hash.eq_ignore_ascii_case(expected_hash.trim()),
            "Hash mismatch!\n  Expected: {}\n  Got:      {}",
            expected_hash,
            hash
        );

        Ok(())
    }

    /// Looks up `asset` in a `sha256sum`-style listing (`<hash>  <name>` per line)
    pub fn find_in_listing(listing: &str, asset: &str) -> Option<String> {
        listing.lines().find_map(|line| {
            let mut parts = line.split_whitespace();
            let hash = parts.next()?;
            // sha256sum marks binary mode with a leading '*'
            let name = parts.next()?.trim_start_matches('*');
            (name == asset).then(|| hash.to_lowercase())
        })
    }
}
