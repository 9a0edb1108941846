//! Streaming content hashing.
//!
//! Files are read in fixed 64 KiB chunks so arbitrarily large files never
//! sit in memory whole. Failures are reported per file as [`SkipReason`];
//! the caller counts the skip and moves on.

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use std::str::FromStr;

use sha2::{Digest, Sha256, Sha512};

use super::EngineError;

const READ_BUF_SIZE: usize = 64 * 1024;

/// Supported digest algorithms.
///
/// The baseline records which algorithm produced it; baselines made with
/// different algorithms are never comparable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha256,
    Sha512,
}

impl HashAlgorithm {
    pub fn as_str(self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha512 => "sha512",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sha256" => Ok(HashAlgorithm::Sha256),
            "sha512" => Ok(HashAlgorithm::Sha512),
            _ => Err(EngineError::UnknownAlgorithm(s.to_string())),
        }
    }
}

/// Why a single file was left out of the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The file exists but we may not read it.
    PermissionDenied,
    /// The file disappeared between enumeration and hashing.
    Vanished,
    /// Sockets, FIFOs, device nodes, symlinks.
    NotRegularFile,
    /// Any other I/O failure mid-read.
    Io(io::ErrorKind),
}

impl SkipReason {
    fn from_io(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => SkipReason::Vanished,
            io::ErrorKind::PermissionDenied => SkipReason::PermissionDenied,
            kind => SkipReason::Io(kind),
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::PermissionDenied => f.write_str("permission denied"),
            SkipReason::Vanished => f.write_str("vanished before hashing"),
            SkipReason::NotRegularFile => f.write_str("not a regular file"),
            SkipReason::Io(kind) => write!(f, "read failed: {kind}"),
        }
    }
}

/// Digest plus the on-disk size observed at the metadata check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashedFile {
    /// Lowercase hex digest of the file contents.
    pub digest: String,
    pub size: u64,
}

/// Hash one file's contents.
///
/// Symlinks are not followed; the link itself is not a regular file. The
/// regular-file check runs before `open` so FIFOs and device nodes are
/// skipped without ever opening them.
pub fn hash_file(path: &Path, algorithm: HashAlgorithm) -> Result<HashedFile, SkipReason> {
    let meta = std::fs::symlink_metadata(path).map_err(|e| SkipReason::from_io(&e))?;
    if !meta.is_file() {
        return Err(SkipReason::NotRegularFile);
    }

    let file = File::open(path).map_err(|e| SkipReason::from_io(&e))?;
    let mut reader = BufReader::with_capacity(READ_BUF_SIZE, file);

    let digest = match algorithm {
        HashAlgorithm::Sha256 => stream_digest(&mut reader, Sha256::new())?,
        HashAlgorithm::Sha512 => stream_digest(&mut reader, Sha512::new())?,
    };

    Ok(HashedFile {
        digest,
        size: meta.len(),
    })
}

fn stream_digest<D: Digest>(reader: &mut impl Read, mut hasher: D) -> Result<String, SkipReason> {
    let mut buf = vec![0u8; READ_BUF_SIZE];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => hasher.update(&buf[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(SkipReason::from_io(&e)),
        }
    }
    Ok(hex_encode(hasher.finalize().as_slice()))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn sha256_of_known_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hello.txt");
        fs::write(&path, "hello").unwrap();

        let hashed = hash_file(&path, HashAlgorithm::Sha256).unwrap();
        assert_eq!(
            hashed.digest,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        assert_eq!(hashed.size, 5);
    }

    #[test]
    fn sha256_of_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty");
        fs::write(&path, "").unwrap();

        let hashed = hash_file(&path, HashAlgorithm::Sha256).unwrap();
        assert_eq!(
            hashed.digest,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn sha512_of_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty");
        fs::write(&path, "").unwrap();

        let hashed = hash_file(&path, HashAlgorithm::Sha512).unwrap();
        assert_eq!(
            hashed.digest,
            "cf83e1357eefb8bdf1542850d66d8007d620e4050b5715dc83f4a921d36ce9ce\
             47d0d13c5d85f2b0ff8318d2877eec2f63b931bd47417a81a538327af927da3e"
        );
    }

    #[test]
    fn large_file_is_streamed_in_chunks() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("big.bin");
        // Three full chunks plus a partial one.
        let data = vec![0xabu8; READ_BUF_SIZE * 3 + 17];
        fs::write(&path, &data).unwrap();

        let hashed = hash_file(&path, HashAlgorithm::Sha256).unwrap();
        let expected = hex_encode(Sha256::digest(&data).as_slice());
        assert_eq!(hashed.digest, expected);
        assert_eq!(hashed.size, data.len() as u64);
    }

    #[test]
    fn missing_file_is_a_vanished_skip() {
        let dir = TempDir::new().unwrap();
        let err = hash_file(&dir.path().join("nope"), HashAlgorithm::Sha256).unwrap_err();
        assert_eq!(err, SkipReason::Vanished);
    }

    #[test]
    fn directory_is_not_a_regular_file() {
        let dir = TempDir::new().unwrap();
        let err = hash_file(dir.path(), HashAlgorithm::Sha256).unwrap_err();
        assert_eq!(err, SkipReason::NotRegularFile);
    }

    #[cfg(unix)]
    #[test]
    fn symlink_is_not_followed() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("real.txt");
        fs::write(&target, "content").unwrap();
        let link = dir.path().join("link.txt");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let err = hash_file(&link, HashAlgorithm::Sha256).unwrap_err();
        assert_eq!(err, SkipReason::NotRegularFile);
    }

    #[test]
    fn algorithm_parses_case_insensitively() {
        assert_eq!(
            "SHA256".parse::<HashAlgorithm>().unwrap(),
            HashAlgorithm::Sha256
        );
        assert_eq!(
            " sha512 ".parse::<HashAlgorithm>().unwrap(),
            HashAlgorithm::Sha512
        );
        assert!("md5".parse::<HashAlgorithm>().is_err());
    }
}
