use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

const BUFFER_SIZE: usize = 4 * 1024 * 1024; // 4MB buffer

/// 內容雜湊演算法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Blake3,
    Sha256,
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blake3 => write!(f, "BLAKE3"),
            Self::Sha256 => write!(f, "SHA-256"),
        }
    }
}

enum Hasher {
    Blake3(Box<blake3::Hasher>),
    Sha256(Sha256),
}

impl Hasher {
    fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Blake3 => Self::Blake3(Box::new(blake3::Hasher::new())),
            HashAlgorithm::Sha256 => Self::Sha256(Sha256::new()),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Blake3(hasher) => {
                hasher.update(data);
            }
            Self::Sha256(hasher) => hasher.update(data),
        }
    }

    fn finalize(self) -> String {
        match self {
            Self::Blake3(hasher) => hasher.finalize().to_hex().to_string(),
            Self::Sha256(hasher) => format!("{:x}", hasher.finalize()),
        }
    }
}

/// 以固定大小的區塊串流讀取檔案計算雜湊，記憶體用量與檔案大小無關
pub fn calculate_file_hash(path: &Path, algorithm: HashAlgorithm) -> Result<String> {
    let file = File::open(path).with_context(|| format!("無法開啟檔案: {}", path.display()))?;
    let mut reader = BufReader::with_capacity(BUFFER_SIZE, file);
    let mut hasher = Hasher::new(algorithm);
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = reader
            .read(&mut buffer)
            .with_context(|| format!("讀取檔案失敗: {}", path.display()))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn temp_file(content: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content).unwrap();
        file
    }

    #[test]
    fn test_calculate_file_hash() {
        let file = temp_file(b"test content");

        let hash = calculate_file_hash(file.path(), HashAlgorithm::Blake3).unwrap();
        assert_eq!(hash.len(), 64); // BLAKE3 produces 256-bit (64 hex chars) hash
    }

    #[test]
    fn test_sha256_known_digest() {
        let file = temp_file(b"abc");

        let hash = calculate_file_hash(file.path(), HashAlgorithm::Sha256).unwrap();
        assert_eq!(
            hash,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_same_content_same_hash() {
        let file1 = temp_file(b"identical content");
        let file2 = temp_file(b"identical content");

        for algorithm in [HashAlgorithm::Blake3, HashAlgorithm::Sha256] {
            let hash1 = calculate_file_hash(file1.path(), algorithm).unwrap();
            let hash2 = calculate_file_hash(file2.path(), algorithm).unwrap();
            assert_eq!(hash1, hash2);
        }
    }

    #[test]
    fn test_different_content_different_hash() {
        let file1 = temp_file(b"content A");
        let file2 = temp_file(b"content B");

        let hash1 = calculate_file_hash(file1.path(), HashAlgorithm::Blake3).unwrap();
        let hash2 = calculate_file_hash(file2.path(), HashAlgorithm::Blake3).unwrap();

        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_missing_file() {
        assert!(calculate_file_hash(Path::new("/nonexistent/file"), HashAlgorithm::Sha256).is_err());
    }
}
