// Small helpers around shader binaries

use std::io::Cursor;
use std::path::Path;

use anyhow::{Context, Result};

const SPIRV_MAGIC: u32 = 0x0723_0203;

/// Convert a SPIR-V binary into words, checking size and magic number
pub fn read_spirv(bytes: &[u8]) -> Result<Vec<u32>> {
    let words = ash::util::read_spv(&mut Cursor::new(bytes)).context("Invalid SPIR-V binary")?;
    if words.first() != Some(&SPIRV_MAGIC) {
        anyhow::bail!("Missing SPIR-V magic number");
    }
    Ok(words)
}

/// Load a compiled SPIR-V file from disk
pub fn load_spirv<P: AsRef<Path>>(path: P) -> Result<Vec<u32>> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read shader {:?}", path))?;
    read_spirv(&bytes).with_context(|| format!("Failed to load shader {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_spirv_words() {
        let mut bytes = SPIRV_MAGIC.to_le_bytes().to_vec();
        bytes.extend_from_slice(&0x0001_0000u32.to_le_bytes());
        assert_eq!(read_spirv(&bytes).unwrap(), vec![SPIRV_MAGIC, 0x0001_0000]);
    }

    #[test]
    fn test_read_spirv_rejects_bad_input() {
        assert!(read_spirv(&[1, 2, 3]).is_err());
        assert!(read_spirv(&[0, 0, 0, 0]).is_err());
        assert!(read_spirv(&[]).is_err());
    }
}
