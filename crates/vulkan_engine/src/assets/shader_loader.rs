//! Binary file loading for precompiled shader bytecode

use std::path::Path;

use super::{AssetError, AssetResult};

/// Read a whole file into memory
///
/// A missing file is reported as [`AssetError::FileNotFound`]; any other IO
/// failure as [`AssetError::AssetLoadFailure`].
pub fn read_binary<P: AsRef<Path>>(path: P) -> AssetResult<Vec<u8>> {
    let path = path.as_ref();
    std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            AssetError::FileNotFound { path: path.to_path_buf() }
        } else {
            AssetError::load_failure(path, e)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_reads_bytes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0x03, 0x02, 0x23, 0x07]).unwrap();

        let bytes = read_binary(file.path()).unwrap();
        assert_eq!(bytes, vec![0x03, 0x02, 0x23, 0x07]);
    }

    #[test]
    fn test_missing_file_is_file_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_binary(dir.path().join("missing.spv"));
        assert!(matches!(result, Err(AssetError::FileNotFound { .. })));
    }
}
