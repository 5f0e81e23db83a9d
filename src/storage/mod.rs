use std::io::Write;
use std::path::{Path, PathBuf};

/// URL prefix under which the output directory is served.
pub const CERTIFICATES_URL_PREFIX: &str = "/certificates";

pub fn ensure_dir(dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)
}

pub fn certificate_url(file_name: &str) -> String {
    format!("{}/{}", CERTIFICATES_URL_PREFIX, file_name)
}

/// Write `bytes` to `dir/file_name` so readers see either the old file or the new one.
///
/// Data goes to a hidden temp file in the same directory, is fsynced, then renamed
/// over the target. A failed write leaves nothing at the target path.
pub fn write_atomic(dir: &Path, file_name: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
    ensure_dir(dir)?;
    let target = dir.join(file_name);

    let mut tmp = tempfile::Builder::new()
        .prefix(".")
        .suffix(".part")
        .tempfile_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(&target).map_err(|e| e.error)?;

    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn creates_missing_directories() {
        let root = TempDir::new().unwrap();
        let dir = root.path().join("public").join("certificates");
        let path = write_atomic(&dir, "CSG-1.pdf", b"%PDF-1.3").unwrap();
        assert_eq!(path, dir.join("CSG-1.pdf"));
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.3");
    }

    #[test]
    fn replaces_existing_file_and_leaves_no_temp_files() {
        let root = TempDir::new().unwrap();
        write_atomic(root.path(), "CSG-1.pdf", b"first version, longer").unwrap();
        write_atomic(root.path(), "CSG-1.pdf", b"second").unwrap();

        assert_eq!(std::fs::read(root.path().join("CSG-1.pdf")).unwrap(), b"second");
        let entries: Vec<_> = std::fs::read_dir(root.path())
            .unwrap()
            .filter_map(Result::ok)
            .map(|e| e.file_name())
            .collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn builds_urls() {
        assert_eq!(certificate_url("CSG-0001.pdf"), "/certificates/CSG-0001.pdf");
    }
}
