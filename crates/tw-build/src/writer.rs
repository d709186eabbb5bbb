//! Output file writing.

use camino::Utf8Path;

use crate::error::JobError;

/// Writes `contents` to `path`, creating missing parent directories.
///
/// The file is opened, written and closed in one call, so no handle is
/// held across an await point.
pub async fn write_output(path: &Utf8Path, contents: &str) -> Result<(), JobError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| JobError::write(parent, source))?;
    }
    tokio::fs::write(path, contents)
        .await
        .map_err(|source| JobError::write(path, source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_creates_parents() {
        let dir = TempDir::new().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        let path = root.join("a/b/c.js");

        write_output(&path, "let a = 1;\n").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "let a = 1;\n");

        // Overwrites in place
        write_output(&path, "let b = 2;\n").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "let b = 2;\n");
    }

    #[tokio::test]
    async fn test_write_failure_names_path() {
        let dir = TempDir::new().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        std::fs::write(root.join("blocker"), "").unwrap();

        let err = write_output(&root.join("blocker/c.js"), "").await.unwrap_err();
        assert!(err.is_io());
        assert!(err.path().is_some_and(|p| p.ends_with("blocker")));
    }
}
