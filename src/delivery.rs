// Writes a finished export to disk for the command-line flow

use crate::models::Export;
use anyhow::{Context, Result, ensure};
use std::path::{Component, Path, PathBuf};

/// Saves `export` as `<output_dir>/<filename>`, creating the directory if needed.
pub async fn save_export(output_dir: &Path, export: &Export) -> Result<PathBuf> {
    tokio::fs::create_dir_all(output_dir)
        .await
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;

    let mut components = Path::new(&export.filename).components();
    ensure!(
        matches!((components.next(), components.next()), (Some(Component::Normal(_)), None)),
        "Export filename {:?} is not a plain file name",
        export.filename
    );

    let path = output_dir.join(&export.filename);
    tokio::fs::write(&path, export.csv.as_bytes())
        .await
        .with_context(|| format!("Failed to write CSV to {}", path.display()))?;

    tracing::info!(rows = export.rows, path = %path.display(), "Saved export");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_into_a_fresh_directory() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("Results").join("nested");
        let export = Export {
            filename: "TAF_X_C05_01_full_2026-10-19.csv".into(),
            csv: "uuid\na".into(),
            rows: 1,
        };

        let path = save_export(&target, &export).await.unwrap();

        assert_eq!(path, target.join("TAF_X_C05_01_full_2026-10-19.csv"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "uuid\na");
    }

    #[tokio::test]
    async fn refuses_names_that_leave_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("Results");

        for filename in ["../escape.csv", "/tmp/abs.csv", "nested/file.csv", ".."] {
            let export = Export { filename: filename.into(), csv: "uuid".into(), rows: 0 };
            assert!(save_export(&target, &export).await.is_err(), "{} was accepted", filename);
        }
        assert!(!dir.path().join("escape.csv").exists());
    }
}
