//! Reading the `Grade.csv` sample manifest.

use std::collections::HashSet;
use std::path::Path;

use crate::error::{PrepError, Result};
use crate::types::ManifestRow;

/// Header of the identifier column.
pub const NAME_COLUMN: &str = "name";

/// Read the manifest at `path`.
///
/// The grade is taken from the column named `grade_column`, or from the last
/// column of the header when no name is given. Headers and fields are trimmed,
/// since `Grade.csv` pads them with spaces.
pub fn read_manifest(path: &Path, grade_column: Option<&str>) -> Result<Vec<ManifestRow>> {
    if !path.is_file() {
        return Err(PrepError::ManifestNotFound {
            path: path.to_path_buf(),
        });
    }
    let csv_err = |source| PrepError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_err)?;
    let headers = reader.headers().map_err(csv_err)?.clone();

    let missing = |column: &str| PrepError::MissingColumn {
        path: path.to_path_buf(),
        column: column.to_string(),
    };
    let name_idx = headers
        .iter()
        .position(|h| h == NAME_COLUMN)
        .ok_or_else(|| missing(NAME_COLUMN))?;
    let grade_idx = match grade_column {
        Some(column) => headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| missing(column))?,
        None => headers.len().saturating_sub(1),
    };
    if grade_idx == name_idx {
        return Err(missing(grade_column.unwrap_or("grade")));
    }

    let mut seen = HashSet::new();
    let mut rows = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(csv_err)?;
        let name = record.get(name_idx).unwrap_or_default();
        let grade = record.get(grade_idx).unwrap_or_default();

        if name.is_empty() {
            // +2: one for the header, one for 1-based numbering
            return Err(PrepError::EmptyIdentifier { row: row + 2 });
        }
        if !sanitize_filename::is_sanitized(name) || name == "." || name == ".." {
            return Err(PrepError::UnsafeIdentifier {
                name: name.to_string(),
            });
        }
        if !seen.insert(name.to_string()) {
            return Err(PrepError::DuplicateIdentifier {
                name: name.to_string(),
            });
        }
        rows.push(ManifestRow::new(name, grade));
    }

    log::info!("Read {} manifest rows from {}", rows.len(), path.display());
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_manifest(dir: &Path, content: &str) -> std::path::PathBuf {
        let path = dir.join("Grade.csv");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_glas_layout_uses_last_column() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = write_manifest(
            temp_dir.path(),
            "name,Patient ID, grade (GlaS), grade (Sirinukunwattana et al. 2015)\n\
             testA_1,4, benign, adenomatous\n\
             train_1,2, malignant, moderately differentiated\n",
        );

        let rows = read_manifest(&path, None).unwrap();

        assert_eq!(
            rows,
            vec![
                ManifestRow::new("testA_1", "adenomatous"),
                ManifestRow::new("train_1", "moderately differentiated"),
            ]
        );
    }

    #[test]
    fn test_named_grade_column() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = write_manifest(
            temp_dir.path(),
            "name,Patient ID,grade (GlaS),other\ntrain_1,1,benign,x\n",
        );

        let rows = read_manifest(&path, Some("grade (GlaS)")).unwrap();

        assert_eq!(rows, vec![ManifestRow::new("train_1", "benign")]);
    }

    #[test]
    fn test_two_column_manifest() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = write_manifest(temp_dir.path(), "name,grade\ntrain_1,benign\n");

        let rows = read_manifest(&path, None).unwrap();

        assert_eq!(rows, vec![ManifestRow::new("train_1", "benign")]);
    }

    #[test]
    fn test_missing_manifest() {
        let temp_dir = tempfile::tempdir().unwrap();
        let err = read_manifest(&temp_dir.path().join("Grade.csv"), None).unwrap_err();
        assert!(matches!(err, PrepError::ManifestNotFound { .. }));
    }

    #[test]
    fn test_missing_name_column() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = write_manifest(temp_dir.path(), "id,grade\ntrain_1,benign\n");

        let err = read_manifest(&path, None).unwrap_err();

        assert!(matches!(err, PrepError::MissingColumn { ref column, .. } if column == "name"));
    }

    #[test]
    fn test_missing_grade_column() {
        let temp_dir = tempfile::tempdir().unwrap();
        let only_name = write_manifest(temp_dir.path(), "name\ntrain_1\n");
        assert!(matches!(
            read_manifest(&only_name, None).unwrap_err(),
            PrepError::MissingColumn { .. }
        ));

        let path = write_manifest(temp_dir.path(), "name,grade\ntrain_1,benign\n");
        assert!(matches!(
            read_manifest(&path, Some("stage")).unwrap_err(),
            PrepError::MissingColumn { ref column, .. } if column == "stage"
        ));
    }

    #[test]
    fn test_ragged_rows_are_malformed() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = write_manifest(temp_dir.path(), "name,grade\ntrain_1,benign,extra\n");

        let err = read_manifest(&path, None).unwrap_err();

        assert!(matches!(err, PrepError::Csv { .. }));
    }

    #[test]
    fn test_duplicate_identifier() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = write_manifest(
            temp_dir.path(),
            "name,grade\ntrain_1,benign\ntrain_1,malignant\n",
        );

        let err = read_manifest(&path, None).unwrap_err();

        assert!(matches!(err, PrepError::DuplicateIdentifier { ref name } if name == "train_1"));
    }

    #[test]
    fn test_identifier_must_be_a_file_name() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = write_manifest(temp_dir.path(), "name,grade\n../train_1,benign\n");
        assert!(matches!(
            read_manifest(&path, None).unwrap_err(),
            PrepError::UnsafeIdentifier { .. }
        ));

        let path = write_manifest(temp_dir.path(), "name,grade\n,benign\n");
        assert!(matches!(
            read_manifest(&path, None).unwrap_err(),
            PrepError::EmptyIdentifier { row: 2 }
        ));
    }
}
