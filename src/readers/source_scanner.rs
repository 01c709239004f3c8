use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ProcessingError, Result};
use crate::models::SourceMetadata;
use crate::utils::constants::{SOURCE_FILE_EXTENSION, SOURCE_FILE_PREFIX};

/// A source file together with the metadata parsed from its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub metadata: SourceMetadata,
}

/// Finds sgpmet observation exports in a directory.
pub struct SourceScanner {
    dir: PathBuf,
}

impl SourceScanner {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    /// Every export in the directory, ordered by date then file name. Files
    /// that only look like exports but carry a malformed name are skipped.
    pub fn scan(&self) -> Result<Vec<SourceFile>> {
        if !self.dir.is_dir() {
            return Err(ProcessingError::InvalidFormat(format!(
                "Path is not a directory: {}",
                self.dir.display()
            )));
        }

        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if !path.is_file() || path.extension().map_or(true, |ext| ext != SOURCE_FILE_EXTENSION) {
                continue;
            }

            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !name.starts_with(SOURCE_FILE_PREFIX) {
                continue;
            }

            match SourceMetadata::from_filename(name) {
                Ok(metadata) => files.push(SourceFile { path, metadata }),
                Err(e) => debug!(file = name, error = %e, "skipping unrecognized file"),
            }
        }

        files.sort_by(|a, b| {
            a.metadata
                .date
                .cmp(&b.metadata.date)
                .then_with(|| a.path.cmp(&b.path))
        });
        Ok(files)
    }

    /// Exports of one instrument within one calendar year.
    pub fn files_for(&self, instrument_id: &str, year: i32) -> Result<Vec<SourceFile>> {
        Ok(self
            .scan()?
            .into_iter()
            .filter(|f| f.metadata.matches(instrument_id, year))
            .collect())
    }

    /// Years with at least one export for an instrument.
    pub fn years_for(&self, instrument_id: &str) -> Result<BTreeSet<i32>> {
        Ok(self
            .scan()?
            .iter()
            .filter(|f| f.metadata.instrument_id == instrument_id)
            .map(|f| f.metadata.year())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        File::create(dir.join(name)).unwrap();
    }

    #[test]
    fn test_scan_filters_by_metadata() -> Result<()> {
        let dir = TempDir::new()?;
        touch(dir.path(), "sgpmetE11.b1.20160102.000000.csv");
        touch(dir.path(), "sgpmetE11.b1.20160101.000000.csv");
        touch(dir.path(), "sgpmetE13.b1.20160101.000000.csv");
        touch(dir.path(), "sgpmetE11.b1.20170101.000000.csv");
        touch(dir.path(), "sgpmetE11.b1.2016xx01.000000.csv");
        touch(dir.path(), "sgpmetE11.b1.20160103.000000.cdf");
        touch(dir.path(), "notes.csv");

        let scanner = SourceScanner::new(dir.path());
        assert_eq!(scanner.scan()?.len(), 4);

        let files = scanner.files_for("E11", 2016)?;
        let names: Vec<String> = files
            .iter()
            .map(|f| f.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec![
                "sgpmetE11.b1.20160101.000000.csv",
                "sgpmetE11.b1.20160102.000000.csv"
            ]
        );

        let years: Vec<i32> = scanner.years_for("E11")?.into_iter().collect();
        assert_eq!(years, vec![2016, 2017]);
        Ok(())
    }

    #[test]
    fn test_missing_directory() {
        let scanner = SourceScanner::new(Path::new("/nonexistent/sgpmet"));
        assert!(scanner.scan().is_err());
    }
}
