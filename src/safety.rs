//! Guard against clobbering dataset inputs with the output database.
//!
//! The driver deletes an existing output file before recreating it, so
//! the output path is validated first.

use anyhow::{bail, Result};
use std::path::Path;

/// Validates that an output path is safe to delete and recreate.
///
/// The output must not be one of the source files, and a `.csv`
/// extension is refused outright since it can only be dataset input.
pub fn validate_output_path(output: &Path, sources: &[&Path]) -> Result<()> {
    for source in sources {
        if output == *source {
            bail!(
                "Refusing to overwrite source file '{}' with the output database",
                output.display()
            );
        }
    }

    let looks_like_csv = output
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if looks_like_csv {
        bail!(
            "Refusing to write the output database to a .csv path: '{}'",
            output.display()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_valid_output() {
        let output = PathBuf::from("/tmp/playstore.sqlite3");
        let source = PathBuf::from("/data/googleplaystore.csv");
        assert!(validate_output_path(&output, &[&source]).is_ok());
    }

    #[test]
    fn test_output_equals_source() {
        let path = PathBuf::from("/data/googleplaystore.csv");
        let result = validate_output_path(&path, &[&path]);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Refusing to overwrite source file"));
    }

    #[test]
    fn test_csv_extension_blocked() {
        let output = PathBuf::from("/tmp/export.CSV");
        let source = PathBuf::from("/data/googleplaystore.csv");
        assert!(validate_output_path(&output, &[&source]).is_err());
    }
}
