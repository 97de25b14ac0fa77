//! Input checks and output naming done before a conversion starts

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use crate::error::{Error, Result};
use crate::pdf::PDF_SIGNATURE;

/// Suffix appended to the input's file stem for the default output name
pub const CONVERTED_SUFFIX: &str = " - converted";

/// Check that `path` names an existing `.pdf` file starting with `%PDF`
pub fn validate_input(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(Error::InvalidInput("No input file given".to_string()));
    }
    if !path.is_file() {
        return Err(Error::InvalidInput(format!("File not found: {}", path.display())));
    }

    let is_pdf = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);
    if !is_pdf {
        return Err(Error::InvalidInput(format!(
            "Not a .pdf file: {}",
            path.display()
        )));
    }

    let mut header = [0u8; 4];
    let mut file = File::open(path)?;
    let read = file.read(&mut header)?;
    if header[..read] != *PDF_SIGNATURE {
        return Err(Error::InvalidInput(format!(
            "File does not start with a PDF header: {}",
            path.display()
        )));
    }

    Ok(())
}

/// `<dir>/<stem> - converted.pdf` next to the input
pub fn converted_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{}{}.pdf", stem, CONVERTED_SUFFIX))
}

/// Check that the directory `output` will be written into exists
pub fn validate_output_dir(output: &Path) -> Result<()> {
    match output.parent() {
        Some(dir) if !dir.as_os_str().is_empty() && !dir.is_dir() => Err(Error::InvalidInput(
            format!("Output directory does not exist: {}", dir.display()),
        )),
        _ => Ok(()),
    }
}
