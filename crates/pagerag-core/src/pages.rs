//! Page readers: turn a source document into `PageText` records.
//!
//! Text extraction itself is delegated. `.txt` files are read directly and
//! split on form feeds (the page separator `pdftotext` emits); `.pdf` files
//! are piped through the external `pdftotext` command.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::Error;
use crate::types::PageText;

const PAGE_SEPARATOR: char = '\x0c';
const SUPPORTED_EXTENSIONS: [&str; 2] = ["pdf", "txt"];

/// Split extracted text into pages, flatten line breaks and drop empty pages.
///
/// Page numbers are physical positions, so skipped blank pages leave gaps.
pub fn split_pages(raw: &str, source: &str) -> Vec<PageText> {
    raw.split(PAGE_SEPARATOR)
        .enumerate()
        .filter_map(|(idx, page)| {
            let cleaned = page.replace("\r\n", " ").replace('\n', " ");
            let cleaned = cleaned.trim();
            if cleaned.is_empty() {
                return None;
            }
            let page_no = u32::try_from(idx + 1).ok()?;
            Some(PageText::new(page_no, cleaned, source))
        })
        .collect()
}

fn file_name(path: &Path) -> String {
    path.file_name().map_or_else(|| path.to_string_lossy().to_string(), |n| n.to_string_lossy().to_string())
}

fn extension(path: &Path) -> Option<String> {
    path.extension().and_then(|s| s.to_str()).map(str::to_ascii_lowercase)
}

pub fn read_text_pages(path: &Path) -> Result<Vec<PageText>> {
    if !path.exists() {
        return Err(Error::NotFound(format!("document not found: {}", path.display())).into());
    }
    let raw = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(_) => String::from_utf8_lossy(&fs::read(path).with_context(|| format!("reading {}", path.display()))?).to_string(),
    };
    Ok(split_pages(&raw, &file_name(path)))
}

/// Runs `pdftotext <file> -` and splits its output on form feeds.
#[derive(Debug, Clone)]
pub struct PdfToTextReader {
    program: PathBuf,
}

impl Default for PdfToTextReader {
    fn default() -> Self { Self { program: PathBuf::from("pdftotext") } }
}

impl PdfToTextReader {
    pub fn with_program(program: impl Into<PathBuf>) -> Self { Self { program: program.into() } }

    pub fn read(&self, path: &Path) -> Result<Vec<PageText>> {
        if !path.exists() {
            return Err(Error::NotFound(format!("PDF file not found: {}", path.display())).into());
        }
        let output = Command::new(&self.program)
            .arg("-enc")
            .arg("UTF-8")
            .arg(path)
            .arg("-")
            .output()
            .with_context(|| format!("Error reading PDF: failed to run {}", self.program.display()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Operation(format!("Error reading PDF {}: {}", path.display(), stderr.trim())).into());
        }
        let raw = String::from_utf8_lossy(&output.stdout);
        let pages = split_pages(&raw, &file_name(path));
        tracing::debug!(path = %path.display(), pages = pages.len(), "extracted pdf text");
        Ok(pages)
    }
}

/// Read a `.pdf` or `.txt` document into pages.
pub fn read_pages(path: &Path) -> Result<Vec<PageText>> {
    match extension(path).as_deref() {
        Some("pdf") => PdfToTextReader::default().read(path),
        Some("txt") => read_text_pages(path),
        _ => Err(Error::Operation(format!("unsupported document type: {}", path.display())).into()),
    }
}

/// All supported documents under `root` (or `root` itself if it is a file), sorted.
pub fn collect_documents(root: &Path) -> Vec<PathBuf> {
    if root.is_file() {
        return vec![root.to_path_buf()];
    }
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().to_path_buf())
        .filter(|p| extension(p).is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str())))
        .collect();
    files.sort();
    files
}
