//! OCR recovery for pages with a poor text layer.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::OcrError;
use crate::models::OcrConfig;

/// Recognizes the text of a single PDF page from its image.
pub trait OcrEngine: Send + Sync {
    fn recognize_page(&self, pdf_path: &Path, page_number: u32) -> Result<String, OcrError>;
}

/// Renders a page with `pdftoppm` and reads it back with `tesseract`.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    pdftoppm: String,
    tesseract: String,
    language: String,
    dpi: u32,
}

impl TesseractOcr {
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            pdftoppm: config.pdftoppm_path.clone(),
            tesseract: config.tesseract_path.clone(),
            language: config.language.clone(),
            dpi: config.dpi,
        }
    }

    /// Fail early when either tool is missing from the system.
    pub fn check_tools(&self) -> Result<(), OcrError> {
        for (tool, flag) in [(&self.pdftoppm, "-v"), (&self.tesseract, "--version")] {
            if !command_available(tool, flag) {
                return Err(OcrError::ToolMissing(tool.clone()));
            }
        }
        Ok(())
    }

    fn render(&self, pdf_path: &Path, page: u32, dir: &Path) -> Result<PathBuf, OcrError> {
        let prefix = dir.join("page");
        let page_arg = page.to_string();
        let output = Command::new(&self.pdftoppm)
            .args(["-r", &self.dpi.to_string()])
            .args(["-f", &page_arg, "-l", &page_arg])
            .arg("-png")
            .arg(pdf_path)
            .arg(&prefix)
            .output()
            .map_err(|e| spawn_error(&self.pdftoppm, e))?;

        if !output.status.success() {
            return Err(OcrError::RenderError {
                page,
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        // pdftoppm zero-pads the page suffix depending on the page count
        let image = std::fs::read_dir(dir)?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .find(|path| path.extension().is_some_and(|ext| ext == "png"));

        image.ok_or_else(|| OcrError::RenderError {
            page,
            message: "pdftoppm produced no image".to_string(),
        })
    }
}

impl OcrEngine for TesseractOcr {
    fn recognize_page(&self, pdf_path: &Path, page_number: u32) -> Result<String, OcrError> {
        let workdir = tempfile::tempdir()?;
        let image = self.render(pdf_path, page_number, workdir.path())?;

        let output = Command::new(&self.tesseract)
            .arg(&image)
            .arg("stdout")
            .args(["-l", &self.language])
            .args(["--psm", "6"])
            .args(["-c", "preserve_interword_spaces=1"])
            .stdin(Stdio::null())
            .output()
            .map_err(|e| spawn_error(&self.tesseract, e))?;

        if !output.status.success() {
            return Err(OcrError::RecognitionError {
                page: page_number,
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        tracing::debug!(
            page = page_number,
            chars = text.chars().count(),
            "recognized page"
        );
        Ok(text)
    }
}

fn spawn_error(tool: &str, e: std::io::Error) -> OcrError {
    if e.kind() == std::io::ErrorKind::NotFound {
        OcrError::ToolMissing(tool.to_string())
    } else {
        OcrError::IoError(e)
    }
}

fn command_available(tool: &str, flag: &str) -> bool {
    Command::new(tool)
        .arg(flag)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ocr_with(tool: &str) -> TesseractOcr {
        TesseractOcr::new(&OcrConfig {
            pdftoppm_path: tool.to_string(),
            tesseract_path: tool.to_string(),
            ..Default::default()
        })
    }

    #[test]
    fn test_missing_tool_detected() {
        let ocr = ocr_with("chapterdex-no-such-tool");
        assert!(matches!(ocr.check_tools(), Err(OcrError::ToolMissing(_))));
    }

    #[test]
    fn test_recognize_with_missing_renderer() {
        let ocr = ocr_with("chapterdex-no-such-tool");
        let result = ocr.recognize_page(Path::new("chapter.pdf"), 1);
        assert!(matches!(result, Err(OcrError::ToolMissing(_))));
    }

    #[test]
    fn test_defaults_from_config() {
        let ocr = TesseractOcr::new(&OcrConfig::default());
        assert_eq!(ocr.dpi, 300);
        assert_eq!(ocr.language, "mar+hin+eng");
    }
}
