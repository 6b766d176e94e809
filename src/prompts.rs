//! Prompts sent to the vision model by [`crate::pipeline::ocr::VlmOcrEngine`].
//!
//! Kept in one place so the transcription conventions can be inspected in
//! tests and overridden through
//! [`crate::config::ExtractorConfig::ocr_instruction`].

/// System turn of every OCR request.
pub const OCR_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// User turn accompanying the page image.
///
/// Tables come back as HTML, equations as LaTeX, and watermarks, page
/// numbers and images are wrapped in tags so downstream renderers can keep
/// or drop them.
pub const OCR_INSTRUCTION: &str = "Extract the text from the above document as if you were reading it naturally. \
Return the tables in html format. \
Return the equations in LaTeX representation. \
If there is an image in the document and image caption is not present, add a small description of the image inside the <img></img> tag; otherwise, add the image caption inside <img></img>. \
Watermarks should be wrapped in brackets. Ex: <watermark>OFFICIAL COPY</watermark>. \
Page numbers should be wrapped in brackets. Ex: <page_number>14</page_number> or <page_number>9/22</page_number>. \
Prefer using ☐ and ☑ for check boxes.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instruction_names_every_convention() {
        for needle in ["html format", "LaTeX", "<img></img>", "<watermark>", "<page_number>", "☐", "☑"] {
            assert!(OCR_INSTRUCTION.contains(needle), "missing {needle}");
        }
    }

    #[test]
    fn instruction_is_single_line() {
        assert!(!OCR_INSTRUCTION.contains('\n'));
    }
}
