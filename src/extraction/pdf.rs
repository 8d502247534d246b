use std::fmt::Display;
use std::path::Path;

use lopdf::Document;

use super::ExtractionError;

/// Read every page of the staged PDF and concatenate the text in page order.
///
/// Pages whose content cannot be decoded (scanned images, unsupported font encodings) are
/// skipped with a warning. A document where no page yields text is an error.
pub(super) fn extract_pdf(path: &Path) -> Result<String, ExtractionError> {
    let document =
        Document::load(path).map_err(|error| ExtractionError::Pdf(error.to_string()))?;

    let pages = document.get_pages();
    let text = collect_pages(
        pages
            .keys()
            .map(|page_number| (*page_number, document.extract_text(&[*page_number]))),
    )?;

    tracing::debug!(pages = pages.len(), chars = text.len(), "PDF text extraction complete");
    Ok(text)
}

fn collect_pages<I, E>(pages: I) -> Result<String, ExtractionError>
where
    I: IntoIterator<Item = (u32, Result<String, E>)>,
    E: Display,
{
    let mut text = String::new();
    let mut total = 0usize;
    let mut skipped = 0usize;
    for (page_number, page) in pages {
        total += 1;
        match page {
            Ok(page_text) => text.push_str(&page_text),
            Err(error) => {
                skipped += 1;
                tracing::warn!(page = page_number, error = %error, "Skipping page without extractable text");
            }
        }
    }

    if total > 0 && skipped == total {
        return Err(ExtractionError::Pdf(format!(
            "no extractable text on any of {total} pages"
        )));
    }
    Ok(text)
}
