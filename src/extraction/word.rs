use docx_rs::{DocumentChild, Paragraph, ParagraphChild, Run, RunChild, read_docx};

use super::ExtractionError;

/// Join the text of each top-level body paragraph with `\n`.
///
/// Table cells, headers and footers are not body paragraphs and are skipped.
pub(super) fn extract_word(bytes: &[u8]) -> Result<String, ExtractionError> {
    let docx = read_docx(bytes).map_err(|error| ExtractionError::Document(error.to_string()))?;

    let paragraphs: Vec<String> = docx
        .document
        .children
        .iter()
        .filter_map(|child| match child {
            DocumentChild::Paragraph(paragraph) => Some(paragraph_text(paragraph)),
            _ => None,
        })
        .collect();

    Ok(paragraphs.join("\n"))
}

fn paragraph_text(paragraph: &Paragraph) -> String {
    let mut text = String::new();
    push_children_text(&paragraph.children, &mut text);
    text
}

/// Hyperlinks wrap their own runs; their text belongs to the paragraph.
fn push_children_text(children: &[ParagraphChild], out: &mut String) {
    for child in children {
        match child {
            ParagraphChild::Run(run) => push_run_text(run, out),
            ParagraphChild::Hyperlink(link) => push_children_text(&link.children, out),
            _ => {}
        }
    }
}

fn push_run_text(run: &Run, out: &mut String) {
    for child in &run.children {
        match child {
            RunChild::Text(value) => out.push_str(&value.text),
            RunChild::Tab(_) => out.push('\t'),
            RunChild::Break(_) => out.push('\n'),
            _ => {}
        }
    }
}
