//! Stored document bytes to plain text.

use std::borrow::Cow;

use crate::error::{Error, Result};

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Page text joined by a single space for PDFs, lossy UTF-8 otherwise.
pub fn document_text(bytes: &[u8]) -> Result<Cow<'_, str>> {
    if !bytes.starts_with(PDF_MAGIC) {
        return Ok(String::from_utf8_lossy(bytes));
    }
    let doc = lopdf::Document::load_mem(bytes).map_err(|e| Error::Decode(format!("pdf: {e}")))?;
    let pages: Vec<u32> = doc.get_pages().into_keys().collect();
    let mut texts = Vec::with_capacity(pages.len());
    for page in &pages {
        let text = doc
            .extract_text(&[*page])
            .map_err(|e| Error::Decode(format!("pdf page {page}: {e}")))?;
        texts.push(text.trim().to_string());
    }
    tracing::debug!(pages = pages.len(), "extracted pdf text");
    Ok(Cow::Owned(texts.join(" ")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    fn pdf_with_pages(lines: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for line in lines {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*line)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! { "Type" => "Pages", "Kids" => kids, "Count" => count }),
        );
        let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn pdf_pages_are_extracted_in_order() {
        let bytes = pdf_with_pages(&["Refunds take five business days", "Call the warehouse first"]);
        let text = document_text(&bytes).unwrap();

        assert!(!text.starts_with("%PDF"));
        let refunds = text.find("Refunds take five business days").expect("first page text");
        let warehouse = text.find("Call the warehouse first").expect("second page text");
        assert!(refunds < warehouse);
    }

    #[test]
    fn plain_text_passes_through_unchanged() {
        let text = document_text(b"Returns must be filed within 30 days.").unwrap();
        assert!(matches!(text, Cow::Borrowed(_)));
        assert_eq!(text, "Returns must be filed within 30 days.");
    }

    #[test]
    fn truncated_pdf_is_a_decode_error() {
        let err = document_text(b"%PDF-1.5\n1 0 obj\n<<").unwrap_err();
        assert_eq!(err.kind(), "decode");
    }
}
