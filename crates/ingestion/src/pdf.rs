//! PDF text extraction module
//!
//! Extracts text content from uploaded PDF bytes using lopdf. String
//! operands are decoded through the font selected by `Tf`, see
//! [`crate::fonts`].

use crate::errors::IngestionError;
use crate::fonts::{page_fonts, FontDecoder, PageFonts};
use lopdf::content::Content;
use lopdf::{Document, Object, ObjectId};
use tracing::{debug, warn};

/// Text of a PDF together with its page count
#[derive(Debug, Clone)]
pub struct PdfText {
    pub text: String,
    pub page_count: usize,
}

/// Magic bytes every PDF starts with
const PDF_MAGIC: &[u8] = b"%PDF-";

/// TJ displacement (thousandths of an em) treated as a word gap
const WORD_GAP: f32 = -200.0;

/// Extract text content from PDF bytes
pub fn extract_text_from_pdf(bytes: &[u8], filename: &str) -> Result<PdfText, IngestionError> {
    if !bytes.starts_with(PDF_MAGIC) {
        return Err(IngestionError::CorruptPdf {
            filename: filename.to_string(),
            message: "missing %PDF- header".to_string(),
        });
    }

    let doc = Document::load_mem(bytes).map_err(|e| IngestionError::CorruptPdf {
        filename: filename.to_string(),
        message: format!("Failed to load PDF: {}", e),
    })?;

    if doc.trailer.get(b"Encrypt").is_ok() {
        return Err(IngestionError::Encrypted {
            filename: filename.to_string(),
        });
    }

    let pages = doc.get_pages();
    let page_count = pages.len();

    debug!(page_count, "Extracting text from PDF");

    let mut page_texts = Vec::with_capacity(page_count);
    for (page_num, page_id) in pages {
        match extract_page_text(&doc, page_id) {
            Ok(page_text) => {
                let cleaned = clean_text(&page_text);
                if !cleaned.is_empty() {
                    page_texts.push(cleaned);
                }
            }
            Err(e) => {
                warn!(page = page_num, error = %e, "Failed to extract text from page, skipping");
            }
        }
    }

    let text = page_texts.join("\n\n");
    if text.trim().is_empty() {
        return Err(IngestionError::NoExtractableText {
            filename: filename.to_string(),
        });
    }

    debug!(
        page_count,
        char_count = text.chars().count(),
        "Text extraction complete"
    );

    Ok(PdfText { text, page_count })
}

/// Extract text from a single page
fn extract_page_text(doc: &Document, page_id: ObjectId) -> Result<String, lopdf::Error> {
    let content = doc.get_page_content(page_id)?;
    let content = Content::decode(&content)?;
    let fonts = page_fonts(doc, page_id);
    Ok(text_from_operations(&content, &fonts))
}

/// Walk the content stream's text operators
fn text_from_operations(content: &Content, fonts: &PageFonts) -> String {
    let fallback = FontDecoder::WinAnsi;
    let mut font = &fallback;
    let mut text = String::new();

    for operation in &content.operations {
        match operation.operator.as_str() {
            "Tf" => {
                if let Some(Object::Name(name)) = operation.operands.first() {
                    font = fonts.get(name).unwrap_or(&fallback);
                }
            }
            "Tj" => {
                if let Some(Object::String(bytes, _)) = operation.operands.first() {
                    text.push_str(&font.decode(bytes));
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = operation.operands.first() {
                    for item in items {
                        match item {
                            Object::String(bytes, _) => text.push_str(&font.decode(bytes)),
                            Object::Integer(n) if (*n as f32) <= WORD_GAP => text.push(' '),
                            Object::Real(n) if *n <= WORD_GAP => text.push(' '),
                            _ => {}
                        }
                    }
                }
            }
            // ' and " move to the next line before showing text
            "'" | "\"" => {
                text.push('\n');
                if let Some(Object::String(bytes, _)) = operation.operands.last() {
                    text.push_str(&font.decode(bytes));
                }
            }
            "T*" | "Td" | "TD" | "ET" => text.push('\n'),
            _ => {}
        }
    }

    text
}

/// Collapse runs of spaces within lines and runs of blank lines
fn clean_text(text: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut previous_blank = true;

    for line in text.lines() {
        let visible: String = line
            .chars()
            .filter(|&c| c != '\u{FEFF}')
            .map(|c| if c.is_control() { ' ' } else { c })
            .collect();
        let collapsed = visible
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");

        if collapsed.is_empty() {
            if !previous_blank {
                lines.push(String::new());
            }
            previous_blank = true;
        } else {
            lines.push(collapsed);
            previous_blank = false;
        }
    }

    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }

    lines.join("\n")
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lopdf::content::Operation;
    use lopdf::{dictionary, Dictionary, StringFormat, Stream};

    /// Build a PDF with one text line per page
    pub(crate) fn build_pdf(pages: &[&str]) -> Vec<u8> {
        let strings = pages.iter().map(|p| Object::string_literal(*p)).collect();
        build_pdf_with_font(
            |_| {
                dictionary! {
                    "Type" => "Font",
                    "Subtype" => "Type1",
                    "BaseFont" => "Courier",
                }
            },
            strings,
        )
    }

    /// Build a PDF whose pages show one string operand each in font `F1`
    fn build_pdf_with_font(
        font: impl FnOnce(&mut Document) -> Dictionary,
        pages: Vec<Object>,
    ) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font = font(&mut doc);
        let font_id = doc.add_object(font);
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for page_string in pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new("Tj", vec![page_string]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_extracts_pages_in_order() {
        let bytes = build_pdf(&["Attention is all you need", "Results improve BLEU"]);
        let pdf = extract_text_from_pdf(&bytes, "paper.pdf").unwrap();

        assert_eq!(pdf.page_count, 2);
        let first = pdf.text.find("Attention").unwrap();
        let second = pdf.text.find("Results improve BLEU").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_rejects_missing_header() {
        let err = extract_text_from_pdf(b"hello world", "fake.pdf").unwrap_err();
        assert!(matches!(err, IngestionError::CorruptPdf { .. }));
    }

    #[test]
    fn test_rejects_truncated_pdf() {
        let err = extract_text_from_pdf(b"%PDF-1.5\n%garbage", "broken.pdf").unwrap_err();
        assert!(matches!(
            err,
            IngestionError::CorruptPdf { .. } | IngestionError::NoExtractableText { .. }
        ));
    }

    #[test]
    fn test_blank_pdf_has_no_text() {
        let bytes = build_pdf(&["   "]);
        let err = extract_text_from_pdf(&bytes, "blank.pdf").unwrap_err();
        assert!(matches!(err, IngestionError::NoExtractableText { .. }));
    }

    fn type0_font(doc: &mut Document, cmap: Option<&[u8]>) -> Dictionary {
        let mut font = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "BaseFont" => "CMR10",
            "Encoding" => "Identity-H",
        };
        if let Some(cmap) = cmap {
            let cmap_id = doc.add_object(Stream::new(dictionary! {}, cmap.to_vec()));
            font.set("ToUnicode", cmap_id);
        }
        font
    }

    const HI_CMAP: &[u8] = b"begincmap
1 begincodespacerange <0000> <FFFF> endcodespacerange
2 beginbfchar <0001> <0048> <0002> <0069> endbfchar
endcmap";

    fn identity_string(codes: &[u8]) -> Object {
        Object::String(codes.to_vec(), StringFormat::Hexadecimal)
    }

    #[test]
    fn test_type0_font_decodes_through_to_unicode() {
        let bytes = build_pdf_with_font(
            |doc| type0_font(doc, Some(HI_CMAP)),
            vec![identity_string(&[0x00, 0x01, 0x00, 0x02])],
        );
        let pdf = extract_text_from_pdf(&bytes, "latex.pdf").unwrap();
        assert_eq!(pdf.text, "Hi");
    }

    #[test]
    fn test_type0_font_without_map_has_no_text() {
        let bytes = build_pdf_with_font(
            |doc| type0_font(doc, None),
            vec![identity_string(&[0x00, 0x01, 0x00, 0x02])],
        );
        let err = extract_text_from_pdf(&bytes, "latex.pdf").unwrap_err();
        assert!(matches!(err, IngestionError::NoExtractableText { .. }));
    }

    #[test]
    fn test_win_ansi_quotes() {
        let bytes = build_pdf_with_font(
            |_| {
                dictionary! {
                    "Type" => "Font",
                    "Subtype" => "Type1",
                    "BaseFont" => "Times-Roman",
                    "Encoding" => "WinAnsiEncoding",
                }
            },
            vec![Object::String(
                vec![0x93, b'B', b'E', b'R', b'T', 0x94, b' ', 0x96, b' ', b'o', b'k'],
                StringFormat::Literal,
            )],
        );
        let pdf = extract_text_from_pdf(&bytes, "quotes.pdf").unwrap();
        assert_eq!(pdf.text, "\u{201C}BERT\u{201D} \u{2013} ok");
    }

    #[test]
    fn test_tj_array_spacing() {
        let content = Content {
            operations: vec![
                Operation::new(
                    "TJ",
                    vec![Object::Array(vec![
                        Object::string_literal("Deep"),
                        Object::Integer(-300),
                        Object::string_literal("Lea"),
                        Object::Integer(-20),
                        Object::string_literal("rning"),
                    ])],
                ),
                Operation::new("T*", vec![]),
                Operation::new("'", vec![Object::string_literal("next line")]),
            ],
        };
        let text = clean_text(&text_from_operations(&content, &PageFonts::new()));
        assert_eq!(text, "Deep Learning\n\nnext line");
    }

    #[test]
    fn test_control_characters_are_not_text() {
        assert_eq!(clean_text("\0\u{1}\0\u{2}"), "");
        assert_eq!(clean_text("A\u{7}B"), "A B");
    }

    #[test]
    fn test_clean_text() {
        let input = "Hello   World\n\n\n\nTest  \n";
        assert_eq!(clean_text(input), "Hello World\n\nTest");
    }
}
