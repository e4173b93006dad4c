//! Font-aware decoding of PDF string operands
//!
//! Bytes inside a content stream are character codes of the current font,
//! not text. They become text through the font's `/ToUnicode` CMap when it
//! has one, or through its one-byte encoding for simple fonts. Composite
//! fonts without a CMap cannot be mapped and yield nothing.

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::HashMap;
use tracing::warn;

/// Resource names of a page mapped to their decoders
pub(crate) type PageFonts = HashMap<Vec<u8>, FontDecoder>;

/// Page tree depth searched for inherited resources
const MAX_TREE_DEPTH: usize = 32;

/// Largest bfrange expanded from a CMap
const MAX_RANGE_SPAN: u32 = 0xFFFF;

#[derive(Debug)]
pub(crate) enum FontDecoder {
    ToUnicode(ToUnicodeMap),
    /// Simple font decoded as WinAnsiEncoding
    WinAnsi,
    /// Composite font with no Unicode mapping
    Undecodable,
}

impl FontDecoder {
    fn for_font(doc: &Document, font: &Dictionary) -> Self {
        let cmap = font
            .get(b"ToUnicode")
            .ok()
            .and_then(|object| resolve(doc, object))
            .and_then(|object| object.as_stream().ok())
            .and_then(stream_bytes)
            .and_then(|data| ToUnicodeMap::parse(&data));
        if let Some(cmap) = cmap {
            return Self::ToUnicode(cmap);
        }

        let subtype = font.get(b"Subtype").and_then(Object::as_name).ok();
        if subtype == Some(&b"Type0"[..]) {
            Self::Undecodable
        } else {
            Self::WinAnsi
        }
    }

    /// Decode one string operand, dropping codes with no mapping
    pub(crate) fn decode(&self, bytes: &[u8]) -> String {
        match self {
            Self::ToUnicode(cmap) => cmap.decode(bytes),
            Self::WinAnsi => bytes.iter().filter_map(|&b| win_ansi_char(b)).collect(),
            Self::Undecodable => String::new(),
        }
    }
}

/// Decoders for every font the page can select with `Tf`
pub(crate) fn page_fonts(doc: &Document, page_id: ObjectId) -> PageFonts {
    let mut fonts = PageFonts::new();
    let Some(font_dict) = inherited_resources(doc, page_id)
        .and_then(|resources| resources.get(b"Font").ok())
        .and_then(|object| resolve_dict(doc, object))
    else {
        return fonts;
    };

    for (name, font) in font_dict.iter() {
        let Some(font) = resolve_dict(doc, font) else {
            continue;
        };
        let decoder = FontDecoder::for_font(doc, font);
        if matches!(decoder, FontDecoder::Undecodable) {
            warn!(
                font = %String::from_utf8_lossy(name),
                "Composite font has no ToUnicode map, its text is skipped"
            );
        }
        fonts.insert(name.clone(), decoder);
    }
    fonts
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn resolve_dict<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Dictionary> {
    resolve(doc, object)?.as_dict().ok()
}

/// Resources of a page, falling back to the nearest ancestor that has them
fn inherited_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(resources) = node.get(b"Resources") {
            return resolve_dict(doc, resources);
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn stream_bytes(stream: &Stream) -> Option<Vec<u8>> {
    if stream.dict.get(b"Filter").is_ok() {
        stream.decompressed_content().ok()
    } else {
        Some(stream.content.clone())
    }
}

/// WinAnsiEncoding, which differs from Latin-1 in 0x80..=0x9F
fn win_ansi_char(byte: u8) -> Option<char> {
    let c = match byte {
        b'\t' => ' ',
        0x20..=0x7E | 0xA0..=0xFF => byte as char,
        0x80 => '\u{20AC}',
        0x82 => '\u{201A}',
        0x83 => '\u{0192}',
        0x84 => '\u{201E}',
        0x85 => '\u{2026}',
        0x86 => '\u{2020}',
        0x87 => '\u{2021}',
        0x88 => '\u{02C6}',
        0x89 => '\u{2030}',
        0x8A => '\u{0160}',
        0x8B => '\u{2039}',
        0x8C => '\u{0152}',
        0x8E => '\u{017D}',
        0x91 => '\u{2018}',
        0x92 => '\u{2019}',
        0x93 => '\u{201C}',
        0x94 => '\u{201D}',
        0x95 => '\u{2022}',
        0x96 => '\u{2013}',
        0x97 => '\u{2014}',
        0x98 => '\u{02DC}',
        0x99 => '\u{2122}',
        0x9A => '\u{0161}',
        0x9B => '\u{203A}',
        0x9C => '\u{0153}',
        0x9E => '\u{017E}',
        0x9F => '\u{0178}',
        _ => return None,
    };
    Some(c)
}

/// Parsed `bfchar`/`bfrange` entries of a ToUnicode CMap
#[derive(Debug)]
pub(crate) struct ToUnicodeMap {
    code_bytes: usize,
    map: HashMap<u32, String>,
}

#[derive(Debug, PartialEq)]
enum CMapToken {
    Hex(Vec<u8>),
    ArrayStart,
    ArrayEnd,
    Word(String),
}

impl ToUnicodeMap {
    /// Parse a CMap program; `None` when it maps nothing
    pub(crate) fn parse(data: &[u8]) -> Option<Self> {
        let tokens = cmap_tokens(data);
        let mut map = HashMap::new();
        let mut code_bytes = None;
        let mut i = 0;

        while i < tokens.len() {
            let CMapToken::Word(word) = &tokens[i] else {
                i += 1;
                continue;
            };
            i += 1;
            match word.as_str() {
                "begincodespacerange" => {
                    if let Some(CMapToken::Hex(low)) = tokens.get(i) {
                        code_bytes.get_or_insert(low.len());
                    }
                }
                "beginbfchar" => {
                    while let (Some(CMapToken::Hex(src)), Some(CMapToken::Hex(dst))) =
                        (tokens.get(i), tokens.get(i + 1))
                    {
                        code_bytes.get_or_insert(src.len());
                        map.insert(code_value(src), utf16_text(dst));
                        i += 2;
                    }
                }
                "beginbfrange" => loop {
                    let (Some(CMapToken::Hex(low)), Some(CMapToken::Hex(high))) =
                        (tokens.get(i), tokens.get(i + 1))
                    else {
                        break;
                    };
                    code_bytes.get_or_insert(low.len());
                    let (low, high) = (code_value(low), code_value(high));
                    if high < low || high - low > MAX_RANGE_SPAN {
                        break;
                    }

                    match tokens.get(i + 2) {
                        Some(CMapToken::Hex(dst)) => {
                            let mut units = utf16_units(dst);
                            for code in low..=high {
                                map.insert(code, String::from_utf16_lossy(&units));
                                if let Some(last) = units.last_mut() {
                                    *last = last.wrapping_add(1);
                                }
                            }
                            i += 3;
                        }
                        Some(CMapToken::ArrayStart) => {
                            i += 3;
                            let mut code = low;
                            while let Some(CMapToken::Hex(dst)) = tokens.get(i) {
                                if code <= high {
                                    map.insert(code, utf16_text(dst));
                                }
                                code += 1;
                                i += 1;
                            }
                            if tokens.get(i) == Some(&CMapToken::ArrayEnd) {
                                i += 1;
                            }
                        }
                        _ => break,
                    }
                },
                _ => {}
            }
        }

        if map.is_empty() {
            return None;
        }
        Some(Self {
            code_bytes: code_bytes.unwrap_or(2).clamp(1, 4),
            map,
        })
    }

    fn decode(&self, bytes: &[u8]) -> String {
        bytes
            .chunks(self.code_bytes)
            .filter_map(|code| self.map.get(&code_value(code)))
            .map(String::as_str)
            .collect()
    }
}

fn code_value(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .take(4)
        .fold(0u32, |acc, &b| (acc << 8) | u32::from(b))
}

fn utf16_units(bytes: &[u8]) -> Vec<u16> {
    if bytes.len() == 1 {
        return vec![u16::from(bytes[0])];
    }
    bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect()
}

fn utf16_text(bytes: &[u8]) -> String {
    String::from_utf16_lossy(&utf16_units(bytes))
}

fn hex_digit(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

fn is_delimiter(byte: u8) -> bool {
    byte.is_ascii_whitespace() || b"<>[]()/%{}".contains(&byte)
}

/// Split a CMap program into the tokens the mapping sections use
fn cmap_tokens(data: &[u8]) -> Vec<CMapToken> {
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < data.len() {
        match data[i] {
            b'<' if data.get(i + 1) == Some(&b'<') => i += 2,
            b'>' if data.get(i + 1) == Some(&b'>') => i += 2,
            b'<' => {
                i += 1;
                let mut digits = Vec::new();
                while i < data.len() && data[i] != b'>' {
                    if let Some(d) = hex_digit(data[i]) {
                        digits.push(d);
                    }
                    i += 1;
                }
                i += 1;
                if digits.len() % 2 == 1 {
                    digits.push(0);
                }
                let bytes = digits.chunks_exact(2).map(|p| (p[0] << 4) | p[1]).collect();
                tokens.push(CMapToken::Hex(bytes));
            }
            b'[' => {
                tokens.push(CMapToken::ArrayStart);
                i += 1;
            }
            b']' => {
                tokens.push(CMapToken::ArrayEnd);
                i += 1;
            }
            b'%' => {
                while i < data.len() && data[i] != b'\n' && data[i] != b'\r' {
                    i += 1;
                }
            }
            b'(' => {
                let mut depth = 0usize;
                while i < data.len() {
                    match data[i] {
                        b'\\' => i += 1,
                        b'(' => depth += 1,
                        b')' => {
                            depth -= 1;
                            if depth == 0 {
                                i += 1;
                                break;
                            }
                        }
                        _ => {}
                    }
                    i += 1;
                }
            }
            b if b.is_ascii_whitespace() => i += 1,
            _ => {
                let start = i;
                i += 1;
                while i < data.len() && !is_delimiter(data[i]) {
                    i += 1;
                }
                tokens.push(CMapToken::Word(
                    String::from_utf8_lossy(&data[start..i]).into_owned(),
                ));
            }
        }
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDENTITY_CMAP: &[u8] = b"/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
/CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def
/CMapName /Adobe-Identity-UCS def
1 begincodespacerange
<0000> <FFFF>
endcodespacerange
2 beginbfchar
<0001> <0048>
<0002> <0069>
endbfchar
2 beginbfrange
<0010> <0012> <0061>
<0020> <0021> [<00660069> <2014>]
endbfrange
endcmap";

    #[test]
    fn test_cmap_bfchar_and_bfrange() {
        let cmap = ToUnicodeMap::parse(IDENTITY_CMAP).unwrap();
        assert_eq!(cmap.code_bytes, 2);
        assert_eq!(cmap.decode(&[0x00, 0x01, 0x00, 0x02]), "Hi");
        assert_eq!(cmap.decode(&[0x00, 0x10, 0x00, 0x11, 0x00, 0x12]), "abc");
        assert_eq!(cmap.decode(&[0x00, 0x20, 0x00, 0x21]), "fi\u{2014}");
    }

    #[test]
    fn test_cmap_drops_unmapped_codes() {
        let cmap = ToUnicodeMap::parse(IDENTITY_CMAP).unwrap();
        assert_eq!(cmap.decode(&[0x00, 0x01, 0x0F, 0xFF, 0x00, 0x02]), "Hi");
    }

    #[test]
    fn test_empty_cmap_is_rejected() {
        assert!(ToUnicodeMap::parse(b"begincmap endcmap").is_none());
    }

    #[test]
    fn test_win_ansi_punctuation() {
        let text = FontDecoder::WinAnsi.decode(&[0x93, b'H', b'i', 0x94, 0x97, 0xE9, 0x01]);
        assert_eq!(text, "\u{201C}Hi\u{201D}\u{2014}é");
    }

    #[test]
    fn test_undecodable_yields_nothing() {
        assert_eq!(FontDecoder::Undecodable.decode(&[0x00, 0x01]), "");
    }
}
