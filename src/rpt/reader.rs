//! RPT reader (component C3, spec §4.1).
//!
//! Resilient on individual malformed trailer entries (logged and skipped);
//! only unrecoverable header corruption aborts, per spec §7's propagation
//! policy. Grounded on the teacher's bounds-checked `from_bytes`
//! constructors (`FILHeader::from_bytes`, `FileAddress::try_from_bytes`).

use anyhow::{anyhow, Result};
use pretty_hex::PrettyHex;
use tracing::{debug, trace, warn};

use crate::cursor::{find_bytes, ByteCursor};
use crate::error::IRptError;

use super::{
    zlibcodec, Page, PageEntry, Section, BASE_OFFSET, BINARY_ENTRY_LEN, BPAGETBLHDR_MARKER,
    ENDDATA_MARKER, FILE_HDR_LEN, PAGETBLHDR_MARKER, PAGE_COUNT_OFFSET, PAGE_ENTRY_LEN,
    SECTIONHDR_MARKER, SECTIONHDR_PAD, SECTION_COUNT_OFFSET, SECTION_DATA_OFFSET_OFFSET,
    SECTION_TRIPLET_LEN, TABLE_DIR_LEN, TABLE_DIR_OFFSET,
};

/// A fully parsed RPT document. Owns its pages' decompressed text; closing
/// (dropping) it invalidates all derived views (spec §3 lifecycle note).
#[derive(Debug, Clone)]
pub struct RptDocument {
    pub domain_id: i64,
    pub species_id: i64,
    pub timestamp: Option<String>,
    pub pages: Vec<Page>,
    pub sections: Vec<Section>,
    pub binary_body: Option<Vec<u8>>,
}

impl RptDocument {
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < FILE_HDR_LEN {
            return Err(anyhow!(IRptError::TruncatedFile { at: 0, needed: FILE_HDR_LEN }));
        }
        let (domain_id, species_id, timestamp) = parse_file_header(data)?;

        if data.len() < TABLE_DIR_OFFSET + TABLE_DIR_LEN {
            return Err(anyhow!(IRptError::TruncatedFile {
                at: TABLE_DIR_OFFSET,
                needed: TABLE_DIR_LEN,
            }));
        }
        let recorded_page_count = ByteCursor::at(data, PAGE_COUNT_OFFSET).u32_le()?;
        let section_count = ByteCursor::at(data, SECTION_COUNT_OFFSET).u32_le()?;
        let section_data_offset = ByteCursor::at(data, SECTION_DATA_OFFSET_OFFSET).u32_le()?;

        let sections = discover_sections(data, section_count, section_data_offset);
        debug!(
            "recovered {} section(s) (directory advertised {})",
            sections.len(),
            section_count
        );

        let page_entries = discover_page_table(data, recorded_page_count)?;
        if page_entries.len() as u32 != recorded_page_count {
            debug!(
                "PAGETBLHDR entry count ({}) overrides advisory directory count ({})",
                page_entries.len(),
                recorded_page_count
            );
        }

        let mut pages = Vec::with_capacity(page_entries.len());
        for (idx, entry) in page_entries.into_iter().enumerate() {
            let page_number = (idx + 1) as u32;
            let abs = entry.absolute_offset();
            let end = abs
                .checked_add(entry.compressed_size as u64)
                .ok_or(IRptError::InvalidEntry { which: "PAGETBLHDR", index: idx })?;
            if end > data.len() as u64 {
                return Err(anyhow!(IRptError::InvalidEntry {
                    which: "PAGETBLHDR",
                    index: idx,
                }));
            }
            let compressed = &data[abs as usize..end as usize];
            let text = zlibcodec::inflate_exact(compressed, entry.uncompressed_size as usize)
                .map_err(|e| match e {
                    IRptError::DecompressError { expected, actual, .. } => {
                        IRptError::DecompressError { page: page_number, expected, actual }
                    }
                    other => other,
                })?;
            let section_id = sections
                .iter()
                .find(|s| s.contains(page_number))
                .map(|s| s.section_id);
            pages.push(Page { number: page_number, section_id, text, entry });
        }

        let binary_body = discover_binary_body(data);

        Ok(RptDocument {
            domain_id,
            species_id,
            timestamp,
            pages,
            sections,
            binary_body,
        })
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page_text(&self, number: u32) -> Option<&[u8]> {
        self.pages.iter().find(|p| p.number == number).map(|p| p.text.as_slice())
    }

    pub fn section(&self, id: u32) -> Option<&Section> {
        self.sections.iter().find(|s| s.section_id == id)
    }

    /// Concatenates the text of the given page numbers, in order, with no
    /// separator inserted (spec §6 "Output contracts of the extract path").
    pub fn concat_pages(&self, numbers: &[u32]) -> Vec<u8> {
        let mut out = Vec::new();
        for &n in numbers {
            if let Some(text) = self.page_text(n) {
                out.extend_from_slice(text);
            }
        }
        out
    }
}

fn parse_file_header(data: &[u8]) -> Result<(i64, i64, Option<String>)> {
    if !data.starts_with(b"RPTFILEHDR") {
        return Err(anyhow!(IRptError::BadHeader {
            reason: "missing RPTFILEHDR magic".into(),
        }));
    }

    let scan_len = FILE_HDR_LEN.min(192).min(data.len());
    let scan_region = &data[..scan_len];
    let sentinel = scan_region.iter().position(|&b| b == 0x1A).unwrap_or(scan_len);
    let prefix = String::from_utf8_lossy(&data[..sentinel]);

    let mut fields = prefix.split('\t');
    let _magic = fields.next();
    let ids = fields.next().unwrap_or_default();
    let timestamp = fields
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned);

    let mut id_fields = ids.splitn(2, ':');
    let domain_id = id_fields
        .next()
        .and_then(|s| s.trim().parse::<i64>().ok())
        .unwrap_or(0);
    let species_id = id_fields
        .next()
        .and_then(|s| s.trim().parse::<i64>().ok())
        .unwrap_or(0);

    Ok((domain_id, species_id, timestamp))
}

fn parse_triplet(data: &[u8], at: usize) -> Option<Section> {
    if at + SECTION_TRIPLET_LEN > data.len() {
        return None;
    }
    let mut cur = ByteCursor::at(data, at);
    let section_id = cur.u32_le().ok()?;
    let start_page = cur.u32_le().ok()?;
    let page_count = cur.u32_le().ok()?;
    Some(Section { section_id, start_page, page_count })
}

fn at_marker(data: &[u8], pos: usize, marker: &[u8]) -> bool {
    pos + marker.len() <= data.len() && &data[pos..pos + marker.len()] == marker
}

/// Reads section triplets starting at `start`, stopping at `ENDDATA`, an
/// all-zero sentinel triplet, a triplet violating `start_page >= 1 &&
/// page_count >= 1`, or `max_count` triplets (whichever first) — spec §4.1
/// step 3.
fn read_triplets(data: &[u8], start: usize, max_count: Option<u32>) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut pos = start;
    loop {
        if let Some(max) = max_count {
            if sections.len() as u32 >= max {
                break;
            }
        }
        if at_marker(data, pos, ENDDATA_MARKER) {
            break;
        }
        let Some(triplet) = parse_triplet(data, pos) else {
            break;
        };
        if triplet.section_id == 0 && triplet.start_page == 0 && triplet.page_count == 0 {
            trace!("section triplet run terminated by all-zero sentinel at {pos:#x}");
            break;
        }
        if triplet.start_page < 1 || triplet.page_count < 1 {
            let dump_end = (pos + SECTION_TRIPLET_LEN).min(data.len());
            warn!(
                "malformed section triplet at {pos:#x}, stopping scan\n{:?}",
                data[pos..dump_end].hex_dump()
            );
            break;
        }
        sections.push(triplet);
        pos += SECTION_TRIPLET_LEN;
    }
    sections
}

fn discover_sections(data: &[u8], section_count: u32, section_data_offset: u32) -> Vec<Section> {
    let mut sections = Vec::new();

    if section_data_offset >= 16 {
        let window_start = (section_data_offset - 16) as usize;
        if window_start < data.len() {
            let window_end = window_start.saturating_add(4096).min(data.len());
            let window = &data[window_start..window_end];
            if let Some(rel) = find_bytes(window, SECTIONHDR_MARKER) {
                let marker_abs = window_start + rel;
                let triplet_start = marker_abs + SECTIONHDR_MARKER.len() + SECTIONHDR_PAD;
                sections = read_triplets(data, triplet_start, Some(section_count));
            }
        }
    }

    if sections.is_empty() {
        if let Some(marker_abs) = find_bytes(data, SECTIONHDR_MARKER) {
            debug!("directory-guided section lookup empty, falling back to full scan");
            let triplet_start = marker_abs + SECTIONHDR_MARKER.len() + SECTIONHDR_PAD;
            sections = read_triplets(data, triplet_start, None);
        }
    }

    sections
}

fn discover_page_table(data: &[u8], recorded_page_count: u32) -> Result<Vec<PageEntry>> {
    let _ = recorded_page_count; // advisory only; PAGETBLHDR's own entry count is authoritative.
    let marker_abs = find_bytes(data, PAGETBLHDR_MARKER)
        .ok_or_else(|| anyhow!(IRptError::MarkerNotFound { which: "PAGETBLHDR" }))?;

    let mut pos = marker_abs + PAGETBLHDR_MARKER.len();
    let mut entries = Vec::new();
    while !at_marker(data, pos, ENDDATA_MARKER) {
        if pos + PAGE_ENTRY_LEN > data.len() {
            break;
        }
        let mut cur = ByteCursor::at(data, pos);
        let page_offset = cur.u32_le()?;
        cur.skip(4); // reserved
        let line_width = cur.u16_le()?;
        let lines_per_page = cur.u16_le()?;
        let uncompressed_size = cur.u32_le()?;
        let compressed_size = cur.u32_le()?;
        entries.push(PageEntry {
            page_offset,
            line_width,
            lines_per_page,
            uncompressed_size,
            compressed_size,
        });
        pos += PAGE_ENTRY_LEN;
    }
    Ok(entries)
}

/// Parses BPAGETBLHDR, if present, concatenating every entry's byte range
/// into one combined binary body (spec §3, §9 "binary-object page mapping"
/// open question — preserved as a single opaque blob, not associated with
/// individual text pages; see DESIGN.md).
fn discover_binary_body(data: &[u8]) -> Option<Vec<u8>> {
    let marker_abs = find_bytes(data, BPAGETBLHDR_MARKER)?;
    let mut pos = marker_abs + BPAGETBLHDR_MARKER.len();
    let mut body = Vec::new();
    while !at_marker(data, pos, ENDDATA_MARKER) {
        if pos + BINARY_ENTRY_LEN > data.len() {
            break;
        }
        let mut cur = ByteCursor::at(data, pos);
        let object_offset = cur.u32_le().ok()?;
        let object_size = cur.u32_le().ok()?;
        let abs = BASE_OFFSET as u64 + object_offset as u64;
        if let Some(end) = abs.checked_add(object_size as u64) {
            if end <= data.len() as u64 {
                body.extend_from_slice(&data[abs as usize..end as usize]);
            } else {
                let dump_end = (pos + BINARY_ENTRY_LEN).min(data.len());
                warn!(
                    "BPAGETBLHDR entry at {pos:#x} points outside the file, skipping\n{:?}",
                    data[pos..dump_end].hex_dump()
                );
            }
        }
        pos += BINARY_ENTRY_LEN;
    }
    if body.is_empty() {
        None
    } else {
        Some(body)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::rpt::builder::{build, BuildInput};

    #[test]
    fn zero_page_zero_section_rpt_is_valid() {
        let input = BuildInput {
            domain_id: 1,
            species_id: 2,
            timestamp: None,
            pages: vec![],
            binary_body: None,
            sections: vec![],
        };
        let bytes = build(&input).unwrap();
        let doc = RptDocument::parse(&bytes).unwrap();
        assert_eq!(doc.page_count(), 0);
        assert!(doc.sections.is_empty());
    }

    #[test]
    fn bad_header_rejected() {
        let data = vec![0u8; 512];
        assert!(RptDocument::parse(&data).is_err());
    }

    #[test]
    fn truncated_file_rejected() {
        let data = vec![0u8; 16];
        assert!(RptDocument::parse(&data).is_err());
    }
}
