//! RPT builder (component C4, spec §4.2) — the inverse of the reader.
//!
//! Grounded on the teacher's "write to a temp path, rename on success"
//! discipline (visible in `page_extractor.rs`'s output handling) so a failed
//! build never leaves a half-written `.rpt` at the destination path.

use std::io::Write;
use std::path::Path;

use anyhow::{anyhow, Result};
use tracing::debug;

use super::zlibcodec;
use crate::error::{IRptError, IoKind};

/// One page to be written, pre-compression.
#[derive(Debug, Clone)]
pub struct BuildPage {
    pub text: Vec<u8>,
    pub line_width: u16,
    pub lines_per_page: u16,
}

/// A named span of pages to record in SECTIONHDR.
#[derive(Debug, Clone)]
pub struct BuildSection {
    pub section_id: u32,
    pub start_page: u32,
    pub page_count: u32,
}

/// Everything needed to assemble an RPT file from scratch (spec §4.2).
#[derive(Debug, Clone)]
pub struct BuildInput {
    pub domain_id: i64,
    pub species_id: i64,
    pub timestamp: Option<String>,
    pub pages: Vec<BuildPage>,
    pub sections: Vec<BuildSection>,
    pub binary_body: Option<Vec<u8>>,
}

const BASE_OFFSET: usize = super::BASE_OFFSET as usize;

/// Builds the full byte image of an RPT file in memory.
pub fn build(input: &BuildInput) -> Result<Vec<u8>> {
    validate_sections(input)?;

    let mut out = vec![0u8; BASE_OFFSET];
    write_file_header(&mut out, input)?;

    // RPTINSTHDR: opaque, zero-filled instance header region (spec §3 — no
    // fields in it are read or written by this toolkit). Followed by the
    // 48-byte table directory reservation, so page data starts at 0x200
    // and never overlaps the back-patched directory fields.
    out.resize(super::DATA_REGION_OFFSET, 0);
    debug_assert_eq!(BASE_OFFSET + super::INST_HDR_LEN + super::TABLE_DIR_LEN, super::DATA_REGION_OFFSET);

    let data_start = out.len();
    let mut compressed_pages = Vec::with_capacity(input.pages.len());
    for page in &input.pages {
        let compressed = zlibcodec::deflate_default(&page.text);
        compressed_pages.push(compressed);
    }

    let mut cursor = data_start;
    let mut page_offsets = Vec::with_capacity(input.pages.len());
    for compressed in &compressed_pages {
        page_offsets.push(cursor - BASE_OFFSET);
        out.extend_from_slice(compressed);
        cursor += compressed.len();
    }

    out.extend_from_slice(super::SECTIONHDR_MARKER);
    out.extend_from_slice(&[0u8; super::SECTIONHDR_PAD]);
    // Absolute offset of the first triplet; the reader's directory-guided
    // lookup looks back 16 bytes from here to find the marker, so this must
    // stay pinned to the marker regardless of how many triplets follow.
    let section_data_offset = u32::try_from(out.len())
        .map_err(|_| IRptError::BuildInconsistency { reason: "file exceeds u32 range".into() })?;
    for section in &input.sections {
        out.extend_from_slice(&section.section_id.to_le_bytes());
        out.extend_from_slice(&section.start_page.to_le_bytes());
        out.extend_from_slice(&section.page_count.to_le_bytes());
    }
    out.extend_from_slice(super::ENDDATA_MARKER);

    let page_table_offset = out.len();
    out.extend_from_slice(super::PAGETBLHDR_MARKER);
    for (page, (offset, compressed)) in input
        .pages
        .iter()
        .zip(page_offsets.iter().zip(compressed_pages.iter()))
    {
        let page_offset = u32::try_from(*offset).map_err(|_| {
            IRptError::BuildInconsistency { reason: "page offset exceeds u32 range".into() }
        })?;
        out.extend_from_slice(&page_offset.to_le_bytes());
        out.extend_from_slice(&[0u8; 4]); // reserved
        out.extend_from_slice(&page.line_width.to_le_bytes());
        out.extend_from_slice(&page.lines_per_page.to_le_bytes());
        let uncompressed_size = u32::try_from(page.text.len()).map_err(|_| {
            IRptError::BuildInconsistency { reason: "page larger than u32::MAX bytes".into() }
        })?;
        let compressed_size = u32::try_from(compressed.len()).map_err(|_| {
            IRptError::BuildInconsistency { reason: "compressed page larger than u32::MAX".into() }
        })?;
        out.extend_from_slice(&uncompressed_size.to_le_bytes());
        out.extend_from_slice(&compressed_size.to_le_bytes());
        out.extend_from_slice(&[0u8; 4]); // reserved
    }
    out.extend_from_slice(super::ENDDATA_MARKER);

    if let Some(body) = &input.binary_body {
        out.extend_from_slice(super::BPAGETBLHDR_MARKER);
        out.extend_from_slice(&[0u8; 8]); // offset + size, back-patched below
        out.extend_from_slice(&[0u8; 8]); // reserved x2
        out.extend_from_slice(super::ENDDATA_MARKER);

        let entry_offset = out.len() - super::BPAGETBLHDR_MARKER.len() - 16 - super::ENDDATA_MARKER.len();
        let binary_offset = (out.len() - BASE_OFFSET) as u32;
        out.extend_from_slice(body);

        let object_size = u32::try_from(body.len()).map_err(|_| {
            IRptError::BuildInconsistency { reason: "binary object larger than u32::MAX".into() }
        })?;
        let field_start = entry_offset + super::BPAGETBLHDR_MARKER.len();
        out[field_start..field_start + 4].copy_from_slice(&binary_offset.to_le_bytes());
        out[field_start + 4..field_start + 8].copy_from_slice(&object_size.to_le_bytes());
    }

    let _ = page_table_offset; // PAGETBLHDR is always located by full-scan, not via the directory.

    // Back-patch the table directory now that every offset is known.
    write_table_dir(&mut out, input, section_data_offset)?;

    debug!(
        "built RPT image: {} page(s), {} section(s), {} byte(s)",
        input.pages.len(),
        input.sections.len(),
        out.len()
    );
    Ok(out)
}

/// Builds and atomically writes the image to `path` (write-to-temp-then-rename).
pub fn build_to_file(input: &BuildInput, path: &Path) -> Result<()> {
    let bytes = build(input)?;
    let tmp_path = path.with_extension("rpt.tmp");
    let write_result = (|| -> Result<()> {
        let mut file = std::fs::File::create(&tmp_path).map_err(|e| IRptError::Io {
            path: tmp_path.clone(),
            kind: IoKind::Write,
            reason: e.to_string(),
        })?;
        file.write_all(&bytes).map_err(|e| IRptError::Io {
            path: tmp_path.clone(),
            kind: IoKind::Write,
            reason: e.to_string(),
        })?;
        Ok(())
    })();

    if let Err(e) = write_result {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e);
    }

    std::fs::rename(&tmp_path, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp_path);
        IRptError::Io { path: path.to_path_buf(), kind: IoKind::Write, reason: e.to_string() }
    })?;
    Ok(())
}

fn validate_sections(input: &BuildInput) -> Result<()> {
    let total_pages = input.pages.len() as u32;
    for section in &input.sections {
        let end = section
            .start_page
            .checked_add(section.page_count)
            .ok_or_else(|| IRptError::BuildInconsistency { reason: "section page range overflows".into() })?;
        if section.start_page < 1 || end - 1 > total_pages {
            return Err(anyhow!(IRptError::BuildInconsistency {
                reason: format!(
                    "section {} covers pages {}..{} but the document has {} page(s)",
                    section.section_id, section.start_page, end - 1, total_pages
                ),
            }));
        }
    }
    Ok(())
}

fn write_file_header(out: &mut [u8], input: &BuildInput) -> Result<()> {
    out[..10].copy_from_slice(b"RPTFILEHDR");
    let timestamp = input.timestamp.as_deref().unwrap_or("");
    let prefix = format!(
        "RPTFILEHDR\t{}:{}\t{}",
        input.domain_id, input.species_id, timestamp
    );
    let bytes = prefix.as_bytes();
    if bytes.len() >= 192 {
        return Err(anyhow!(IRptError::BuildInconsistency {
            reason: "file header prefix exceeds the 192-byte sentinel budget".into(),
        }));
    }
    out[..bytes.len()].copy_from_slice(bytes);
    out[bytes.len()] = 0x1A;
    Ok(())
}

fn write_table_dir(out: &mut [u8], input: &BuildInput, section_data_offset: u32) -> Result<()> {
    let page_count = u32::try_from(input.pages.len())
        .map_err(|_| IRptError::BuildInconsistency { reason: "too many pages".into() })?;
    let section_count = u32::try_from(input.sections.len())
        .map_err(|_| IRptError::BuildInconsistency { reason: "too many sections".into() })?;

    out[super::PAGE_COUNT_OFFSET..super::PAGE_COUNT_OFFSET + 4]
        .copy_from_slice(&page_count.to_le_bytes());
    out[super::SECTION_COUNT_OFFSET..super::SECTION_COUNT_OFFSET + 4]
        .copy_from_slice(&section_count.to_le_bytes());
    out[super::SECTION_DATA_OFFSET_OFFSET..super::SECTION_DATA_OFFSET_OFFSET + 4]
        .copy_from_slice(&section_data_offset.to_le_bytes());
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::rpt::reader::RptDocument;

    fn sample_input() -> BuildInput {
        BuildInput {
            domain_id: 42,
            species_id: 7,
            timestamp: Some("2026-01-01T00:00:00".into()),
            pages: vec![
                BuildPage { text: b"first page\n".to_vec(), line_width: 80, lines_per_page: 1 },
                BuildPage { text: b"second page\n".to_vec(), line_width: 80, lines_per_page: 1 },
            ],
            sections: vec![BuildSection { section_id: 1, start_page: 1, page_count: 2 }],
            binary_body: None,
        }
    }

    #[test]
    fn builds_and_reparses_round_trip() {
        let input = sample_input();
        let bytes = build(&input).unwrap();
        let doc = RptDocument::parse(&bytes).unwrap();

        assert_eq!(doc.domain_id, 42);
        assert_eq!(doc.species_id, 7);
        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.page_text(1).unwrap(), b"first page\n");
        assert_eq!(doc.page_text(2).unwrap(), b"second page\n");
        assert_eq!(doc.sections.len(), 1);
        assert_eq!(doc.sections[0].section_id, 1);
    }

    #[test]
    fn rejects_section_spanning_past_last_page() {
        let mut input = sample_input();
        input.sections.push(BuildSection { section_id: 2, start_page: 2, page_count: 5 });
        assert!(build(&input).is_err());
    }

    #[test]
    fn binary_body_round_trips() {
        let mut input = sample_input();
        input.binary_body = Some(b"\x00\x01binary-blob\xff".to_vec());
        let bytes = build(&input).unwrap();
        let doc = RptDocument::parse(&bytes).unwrap();
        assert_eq!(doc.binary_body.as_deref(), Some(b"\x00\x01binary-blob\xff".as_slice()));
    }

    #[test]
    fn build_to_file_writes_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.rpt");
        build_to_file(&sample_input(), &path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert!(RptDocument::parse(&bytes).is_ok());
        assert!(!path.with_extension("rpt.tmp").exists());
    }
}
