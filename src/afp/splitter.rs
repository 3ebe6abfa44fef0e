//! AFP page segmentation and extraction (spec §4.3 "Page segmentation" /
//! "Extraction modes").

use anyhow::{anyhow, Result};
use tracing::debug;

use crate::error::IRptError;

use super::fields::{self, StructuredField};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AfpPage {
    pub number: u32,
    /// Offset of the Begin Page field itself.
    pub actual_start: usize,
    /// Offset extraction begins at — moved back over a contiguous Begin
    /// Page Group, if one preceded this page.
    pub extract_start: usize,
    /// Exclusive end, immediately after the End Page field.
    pub end: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractMode {
    Clean,
    Raw,
}

#[derive(Debug, Clone)]
pub struct AfpDocument<'a> {
    data: &'a [u8],
    pub pages: Vec<AfpPage>,
}

impl<'a> AfpDocument<'a> {
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        let walked = fields::walk(data);
        let pages = segment_pages(&walked);

        let preamble_end = pages.first().map(|p| p.extract_start).unwrap_or(data.len());
        let has_begin_document = walked
            .iter()
            .any(|f| f.is_begin_document() && f.offset < preamble_end);
        if !has_begin_document {
            return Err(anyhow!(IRptError::InvalidAfp {
                reason: "Begin Document field missing from the preamble".into(),
            }));
        }

        debug!("segmented {} AFP page(s) from {} structured field(s)", pages.len(), walked.len());
        Ok(AfpDocument { data, pages })
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn preamble(&self) -> &'a [u8] {
        let end = self.pages.first().map(|p| p.extract_start).unwrap_or(self.data.len());
        &self.data[..end]
    }

    pub fn postamble(&self) -> &'a [u8] {
        let start = self.pages.last().map(|p| p.end).unwrap_or(0);
        &self.data[start..]
    }

    pub fn page_bytes(&self, number: u32) -> Option<&'a [u8]> {
        self.pages
            .iter()
            .find(|p| p.number == number)
            .map(|p| &self.data[p.extract_start..p.end])
    }

    /// Implements both extraction modes (spec §4.3).
    pub fn extract(&self, page_numbers: &[u32], mode: ExtractMode) -> Result<Vec<u8>> {
        if page_numbers.is_empty() {
            return Err(anyhow!(IRptError::EmptySelection));
        }
        match mode {
            ExtractMode::Clean => {
                let mut out = Vec::new();
                out.extend_from_slice(self.preamble());
                for &n in page_numbers {
                    let bytes = self.page_bytes(n).ok_or_else(|| IRptError::InvalidSelection {
                        text: format!("page {n} out of range"),
                    })?;
                    out.extend_from_slice(bytes);
                }
                out.extend_from_slice(self.postamble());
                Ok(out)
            }
            ExtractMode::Raw => {
                let last = page_numbers.iter().copied().max().expect("checked non-empty above");
                let end = self
                    .pages
                    .iter()
                    .find(|p| p.number == last)
                    .map(|p| p.end)
                    .ok_or_else(|| IRptError::InvalidSelection {
                        text: format!("page {last} out of range"),
                    })?;
                Ok(self.data[..end].to_vec())
            }
        }
    }
}

fn segment_pages(fields: &[StructuredField]) -> Vec<AfpPage> {
    let mut pages = Vec::new();
    let mut current: Option<(usize, usize)> = None;
    let mut pending_group_start: Option<usize> = None;

    for field in fields {
        if field.is_begin_page_group() {
            if current.is_none() {
                pending_group_start = Some(field.offset);
            }
        } else if field.is_begin_page() {
            let actual_start = field.offset;
            let extract_start = pending_group_start.unwrap_or(actual_start);
            current = Some((actual_start, extract_start));
        } else if field.is_end_page() {
            if let Some((actual_start, extract_start)) = current.take() {
                pages.push(AfpPage {
                    number: (pages.len() + 1) as u32,
                    actual_start,
                    extract_start,
                    end: field.end,
                });
                pending_group_start = None;
            }
        }
    }
    pages
}

/// Parses `"a-b,c-d,e"` per spec §4.3: clamps `start` up to 1 and `end` down
/// to `page_count`, swaps an inverted range, preserves duplicate ranges.
pub fn parse_ranges(text: &str, page_count: u32) -> Result<Vec<u32>> {
    if page_count == 0 {
        return Err(anyhow!(IRptError::EmptySelection));
    }
    let mut out = Vec::new();
    for token in text.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        let (start, end) = match token.split_once('-') {
            Some((a, b)) => {
                let a: u32 = a.trim().parse().map_err(|_| IRptError::InvalidSelection {
                    text: token.to_string(),
                })?;
                let b: u32 = b.trim().parse().map_err(|_| IRptError::InvalidSelection {
                    text: token.to_string(),
                })?;
                (a, b)
            }
            None => {
                let n: u32 = token.parse().map_err(|_| IRptError::InvalidSelection {
                    text: token.to_string(),
                })?;
                (n, n)
            }
        };
        let (mut start, mut end) = (start.clamp(1, page_count), end.clamp(1, page_count));
        if start > end {
            std::mem::swap(&mut start, &mut end);
        }
        out.extend(start..=end);
    }
    if out.is_empty() {
        return Err(anyhow!(IRptError::EmptySelection));
    }
    Ok(out)
}
