//! Page-selection grammar resolver (component C8, spec §4.6).

use anyhow::{anyhow, Result};

use crate::error::IRptError;
use crate::rpt::Section;

/// A parsed selection rule, ready to resolve against a document's page count
/// and section list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    All,
    Pages(Vec<(u32, u32)>),
    Sections(Vec<u32>),
}

/// Parses the `all | pages:range-list | sections:id-list | section:id |
/// bare-id-list` grammar (case-insensitive prefix).
pub fn parse(rule: &str) -> Result<Selection> {
    let rule = rule.trim();
    let lower = rule.to_ascii_lowercase();

    if lower == "all" {
        return Ok(Selection::All);
    }
    if let Some(rest) = strip_prefix_ci(rule, "pages:") {
        return Ok(Selection::Pages(parse_range_list(rest)?));
    }
    if let Some(rest) = strip_prefix_ci(rule, "sections:") {
        return Ok(Selection::Sections(parse_id_list(rest)?));
    }
    if let Some(rest) = strip_prefix_ci(rule, "section:") {
        return Ok(Selection::Sections(parse_id_list(rest)?));
    }
    // Bare id-list is treated as sections:id-list (spec §4.6).
    Ok(Selection::Sections(parse_id_list(rule)?))
}

fn strip_prefix_ci<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    if text.len() >= prefix.len() && text[..prefix.len()].eq_ignore_ascii_case(prefix) {
        Some(&text[prefix.len()..])
    } else {
        None
    }
}

fn parse_range_list(text: &str) -> Result<Vec<(u32, u32)>> {
    let mut out = Vec::new();
    for token in text.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        let (start, end) = match token.split_once('-') {
            Some((a, b)) => (
                a.trim().parse::<u32>().map_err(|_| invalid(token))?,
                b.trim().parse::<u32>().map_err(|_| invalid(token))?,
            ),
            None => {
                let n = token.parse::<u32>().map_err(|_| invalid(token))?;
                (n, n)
            }
        };
        out.push((start, end));
    }
    if out.is_empty() {
        return Err(anyhow!(IRptError::EmptySelection));
    }
    Ok(out)
}

fn parse_id_list(text: &str) -> Result<Vec<u32>> {
    let mut out = Vec::new();
    for token in text.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        out.push(token.parse::<u32>().map_err(|_| invalid(token))?);
    }
    if out.is_empty() {
        return Err(anyhow!(IRptError::EmptySelection));
    }
    Ok(out)
}

fn invalid(token: &str) -> IRptError {
    IRptError::InvalidSelection { text: token.to_string() }
}

/// Resolves a parsed `Selection` into a concrete, duplicate-preserving page
/// list (spec §4.6; invariant 7).
pub fn resolve(selection: &Selection, page_count: u32, sections: &[Section]) -> Result<Vec<u32>> {
    if page_count == 0 {
        return Err(anyhow!(IRptError::EmptySelection));
    }
    let pages = match selection {
        Selection::All => (1..=page_count).collect(),
        Selection::Pages(ranges) => {
            let mut out = Vec::new();
            for &(start, end) in ranges {
                let (mut start, mut end) =
                    (start.clamp(1, page_count), end.clamp(1, page_count));
                if start > end {
                    std::mem::swap(&mut start, &mut end);
                }
                out.extend(start..=end);
            }
            out
        }
        Selection::Sections(ids) => {
            let mut out = Vec::new();
            for &id in ids {
                let section = sections
                    .iter()
                    .find(|s| s.section_id == id)
                    .ok_or(IRptError::SectionNotFound { id })?;
                out.extend(section.pages());
            }
            out
        }
    };
    if pages.is_empty() {
        return Err(anyhow!(IRptError::EmptySelection));
    }
    Ok(pages)
}

/// Intersects `map_pages` with `section_pages`, preserving the section's
/// ordering (spec §4.6 "Intersection mode").
pub fn intersect_with_map(section_pages: &[u32], map_pages: &[u32]) -> Vec<u32> {
    section_pages.iter().copied().filter(|p| map_pages.contains(p)).collect()
}
