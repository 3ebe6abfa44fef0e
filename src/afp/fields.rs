//! Structured-field walk (spec §4.3 "Structured-field walk").
//!
//! Resilient by design: an implausible length at a `0x5A` byte is treated as
//! coincidental data, not a hard error — the walk skips one byte and keeps
//! scanning, the same tolerance the teacher's page scanner shows toward
//! stray bytes between InnoDB pages.

use crate::cursor::ByteCursor;

pub const INTRODUCER: u8 = 0x5A;

pub const CLASS_STRUCTURED_FIELD: u8 = 0xD3;
pub const TYPE_BEGIN: u8 = 0xA8;
pub const TYPE_END: u8 = 0xA9;
pub const CATEGORY_DOCUMENT: u8 = 0xA8;
pub const CATEGORY_PAGE: u8 = 0xAF;
pub const CATEGORY_PAGE_GROUP: u8 = 0xAD;

/// One MO:DCA structured field, recorded by position (spec §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructuredField {
    pub offset: usize,
    /// Exclusive end of the field, `offset + 1 + length`.
    pub end: usize,
    pub class: u8,
    pub kind: u8,
    pub category: u8,
}

impl StructuredField {
    pub fn is(&self, class: u8, kind: u8, category: u8) -> bool {
        self.class == class && self.kind == kind && self.category == category
    }

    pub fn is_begin_document(&self) -> bool {
        self.is(CLASS_STRUCTURED_FIELD, TYPE_BEGIN, CATEGORY_DOCUMENT)
    }

    pub fn is_begin_page(&self) -> bool {
        self.is(CLASS_STRUCTURED_FIELD, TYPE_BEGIN, CATEGORY_PAGE)
    }

    pub fn is_end_page(&self) -> bool {
        self.is(CLASS_STRUCTURED_FIELD, TYPE_END, CATEGORY_PAGE)
    }

    pub fn is_begin_page_group(&self) -> bool {
        self.is(CLASS_STRUCTURED_FIELD, TYPE_BEGIN, CATEGORY_PAGE_GROUP)
    }
}

/// Walks `data` from byte 0, recording every plausible structured field.
pub fn walk(data: &[u8]) -> Vec<StructuredField> {
    let mut fields = Vec::new();
    let mut offset = 0usize;
    while offset + 6 <= data.len() {
        if data[offset] != INTRODUCER {
            offset += 1;
            continue;
        }
        let length = match ByteCursor::at(data, offset + 1).u16_be() {
            Ok(v) => v as usize,
            Err(_) => {
                offset += 1;
                continue;
            }
        };
        if length < 8 || offset + 1 + length > data.len() {
            offset += 1;
            continue;
        }
        let class = data[offset + 3];
        let kind = data[offset + 4];
        let category = data[offset + 5];
        let end = offset + 1 + length;
        fields.push(StructuredField { offset, end, class, kind, category });
        offset = end;
    }
    fields
}
