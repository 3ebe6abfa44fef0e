//! MAP field-index search (component C7, spec §4.5).
//!
//! Record layout is producer-defined (spec §6), so callers hand in a
//! `MapSchema` describing byte offsets rather than this module assuming a
//! fixed struct — the same "single opaque schema parameter" contract the
//! teacher's `TableDefinition` gives SQL column layouts.

use anyhow::{anyhow, Result};

use crate::cursor::ByteCursor;
use crate::error::IRptError;

/// Describes one fixed-width MAP record's byte layout. `line_id` and
/// `field_id` are 4-byte big-endian integers (so byte-order comparison
/// matches numeric order); `value` is an opaque `value_len`-byte field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapSchema {
    pub record_size: usize,
    pub line_id_offset: usize,
    pub field_id_offset: usize,
    pub value_offset: usize,
    pub value_len: usize,
    /// Offset within the record of the 4-byte big-endian page number.
    pub page_offset: usize,
}

impl MapSchema {
    fn validate(&self) -> Result<()> {
        let fields_end = [
            self.line_id_offset + 4,
            self.field_id_offset + 4,
            self.value_offset + self.value_len,
            self.page_offset + 4,
        ];
        if fields_end.into_iter().any(|end| end > self.record_size) {
            return Err(anyhow!(IRptError::MapSchemaMismatch {
                reason: "a field offset/length exceeds record_size".into(),
            }));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Key<'a> {
    line_id: u32,
    field_id: u32,
    value: &'a [u8],
}

pub struct MapIndex<'a> {
    data: &'a [u8],
    schema: MapSchema,
    count: usize,
}

impl<'a> MapIndex<'a> {
    pub fn new(data: &'a [u8], schema: MapSchema) -> Result<Self> {
        schema.validate()?;
        if schema.record_size == 0 {
            return Err(anyhow!(IRptError::MapSchemaMismatch {
                reason: "record_size must be non-zero".into(),
            }));
        }
        if data.len() % schema.record_size != 0 {
            return Err(anyhow!(IRptError::MapSchemaMismatch {
                reason: format!(
                    "file size {} is not a multiple of record_size {}",
                    data.len(),
                    schema.record_size
                ),
            }));
        }
        let count = data.len() / schema.record_size;
        Ok(MapIndex { data, schema, count })
    }

    pub fn record_count(&self) -> usize {
        self.count
    }

    fn record(&self, index: usize) -> &'a [u8] {
        let start = index * self.schema.record_size;
        &self.data[start..start + self.schema.record_size]
    }

    fn key_at(&self, index: usize) -> Key<'a> {
        let record = self.record(index);
        let line_id = ByteCursor::at(record, self.schema.line_id_offset)
            .u32_be()
            .expect("bounds validated at construction");
        let field_id = ByteCursor::at(record, self.schema.field_id_offset)
            .u32_be()
            .expect("bounds validated at construction");
        let value =
            &record[self.schema.value_offset..self.schema.value_offset + self.schema.value_len];
        Key { line_id, field_id, value }
    }

    fn page_at(&self, index: usize) -> u32 {
        let record = self.record(index);
        ByteCursor::at(record, self.schema.page_offset)
            .u32_be()
            .expect("bounds validated at construction")
    }

    /// Index of the first record `>= key` (standard lower-bound binary search).
    fn lower_bound(&self, key: &Key<'_>) -> usize {
        let (mut lo, mut hi) = (0usize, self.count);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if &self.key_at(mid) < key {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo
    }

    /// Index of the first record `> key`.
    fn upper_bound(&self, key: &Key<'_>) -> usize {
        let (mut lo, mut hi) = (0usize, self.count);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if &self.key_at(mid) <= key {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo
    }

    /// Returns the sorted, unique page numbers matching
    /// `(line_id, field_id, value)` exactly (spec §4.5).
    pub fn search(&self, line_id: u32, field_id: u32, value: &[u8]) -> Vec<u32> {
        if value.len() != self.schema.value_len {
            return Vec::new();
        }
        let key = Key { line_id, field_id, value };
        let lo = self.lower_bound(&key);
        let hi = self.upper_bound(&key);
        let mut pages: Vec<u32> = (lo..hi).map(|i| self.page_at(i)).collect();
        pages.sort_unstable();
        pages.dedup();
        pages
    }

    /// Returns every distinct value recorded under `(line_id, field_id)`, in
    /// structural (sorted) order — spec §4's "list-modes" supplement.
    pub fn list_distinct_values(&self, line_id: u32, field_id: u32) -> Vec<Vec<u8>> {
        let lo_key = Key { line_id, field_id, value: &[] };
        let lo = self.lower_bound(&lo_key);

        let mut out = Vec::new();
        let mut i = lo;
        while i < self.count {
            let k = self.key_at(i);
            if k.line_id != line_id || k.field_id != field_id {
                break;
            }
            if out.last().map(|v: &Vec<u8>| v.as_slice()) != Some(k.value) {
                out.push(k.value.to_vec());
            }
            i += 1;
        }
        out
    }
}
