use irpt::map::{MapIndex, MapSchema};

// record: line_id(4 BE) field_id(4 BE) value(4) page(4 BE) = 16 bytes
fn schema() -> MapSchema {
    MapSchema {
        record_size: 16,
        line_id_offset: 0,
        field_id_offset: 4,
        value_offset: 8,
        value_len: 4,
        page_offset: 12,
    }
}

fn record(line_id: u32, field_id: u32, value: &[u8; 4], page: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(16);
    out.extend_from_slice(&line_id.to_be_bytes());
    out.extend_from_slice(&field_id.to_be_bytes());
    out.extend_from_slice(value);
    out.extend_from_slice(&page.to_be_bytes());
    out
}

fn sample() -> Vec<u8> {
    let mut data = Vec::new();
    data.extend(record(1, 1, b"ALFA", 1));
    data.extend(record(1, 1, b"ALFA", 2));
    data.extend(record(1, 1, b"ALFA", 3));
    data.extend(record(1, 1, b"BETA", 4));
    data.extend(record(1, 2, b"ALFA", 5));
    data.extend(record(2, 1, b"GAMA", 6));
    data
}

#[test]
fn invariant_9_match_count_and_membership() {
    let data = sample();
    let index = MapIndex::new(&data, schema()).unwrap();

    let matches = index.search(1, 1, b"ALFA");
    assert_eq!(matches, vec![1, 2, 3]);
    assert_eq!(matches.len(), 3);
}

#[test]
fn boundary_value_present_zero_once_many_times() {
    let data = sample();
    let index = MapIndex::new(&data, schema()).unwrap();

    assert!(index.search(1, 1, b"ZZZZ").is_empty());
    assert_eq!(index.search(1, 1, b"BETA"), vec![4]);
    assert_eq!(index.search(1, 1, b"ALFA"), vec![1, 2, 3]);
}

#[test]
fn search_does_not_cross_line_or_field_boundaries() {
    let data = sample();
    let index = MapIndex::new(&data, schema()).unwrap();

    assert_eq!(index.search(1, 2, b"ALFA"), vec![5]);
    assert_eq!(index.search(2, 1, b"GAMA"), vec![6]);
    assert!(index.search(2, 1, b"ALFA").is_empty());
}

#[test]
fn list_distinct_values_is_structurally_ordered() {
    let data = sample();
    let index = MapIndex::new(&data, schema()).unwrap();

    let values = index.list_distinct_values(1, 1);
    assert_eq!(values, vec![b"ALFA".to_vec(), b"BETA".to_vec()]);
}

#[test]
fn wrong_value_length_yields_no_match_rather_than_panicking() {
    let data = sample();
    let index = MapIndex::new(&data, schema()).unwrap();
    assert!(index.search(1, 1, b"TOO_LONG_VALUE").is_empty());
}
