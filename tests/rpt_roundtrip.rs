use irpt::rpt::builder::{build, BuildInput, BuildPage, BuildSection};
use irpt::rpt::RptDocument;

fn page(text: &str) -> BuildPage {
    BuildPage { text: text.as_bytes().to_vec(), line_width: 80, lines_per_page: 1 }
}

#[test]
fn s1_round_trip_two_page_rpt() {
    let input = BuildInput {
        domain_id: 1,
        species_id: 42,
        timestamp: Some("2024-01-01 00:00:00".to_string()),
        pages: vec![page("hello\n"), page("world\n")],
        sections: vec![BuildSection { section_id: 100, start_page: 1, page_count: 2 }],
        binary_body: None,
    };
    let bytes = build(&input).unwrap();
    let doc = RptDocument::parse(&bytes).unwrap();

    assert_eq!(doc.domain_id, 1);
    assert_eq!(doc.species_id, 42);
    assert_eq!(doc.page_count(), 2);
    assert_eq!(doc.page_text(1).unwrap(), b"hello\n");
    assert_eq!(doc.page_text(2).unwrap(), b"world\n");
    assert_eq!(doc.sections.len(), 1);
    assert_eq!(doc.sections[0].section_id, 100);
    assert_eq!(doc.sections[0].start_page, 1);
    assert_eq!(doc.sections[0].page_count, 2);
}

#[test]
fn invariant_1_page_count_matches_trailer() {
    let input = BuildInput {
        domain_id: 0,
        species_id: 0,
        timestamp: None,
        pages: (0..7).map(|i| page(&format!("page {i}\n"))).collect(),
        sections: vec![BuildSection { section_id: 1, start_page: 1, page_count: 7 }],
        binary_body: None,
    };
    let bytes = build(&input).unwrap();
    let doc = RptDocument::parse(&bytes).unwrap();
    assert_eq!(doc.page_count(), 7);
}

#[test]
fn invariant_2_decompressed_size_matches_uncompressed_size() {
    let input = BuildInput {
        domain_id: 0,
        species_id: 0,
        timestamp: None,
        pages: vec![page("a somewhat longer page of text to compress\n")],
        sections: vec![],
        binary_body: None,
    };
    let bytes = build(&input).unwrap();
    let doc = RptDocument::parse(&bytes).unwrap();
    let p = &doc.pages[0];
    assert_eq!(p.text.len(), p.entry.uncompressed_size as usize);
}

#[test]
fn invariant_3_sections_partition_page_set() {
    let input = BuildInput {
        domain_id: 0,
        species_id: 0,
        timestamp: None,
        pages: (0..5).map(|i| page(&format!("{i}\n"))).collect(),
        sections: vec![
            BuildSection { section_id: 10, start_page: 1, page_count: 2 },
            BuildSection { section_id: 20, start_page: 3, page_count: 1 },
            BuildSection { section_id: 30, start_page: 4, page_count: 2 },
        ],
        binary_body: None,
    };
    let bytes = build(&input).unwrap();
    let doc = RptDocument::parse(&bytes).unwrap();

    let mut covered: Vec<u32> = doc.sections.iter().flat_map(|s| s.pages()).collect();
    covered.sort_unstable();
    assert_eq!(covered, vec![1, 2, 3, 4, 5]);
}

#[test]
fn invariant_4_read_build_round_trip_preserves_content() {
    let input = BuildInput {
        domain_id: 9,
        species_id: 3,
        timestamp: Some("2025-06-06 12:00:00".to_string()),
        pages: vec![page("one\n"), page("two\n"), page("three\n")],
        sections: vec![BuildSection { section_id: 5, start_page: 1, page_count: 3 }],
        binary_body: Some(b"embedded-pdf-bytes".to_vec()),
    };
    let bytes = build(&input).unwrap();
    let doc = RptDocument::parse(&bytes).unwrap();

    assert_eq!(doc.domain_id, input.domain_id);
    assert_eq!(doc.species_id, input.species_id);
    assert_eq!(doc.timestamp, input.timestamp);
    for (i, p) in input.pages.iter().enumerate() {
        assert_eq!(doc.page_text((i + 1) as u32).unwrap(), p.text.as_slice());
    }
    assert_eq!(doc.binary_body.as_deref(), input.binary_body.as_deref());
}

#[test]
fn invariant_5_build_read_build_is_stable() {
    let input = BuildInput {
        domain_id: 2,
        species_id: 2,
        timestamp: None,
        pages: vec![page("stable\n")],
        sections: vec![BuildSection { section_id: 1, start_page: 1, page_count: 1 }],
        binary_body: None,
    };
    let bytes = build(&input).unwrap();
    let doc = RptDocument::parse(&bytes).unwrap();

    let input2 = BuildInput {
        domain_id: doc.domain_id,
        species_id: doc.species_id,
        timestamp: doc.timestamp.clone(),
        pages: doc
            .pages
            .iter()
            .map(|p| BuildPage {
                text: p.text.clone(),
                line_width: p.entry.line_width,
                lines_per_page: p.entry.lines_per_page,
            })
            .collect(),
        sections: doc
            .sections
            .iter()
            .map(|s| BuildSection {
                section_id: s.section_id,
                start_page: s.start_page,
                page_count: s.page_count,
            })
            .collect(),
        binary_body: doc.binary_body.clone(),
    };
    let bytes2 = build(&input2).unwrap();
    let doc2 = RptDocument::parse(&bytes2).unwrap();

    assert_eq!(doc.domain_id, doc2.domain_id);
    assert_eq!(doc.page_count(), doc2.page_count());
    assert_eq!(doc.page_text(1), doc2.page_text(1));
}

#[test]
fn boundary_zero_page_zero_section_rpt() {
    let input = BuildInput {
        domain_id: 0,
        species_id: 0,
        timestamp: None,
        pages: vec![],
        sections: vec![],
        binary_body: None,
    };
    let bytes = build(&input).unwrap();
    let doc = RptDocument::parse(&bytes).unwrap();
    assert_eq!(doc.page_count(), 0);
    assert!(doc.sections.is_empty());
}

#[test]
fn boundary_single_page_single_section_rpt() {
    let input = BuildInput {
        domain_id: 0,
        species_id: 0,
        timestamp: None,
        pages: vec![page("only\n")],
        sections: vec![BuildSection { section_id: 1, start_page: 1, page_count: 1 }],
        binary_body: None,
    };
    let bytes = build(&input).unwrap();
    let doc = RptDocument::parse(&bytes).unwrap();
    assert_eq!(doc.page_count(), 1);
    assert_eq!(doc.sections.len(), 1);
}

#[test]
fn boundary_compressed_may_exceed_uncompressed_size() {
    // A single near-incompressible byte: deflate output is larger than input.
    let input = BuildInput {
        domain_id: 0,
        species_id: 0,
        timestamp: None,
        pages: vec![BuildPage { text: vec![0x01], line_width: 1, lines_per_page: 0 }],
        sections: vec![],
        binary_body: None,
    };
    let bytes = build(&input).unwrap();
    let doc = RptDocument::parse(&bytes).unwrap();
    assert_eq!(doc.page_text(1).unwrap(), &[0x01]);
    assert!(doc.pages[0].entry.compressed_size as usize >= doc.pages[0].entry.uncompressed_size as usize);
}

#[test]
fn build_rejects_non_contiguous_sections() {
    let input = BuildInput {
        domain_id: 0,
        species_id: 0,
        timestamp: None,
        pages: vec![page("a\n"), page("b\n")],
        sections: vec![BuildSection { section_id: 1, start_page: 1, page_count: 5 }],
        binary_body: None,
    };
    assert!(build(&input).is_err());
}
