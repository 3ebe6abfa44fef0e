use irpt::acl::{find_all_sids, PrincipalType};

fn sid_bytes(authority: u64, sub_auths: &[u32]) -> Vec<u8> {
    let mut out = vec![1u8, sub_auths.len() as u8];
    out.extend_from_slice(&authority.to_be_bytes()[2..]);
    for s in sub_auths {
        out.extend_from_slice(&s.to_le_bytes());
    }
    out
}

#[test]
fn invariant_8_sid_format_round_trips_through_reparse() {
    let data = sid_bytes(5, &[21, 1, 2, 3, 1013]);
    let first = find_all_sids(&data);
    assert_eq!(first.len(), 1);

    let reparsed = find_all_sids(sid_bytes(5, &[21, 1, 2, 3, 1013]).as_slice());
    assert_eq!(first[0].sid_string, reparsed[0].sid_string);
    assert_eq!(first[0].rid, reparsed[0].rid);
    assert_eq!(first[0].is_everyone, reparsed[0].is_everyone);
}

#[test]
fn boundary_overlapping_sid_like_patterns_deduplicate() {
    let mut data = sid_bytes(1, &[0]);
    // Append a second, distinct SID directly after the first so their byte
    // windows overlap during the scan.
    data.extend(sid_bytes(5, &[21, 9, 9, 9, 1500]));
    // And repeat the first SID's bytes again later in the blob.
    data.extend(sid_bytes(1, &[0]));

    let found = find_all_sids(&data);
    let strings: Vec<&str> = found.iter().map(|s| s.sid_string.as_str()).collect();
    assert!(strings.contains(&"S-1-1-0"));
    assert_eq!(strings.iter().filter(|&&s| s == "S-1-1-0").count(), 1);
}

#[test]
fn everyone_sid_is_flagged() {
    let data = sid_bytes(1, &[0]);
    let found = find_all_sids(&data);
    assert!(found[0].is_everyone);
    assert_eq!(found[0].principal_type(), PrincipalType::Everyone);
}

#[test]
fn domain_sid_rid_classification_thresholds() {
    let user = find_all_sids(&sid_bytes(5, &[21, 1, 1, 1, 1000]));
    assert_eq!(user[0].principal_type(), PrincipalType::User);

    let group = find_all_sids(&sid_bytes(5, &[21, 1, 1, 1, 999]));
    assert_eq!(group[0].principal_type(), PrincipalType::Group);
}

#[test]
fn builtin_group_sid_classified_by_prefix() {
    let data = sid_bytes(5, &[32, 545]);
    let found = find_all_sids(&data);
    assert_eq!(found[0].sid_string, "S-1-5-32-545");
    assert_eq!(found[0].principal_type(), PrincipalType::BuiltinGroup);
}

#[test]
fn non_domain_sid_without_21_prefix_has_no_rid() {
    let data = sid_bytes(5, &[5, 1, 2, 3, 4]);
    let found = find_all_sids(&data);
    assert_eq!(found[0].rid, None);
}
