//! Windows ACL/SID byte-level decoder (component C6, spec §4.4).
//!
//! Grounded on `SIDParser::parseSID`/`findAllSIDs` and
//! `ACLParser::inferPrincipalType` in
//! `original_source/1_Migration_Users/papyrus_extract_users_permissions.cpp`.
//! Layout only, no semantic ACE interpretation (spec §1 Non-goals).

use std::collections::HashSet;

use crate::cursor::ByteCursor;

const MIN_SUB_AUTH: u8 = 1;
const MAX_SUB_AUTH: u8 = 15;

/// One decoded SID, deduplicated by its string form (spec §4.4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidInfo {
    pub sid_string: String,
    pub rid: Option<u32>,
    pub is_everyone: bool,
}

/// CSV-oriented classification (spec §4.4's supplement).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrincipalType {
    Everyone,
    BuiltinGroup,
    User,
    Group,
}

impl PrincipalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrincipalType::Everyone => "EVERYONE",
            PrincipalType::BuiltinGroup => "BUILTIN_GROUP",
            PrincipalType::User => "USER",
            PrincipalType::Group => "GROUP",
        }
    }
}

impl SidInfo {
    /// `Everyone` for the well-known SID; `BUILTIN_GROUP` for the builtin
    /// prefix; otherwise a domain SID is `USER` if its RID is >= 1000, else
    /// `GROUP` (spec §4.4 "Principal-type inference").
    pub fn principal_type(&self) -> PrincipalType {
        if self.is_everyone {
            return PrincipalType::Everyone;
        }
        if self.sid_string.starts_with("S-1-5-32-") {
            return PrincipalType::BuiltinGroup;
        }
        match self.rid {
            Some(rid) if rid >= 1000 => PrincipalType::User,
            Some(_) => PrincipalType::Group,
            None => PrincipalType::Group,
        }
    }
}

/// Parses the SID at exactly `data[0..]` — revision, sub-authority count,
/// authority, sub-authorities — with no further scanning. Returns `None`
/// if the layout doesn't fit within `data`.
fn parse_sid_at(data: &[u8]) -> Option<SidInfo> {
    if data.len() < 8 {
        return None;
    }
    let revision = data[0];
    let sub_auth_count = data[1];
    if revision != 1 || !(MIN_SUB_AUTH..=MAX_SUB_AUTH).contains(&sub_auth_count) {
        return None;
    }
    let expected_len = 8 + 4 * sub_auth_count as usize;
    if expected_len > data.len() {
        return None;
    }

    let mut cur = ByteCursor::at(data, 2);
    let authority = cur.u48_be().ok()?;

    let mut sub_auths = Vec::with_capacity(sub_auth_count as usize);
    for _ in 0..sub_auth_count {
        sub_auths.push(cur.u32_le().ok()?);
    }

    let mut sid_string = format!("S-{revision}-{authority}");
    for sub in &sub_auths {
        sid_string.push('-');
        sid_string.push_str(&sub.to_string());
    }

    let is_everyone = sid_string == "S-1-1-0";
    let rid = if sub_auths.len() >= 5 && sub_auths[0] == 21 {
        sub_auths.last().copied()
    } else {
        None
    };

    Some(SidInfo { sid_string, rid, is_everyone })
}

/// Walks every offset in `data`, collecting each distinct SID in discovery
/// order (spec §4.4 "Scan").
pub fn find_all_sids(data: &[u8]) -> Vec<SidInfo> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    if data.len() < 8 {
        return out;
    }
    for i in 0..=(data.len() - 8) {
        if let Some(info) = parse_sid_at(&data[i..]) {
            if seen.insert(info.sid_string.clone()) {
                out.push(info);
            }
        }
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;

    fn sid_bytes(authority: u64, sub_auths: &[u32]) -> Vec<u8> {
        let mut out = vec![1u8, sub_auths.len() as u8];
        out.extend_from_slice(&authority.to_be_bytes()[2..]);
        for s in sub_auths {
            out.extend_from_slice(&s.to_le_bytes());
        }
        out
    }

    #[test]
    fn parses_everyone_sid() {
        let data = sid_bytes(1, &[0]);
        let found = find_all_sids(&data);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].sid_string, "S-1-1-0");
        assert!(found[0].is_everyone);
        assert_eq!(found[0].principal_type(), PrincipalType::Everyone);
    }

    #[test]
    fn extracts_rid_from_domain_sid() {
        let data = sid_bytes(5, &[21, 111, 222, 333, 5000]);
        let found = find_all_sids(&data);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].rid, Some(5000));
        assert_eq!(found[0].principal_type(), PrincipalType::User);
    }

    #[test]
    fn low_rid_domain_sid_is_group() {
        let data = sid_bytes(5, &[21, 111, 222, 333, 513]);
        let found = find_all_sids(&data);
        assert_eq!(found[0].principal_type(), PrincipalType::Group);
    }

    #[test]
    fn builtin_group_prefix_classified() {
        let data = sid_bytes(5, &[32, 544]);
        let found = find_all_sids(&data);
        assert_eq!(found[0].sid_string, "S-1-5-32-544");
        assert_eq!(found[0].principal_type(), PrincipalType::BuiltinGroup);
    }

    #[test]
    fn deduplicates_overlapping_matches() {
        let mut data = sid_bytes(1, &[0]);
        data.extend(sid_bytes(1, &[0]));
        let found = find_all_sids(&data);
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn rejects_out_of_range_sub_auth_count() {
        let mut data = vec![1u8, 0]; // sub_auth_count = 0, invalid
        data.extend_from_slice(&[0u8; 6]);
        assert!(find_all_sids(&data).is_empty());
    }
}
