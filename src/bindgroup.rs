//! Costume-group (bind group) activation
//!
//! Which overlay groups are active comes from the user's persisted
//! selection when one exists, otherwise from the shell's declared
//! defaults, followed by a single `addid` expansion pass.

use crate::descript::DescriptTable;
use crate::models::{BindGroup, Side};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

fn bindgroup_key_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(sakura|kero)\.bindgroup(\d+)\.(default|addid)$").expect("valid regex")
    })
}

/// Collect the bind groups a side declares in its description table.
pub fn collect_groups(descript: &DescriptTable, side: Side) -> HashMap<u32, BindGroup> {
    let mut groups: HashMap<u32, BindGroup> = HashMap::new();

    for key in descript.keys() {
        let lowered = key.to_ascii_lowercase();
        let caps = match bindgroup_key_re().captures(&lowered) {
            Some(caps) => caps,
            None => continue,
        };
        if &caps[1] != side.name() {
            continue;
        }
        let id: u32 = match caps[2].parse() {
            Ok(id) => id,
            Err(_) => continue,
        };
        let group = groups
            .entry(id)
            .or_insert_with(|| BindGroup { id, default_enabled: false, add_ids: Vec::new() });
        match (&caps[3], descript.get(key)) {
            ("default", Some(value)) => group.default_enabled = value.trim() == "1",
            ("addid", Some(value)) => {
                group.add_ids =
                    value.split(',').filter_map(|t| t.trim().parse().ok()).collect();
            }
            _ => {}
        }
    }

    groups
}

/// Compute the active costume-group id set for one side.
///
/// A persisted `<charN>.bind.savearray` profile line is authoritative
/// when present and the declared defaults are skipped entirely.
/// Otherwise the set is seeded from `<side>.bindgroupN.default` entries.
/// Either way, every enabled group then enables its `addid` list in one
/// additional pass (not iterated to a fixpoint).
pub fn enabled_groups(
    descript: &DescriptTable,
    profile: Option<&DescriptTable>,
    side: Side,
) -> HashSet<u32> {
    let groups = collect_groups(descript, side);

    let mut enabled = match profile.and_then(|p| saved_selection(p, side)) {
        Some(saved) => saved,
        None => groups
            .values()
            .filter(|g| g.default_enabled)
            .map(|g| g.id)
            .collect(),
    };

    // Single addid pass over the seed set.
    let seed: Vec<u32> = enabled.iter().copied().collect();
    for id in seed {
        if let Some(group) = groups.get(&id) {
            enabled.extend(group.add_ids.iter().copied());
        }
    }

    enabled
}

/// Parse the persisted selection line: space-separated `id=0|1` tokens.
/// Ids with value `1` form the enabled set.
fn saved_selection(profile: &DescriptTable, side: Side) -> Option<HashSet<u32>> {
    let value = profile.get(&format!("{}.bind.savearray", side.profile_name()))?;
    let mut saved = HashSet::new();
    for token in value.split_whitespace() {
        if let Some((id, flag)) = token.split_once('=') {
            if flag.trim() == "1" {
                if let Ok(id) = id.trim().parse() {
                    saved.insert(id);
                }
            }
        }
    }
    Some(saved)
}
