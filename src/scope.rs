//! Scope-name to surface-id matching
//!
//! A scope such as `surface10,12-15,!13` declares which surface ids its
//! entries apply to. Specs are evaluated in ascending lexicographic order
//! of their raw text, which sorts `!13` before `13` and so checks
//! exclusions first for a given value.

/// Does the scope named `name` apply to surface `id`?
///
/// Only names starting with the literal `surface` prefix are considered;
/// an optional `.append`/`append` marker after the prefix is skipped.
pub fn scope_applies(name: &str, id: i64) -> bool {
    let rest = match name.strip_prefix("surface") {
        Some(rest) => rest,
        None => return false,
    };
    let rest = rest
        .strip_prefix(".append")
        .or_else(|| rest.strip_prefix("append"))
        .unwrap_or(rest);

    let mut specs: Vec<&str> = rest.split(',').map(str::trim).collect();
    specs.sort_unstable();

    for spec in specs {
        if let Some(applies) = spec_matches(spec, id) {
            return applies;
        }
    }
    false
}

/// Evaluate one `[!]N` or `[!]N-M` spec against `id`.
///
/// Returns `Some(applies)` when the numeric test hits (the result being
/// the negation of the `!` flag), `None` when it does not hit or the spec
/// is malformed.
fn spec_matches(spec: &str, id: i64) -> Option<bool> {
    let (negated, body) = match spec.strip_prefix('!') {
        Some(body) => (true, body),
        None => (false, spec),
    };

    let hit = match body.split_once('-') {
        Some((lo, hi)) => {
            let lo: i64 = lo.trim().parse().ok()?;
            let hi: i64 = hi.trim().parse().ok()?;
            id >= lo && id <= hi
        }
        None => {
            let n: i64 = body.trim().parse().ok()?;
            id == n
        }
    };

    if hit {
        Some(!negated)
    } else {
        None
    }
}
