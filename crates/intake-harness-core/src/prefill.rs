//! The fill-but-never-clobber rule.
//!
//! A proposal may only write a field whose current value is absent, null or
//! blank. A value a user (or an earlier pass) already entered always wins.
//! The persistent form of this rule lives in the application crate's SQL
//! upsert; this in-memory form is what the API previews and tests against.

use std::collections::BTreeMap;

use crate::models::PrefillField;

pub fn is_filled(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

/// Apply `proposals` to `record`, returning the names of the fields filled.
///
/// Proposals with a blank value are ignored. When several proposals target
/// the same empty field, the first one wins.
pub fn merge_prefill<'a, I>(
    record: &mut BTreeMap<String, Option<String>>,
    proposals: I,
) -> Vec<String>
where
    I: IntoIterator<Item = &'a PrefillField>,
{
    let mut filled = Vec::new();
    for proposal in proposals {
        let Some(value) = proposal.value.as_deref().filter(|v| !v.trim().is_empty()) else {
            continue;
        };
        let current = record.get(&proposal.field_name).and_then(|v| v.as_deref());
        if is_filled(current) {
            continue;
        }
        record.insert(proposal.field_name.clone(), Some(value.to_string()));
        filled.push(proposal.field_name.clone());
    }
    filled
}
