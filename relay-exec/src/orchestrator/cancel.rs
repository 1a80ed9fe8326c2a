use std::collections::BTreeMap;

use crate::orchestrator::handle::CallHandle;
use crate::orchestrator::types::CancelOrder;

/// Ids of the calls `order` cancels once `resolver` resolves. Terminal calls are never
/// selected, and only a registered group member triggers the policy.
///
/// ALL and PRIORITY act on the resolver's group siblings; HIERARCHY acts on every
/// descendant of the resolver, following parent links (chained successors carry their
/// predecessor as parent).
pub fn select_victims(
    order: CancelOrder,
    resolver: &str,
    handles: &BTreeMap<String, CallHandle>,
) -> Vec<String> {
    let Some(origin) = handles.get(resolver) else {
        return Vec::new();
    };
    if !origin.in_group {
        return Vec::new();
    }

    handles
        .values()
        .filter(|h| h.id != origin.id && !h.is_terminal())
        .filter(|h| match order {
            CancelOrder::All => h.in_group,
            CancelOrder::Priority => h.in_group && h.priority < origin.priority,
            CancelOrder::Hierarchy => is_descendant(h, &origin.id, handles),
        })
        .map(|h| h.id.clone())
        .collect()
}

fn is_descendant(handle: &CallHandle, ancestor: &str, handles: &BTreeMap<String, CallHandle>) -> bool {
    let mut cur = handle.parent.as_deref();
    // Bounded by the handle count so a parent cycle terminates.
    for _ in 0..handles.len() {
        match cur {
            Some(id) if id == ancestor => return true,
            Some(id) => cur = handles.get(id).and_then(|h| h.parent.as_deref()),
            None => return false,
        }
    }
    false
}
