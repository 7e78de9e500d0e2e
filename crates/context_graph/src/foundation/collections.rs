//! Specialized collection types

pub use slotmap::{SecondaryMap, SlotMap};

slotmap::new_key_type! {
    /// Stable, generation-checked identity of a registered context listener.
    ///
    /// A removed listener's id never aliases a listener registered later,
    /// so stale ids are reported instead of silently hitting the wrong entry.
    pub struct ListenerId;
}

/// Handle-based map keyed by listener identity
pub type ListenerMap<T> = SlotMap<ListenerId, T>;

/// Sparse side table keyed by listener identity
pub type ListenerSet = SecondaryMap<ListenerId, ()>;

/// Push `id` onto an adjacency list unless it is already there.
///
/// Returns `true` if the list changed.
pub fn insert_unique(list: &mut Vec<ListenerId>, id: ListenerId) -> bool {
    if list.contains(&id) {
        false
    } else {
        list.push(id);
        true
    }
}

/// Remove `id` from an adjacency list, preserving the order of the rest.
///
/// Returns `true` if the list changed.
pub fn remove_id(list: &mut Vec<ListenerId>, id: ListenerId) -> bool {
    if let Some(index) = list.iter().position(|&other| other == id) {
        list.remove(index);
        true
    } else {
        false
    }
}
