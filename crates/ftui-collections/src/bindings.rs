#![forbid(unsafe_code)]

//! Bindings over lists and maps.
//!
//! Each binding depends on the collection's invalidation, so it goes stale
//! on any change and recomputes on the next `get`.

use std::hash::Hash;

use ftui_reactive::{Binding, dependency};

use crate::map::ObservableMap;
use crate::source::ListSource;

/// Number of elements in `list`.
pub fn size<E, L>(list: &L) -> Binding<usize>
where
    L: ListSource<E> + Clone + 'static,
{
    let source = list.clone();
    Binding::new(move || source.len(), [dependency(list)])
}

/// Whether `list` is empty.
pub fn is_empty<E, L>(list: &L) -> Binding<bool>
where
    L: ListSource<E> + Clone + 'static,
{
    let source = list.clone();
    Binding::new(move || source.is_empty(), [dependency(list)])
}

/// Element at `index`, or `None` while the list is shorter.
pub fn value_at<E, L>(list: &L, index: usize) -> Binding<Option<E>>
where
    E: Clone + PartialEq + 'static,
    L: ListSource<E> + Clone + 'static,
{
    let source = list.clone();
    Binding::new(move || source.get(index), [dependency(list)])
}

/// Number of entries in `map`.
pub fn map_size<K, V>(map: &ObservableMap<K, V>) -> Binding<usize>
where
    K: Eq + Hash + Clone + 'static,
    V: Clone + PartialEq + 'static,
{
    let source = map.clone();
    Binding::new(move || source.len(), [dependency(map)])
}

/// Value stored under `key`.
pub fn value_for_key<K, V>(map: &ObservableMap<K, V>, key: K) -> Binding<Option<V>>
where
    K: Eq + Hash + Clone + 'static,
    V: Clone + PartialEq + 'static,
{
    let source = map.clone();
    Binding::new(move || source.get(&key), [dependency(map)])
}
