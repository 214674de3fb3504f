#![forbid(unsafe_code)]

//! Observable hash map.
//!
//! Every mutation that changes an entry fires one [`MapChange`] per affected
//! key. Putting a value equal to the current one fires nothing; this differs
//! from scalar properties, whose invalidation fires on every write.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Listener error | Callback returned `Err` | Logged, kept in [`Observable::take_faults`], remaining listeners still run |
//! | Reentrant mutation | Listener mutates the map | Allowed; no borrow is held while listeners run |

use std::cell::RefCell;
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

use ahash::AHashMap;
use ftui_reactive::{
    Dispatch, InvalidationListener, ListenerFault, Observable, ObservableConfig, ObservableId,
};

use crate::listener::MapChangeListener;
use crate::notifier::MapNotifier;

const LABEL: &str = "ObservableMap";

/// One entry change of an [`ObservableMap`].
#[derive(Debug)]
pub struct MapChange<'a, K, V> {
    map: &'a ObservableMap<K, V>,
    key: K,
    added: Option<V>,
    removed: Option<V>,
}

impl<'a, K, V> MapChange<'a, K, V> {
    /// The map that changed.
    #[must_use]
    pub fn map(&self) -> &'a ObservableMap<K, V> {
        self.map
    }

    #[must_use]
    pub fn key(&self) -> &K {
        &self.key
    }

    /// New value, if one was put.
    #[must_use]
    pub fn value_added(&self) -> Option<&V> {
        self.added.as_ref()
    }

    /// Previous value, if one was removed or replaced.
    #[must_use]
    pub fn value_removed(&self) -> Option<&V> {
        self.removed.as_ref()
    }

    #[must_use]
    pub fn was_added(&self) -> bool {
        self.added.is_some()
    }

    #[must_use]
    pub fn was_removed(&self) -> bool {
        self.removed.is_some()
    }
}

pub(crate) struct MapInner<K, V> {
    entries: RefCell<AHashMap<K, V>>,
    notifier: MapNotifier<K, V>,
}

/// Hash map that notifies listeners of every entry change.
pub struct ObservableMap<K, V> {
    inner: Rc<MapInner<K, V>>,
}

impl<K, V> Clone for ObservableMap<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<K, V> Default for ObservableMap<K, V>
where
    K: Eq + Hash + Clone + 'static,
    V: Clone + PartialEq + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> ObservableMap<K, V>
where
    K: Eq + Hash + Clone + 'static,
    V: Clone + PartialEq + 'static,
{
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ObservableConfig::default())
    }

    #[must_use]
    pub fn with_config(config: ObservableConfig) -> Self {
        Self {
            inner: Rc::new(MapInner {
                entries: RefCell::new(AHashMap::new()),
                notifier: MapNotifier::new(config),
            }),
        }
    }

    // -- reads --------------------------------------------------------------

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.entries.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.entries.borrow().is_empty()
    }

    #[must_use]
    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.entries.borrow().get(key).cloned()
    }

    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.inner.entries.borrow().contains_key(key)
    }

    /// Keys in unspecified order.
    #[must_use]
    pub fn keys(&self) -> Vec<K> {
        self.inner.entries.borrow().keys().cloned().collect()
    }

    /// Values in unspecified order.
    #[must_use]
    pub fn values(&self) -> Vec<V> {
        self.inner.entries.borrow().values().cloned().collect()
    }

    /// Entries in unspecified order.
    #[must_use]
    pub fn entries(&self) -> Vec<(K, V)> {
        self.inner
            .entries
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    // -- mutation -----------------------------------------------------------

    /// Insert or replace `key`, returning the previous value.
    ///
    /// An equal existing value leaves the map untouched and fires nothing.
    pub fn put(&self, key: K, value: V) -> Option<V> {
        let previous = {
            let mut entries = self.inner.entries.borrow_mut();
            if entries.get(&key) == Some(&value) {
                return Some(value);
            }
            entries.insert(key.clone(), value.clone())
        };
        self.fire(key, Some(value), previous.clone());
        previous
    }

    /// Put every pair, firing one change per changed entry.
    pub fn put_all(&self, pairs: impl IntoIterator<Item = (K, V)>) {
        for (key, value) in pairs {
            self.put(key, value);
        }
    }

    /// Remove `key`, returning its value.
    pub fn remove(&self, key: &K) -> Option<V> {
        let removed = self.inner.entries.borrow_mut().remove(key)?;
        self.fire(key.clone(), None, Some(removed.clone()));
        Some(removed)
    }

    /// Remove every entry, firing one change per entry as it goes.
    pub fn clear(&self) {
        for key in self.keys() {
            self.remove(&key);
        }
    }

    /// Keep only the entries matching `keep`, firing one change per removal.
    ///
    /// The predicate runs over a snapshot, so it may read the map.
    pub fn retain(&self, mut keep: impl FnMut(&K, &V) -> bool) {
        for (key, value) in self.entries() {
            if !keep(&key, &value) {
                self.remove(&key);
            }
        }
    }

    fn fire(&self, key: K, added: Option<V>, removed: Option<V>) -> Dispatch {
        let change = MapChange {
            map: self,
            key,
            added,
            removed,
        };
        self.inner.notifier.fire(self, LABEL, &change)
    }

    // -- bookkeeping --------------------------------------------------------

    pub fn add_map_listener(&self, listener: MapChangeListener<K, V>) {
        self.inner.notifier.add_map_listener(listener);
    }

    pub fn remove_map_listener(&self, listener: &MapChangeListener<K, V>) {
        self.inner.notifier.remove_map_listener(listener);
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.notifier.listener_count()
    }

    /// Whether both handles refer to the same map.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<K, V> FromIterator<(K, V)> for ObservableMap<K, V>
where
    K: Eq + Hash + Clone + 'static,
    V: Clone + PartialEq + 'static,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let map = Self::new();
        map.inner.entries.borrow_mut().extend(iter);
        map
    }
}

impl<K, V> Observable for ObservableMap<K, V>
where
    K: Eq + Hash + Clone + 'static,
    V: Clone + PartialEq + 'static,
{
    fn add_listener(&self, listener: InvalidationListener) {
        self.inner.notifier.add_listener(listener);
    }

    fn remove_listener(&self, listener: &InvalidationListener) {
        self.inner.notifier.remove_listener(listener);
    }

    fn observable_id(&self) -> ObservableId {
        ObservableId::of(&self.inner)
    }

    fn take_faults(&self) -> Vec<ListenerFault> {
        self.inner.notifier.take_faults()
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for ObservableMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("ObservableMap");
        match self.inner.entries.try_borrow() {
            Ok(entries) => s.field("len", &entries.len()),
            Err(_) => s.field("len", &"<borrowed>"),
        };
        s.finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ftui_reactive::ListenerError;
    use std::cell::Cell;

    type Seen = Rc<RefCell<Vec<(String, Option<i32>, Option<i32>)>>>;

    fn record(map: &ObservableMap<String, i32>) -> Seen {
        let seen: Seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let listener = MapChangeListener::new(move |change: &MapChange<'_, String, i32>| {
            sink.borrow_mut().push((
                change.key().clone(),
                change.value_added().copied(),
                change.value_removed().copied(),
            ));
        });
        map.add_map_listener(listener);
        seen
    }

    #[test]
    fn put_semantics() {
        let map = ObservableMap::new();
        let seen = record(&map);

        assert_eq!(map.put("a".to_string(), 1), None);
        assert_eq!(map.put("a".to_string(), 1), Some(1));
        assert_eq!(map.put("a".to_string(), 2), Some(1));

        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], ("a".to_string(), Some(1), None));
        assert_eq!(seen[1], ("a".to_string(), Some(2), Some(1)));
    }

    #[test]
    fn remove_fires_removed() {
        let map: ObservableMap<String, i32> = [("k".to_string(), 7)].into_iter().collect();
        let seen = record(&map);
        assert_eq!(map.remove(&"k".to_string()), Some(7));
        assert_eq!(map.remove(&"k".to_string()), None);
        assert_eq!(*seen.borrow(), vec![("k".to_string(), None, Some(7))]);
    }

    #[test]
    fn clear_fires_per_entry_and_is_progressive() {
        let map: ObservableMap<String, i32> = (0..3).map(|i| (i.to_string(), i)).collect();
        let sizes = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&sizes);
        map.add_map_listener(MapChangeListener::new(move |change: &MapChange<'_, String, i32>| {
            assert!(change.was_removed());
            sink.borrow_mut().push(change.map().len());
        }));
        map.clear();
        assert!(map.is_empty());
        assert_eq!(*sizes.borrow(), vec![2, 1, 0]);
    }

    #[test]
    fn retain_and_put_all() {
        let map = ObservableMap::new();
        map.put_all((1..=4).map(|i| (i.to_string(), i)));
        let seen = record(&map);
        map.retain(|_, v| v % 2 == 0);
        let mut keys = map.keys();
        keys.sort();
        assert_eq!(keys, vec!["2".to_string(), "4".to_string()]);
        assert_eq!(seen.borrow().len(), 2);
    }

    #[test]
    fn invalidation_skips_noop_put() {
        let map = ObservableMap::new();
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        map.add_listener(InvalidationListener::new(move |_| counter.set(counter.get() + 1)));
        map.put(1, 'x');
        map.put(1, 'x');
        map.put(1, 'y');
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn listener_fault_is_recorded() {
        let map = ObservableMap::new();
        map.add_map_listener(MapChangeListener::try_new(|_| Err(ListenerError::new("nope"))));
        let after = Rc::new(Cell::new(false));
        let flag = Rc::clone(&after);
        map.add_map_listener(MapChangeListener::new(move |_| flag.set(true)));
        map.put('k', 1);
        assert!(after.get());
        let faults = map.take_faults();
        assert_eq!(faults.len(), 1);
        assert_eq!(faults[0].source, "ObservableMap");
    }

    #[test]
    fn reentrant_put_from_listener() {
        let map: ObservableMap<u8, u8> = ObservableMap::new();
        map.add_map_listener(MapChangeListener::new(|change: &MapChange<'_, u8, u8>| {
            if *change.key() == 1 {
                change.map().put(2, 20);
            }
        }));
        map.put(1, 10);
        assert_eq!(map.get(&2), Some(20));
    }
}
