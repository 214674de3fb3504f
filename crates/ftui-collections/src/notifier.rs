#![forbid(unsafe_code)]

//! Listener bookkeeping shared by lists, views, and maps.

use std::cell::RefCell;
use std::fmt;

use ftui_reactive::{
    Dispatch, DispatchSite, FaultLog, InvalidationListener, ListenerFault, ListenerKind,
    Observable, ObservableConfig, StorageKind,
};

use crate::change::{IterableChange, ListChange, ListStep, NonIterableChange};
use crate::listener::{ListChangeListener, ListListenerHelper, MapChangeListener, MapListenerHelper};
use crate::map::MapChange;
use crate::source::ListSource;

/// Listener storage and fault log of a list-like observable.
pub struct ListNotifier<E> {
    listeners: RefCell<ListListenerHelper<E>>,
    faults: RefCell<FaultLog>,
    config: ObservableConfig,
}

impl<E: 'static> ListNotifier<E> {
    pub fn new(config: ObservableConfig) -> Self {
        Self {
            listeners: RefCell::new(ListListenerHelper::new(config.initial_listener_capacity)),
            faults: RefCell::new(FaultLog::new(config.fault_capacity)),
            config,
        }
    }

    pub fn config(&self) -> ObservableConfig {
        self.config
    }

    pub fn add_listener(&self, listener: InvalidationListener) {
        self.listeners.borrow_mut().add_invalidation(listener);
    }

    pub fn remove_listener(&self, listener: &InvalidationListener) {
        self.listeners.borrow_mut().remove_invalidation(listener);
    }

    pub fn add_list_listener(&self, listener: ListChangeListener<E>) {
        self.listeners.borrow_mut().add_change(listener);
    }

    pub fn remove_list_listener(&self, listener: &ListChangeListener<E>) {
        self.listeners.borrow_mut().remove_change(listener);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    pub fn storage_kind(&self) -> StorageKind {
        self.listeners.borrow().kind()
    }

    pub fn take_faults(&self) -> Vec<ListenerFault> {
        self.faults.borrow_mut().take()
    }

    /// Fire `change` at every listener, rewinding it before each one.
    pub fn fire(
        &self,
        site: &dyn Observable,
        label: &str,
        change: &mut dyn ListChange<E>,
    ) -> Dispatch {
        let snapshot = self.listeners.borrow().snapshot();
        if snapshot.is_empty() {
            return Dispatch::new();
        }
        let site = DispatchSite::new(site, label, self.config.log_faults);
        let report = snapshot.dispatch(&site, ListenerKind::ListChange, |listener| {
            change.reset();
            listener.on_changed(change)
        });
        if !report.faults.is_empty() {
            self.faults.borrow_mut().record(report.faults.clone());
        }
        report
    }

    /// Fire `steps` as one change of `list`. No-op steps are dropped; nothing
    /// fires when none remain.
    pub fn fire_steps(
        &self,
        list: &dyn ListSource<E>,
        site: &dyn Observable,
        label: &str,
        mut steps: Vec<ListStep<E>>,
    ) -> Dispatch {
        steps.retain(|step| !step.is_noop());
        match steps.len() {
            0 => Dispatch::new(),
            1 => {
                let step = steps.remove(0);
                self.fire(site, label, &mut NonIterableChange::new(list, step))
            }
            _ => self.fire(site, label, &mut IterableChange::new(list, steps)),
        }
    }
}

impl<E> fmt::Debug for ListNotifier<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListNotifier")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Listener storage and fault log of an observable map.
pub struct MapNotifier<K, V> {
    listeners: RefCell<MapListenerHelper<K, V>>,
    faults: RefCell<FaultLog>,
    config: ObservableConfig,
}

impl<K: 'static, V: 'static> MapNotifier<K, V> {
    pub fn new(config: ObservableConfig) -> Self {
        Self {
            listeners: RefCell::new(MapListenerHelper::new(config.initial_listener_capacity)),
            faults: RefCell::new(FaultLog::new(config.fault_capacity)),
            config,
        }
    }

    pub fn add_listener(&self, listener: InvalidationListener) {
        self.listeners.borrow_mut().add_invalidation(listener);
    }

    pub fn remove_listener(&self, listener: &InvalidationListener) {
        self.listeners.borrow_mut().remove_invalidation(listener);
    }

    pub fn add_map_listener(&self, listener: MapChangeListener<K, V>) {
        self.listeners.borrow_mut().add_change(listener);
    }

    pub fn remove_map_listener(&self, listener: &MapChangeListener<K, V>) {
        self.listeners.borrow_mut().remove_change(listener);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    pub fn take_faults(&self) -> Vec<ListenerFault> {
        self.faults.borrow_mut().take()
    }

    pub fn fire(
        &self,
        site: &dyn Observable,
        label: &str,
        change: &MapChange<'_, K, V>,
    ) -> Dispatch {
        let snapshot = self.listeners.borrow().snapshot();
        if snapshot.is_empty() {
            return Dispatch::new();
        }
        let site = DispatchSite::new(site, label, self.config.log_faults);
        let report = snapshot.dispatch(&site, ListenerKind::MapChange, |listener| {
            listener.on_changed(change)
        });
        if !report.faults.is_empty() {
            self.faults.borrow_mut().record(report.faults.clone());
        }
        report
    }
}

impl<K, V> fmt::Debug for MapNotifier<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapNotifier")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
