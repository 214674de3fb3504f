#![forbid(unsafe_code)]

//! The read surface shared by observable lists and list views.

use ftui_reactive::Observable;

use crate::listener::ListChangeListener;

/// An observable sequence: [`ObservableList`](crate::ObservableList) and every
/// view over one.
///
/// Handles are cheap clones of a shared list. Reads copy elements out so no
/// borrow escapes into listener code.
pub trait ListSource<E>: Observable {
    /// Number of elements.
    fn len(&self) -> usize;

    /// Whether the list has no elements.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The element at `index`.
    fn get(&self, index: usize) -> Option<E>;

    /// All elements in order.
    fn to_vec(&self) -> Vec<E>;

    /// Register a list change listener.
    fn add_list_listener(&self, listener: ListChangeListener<E>);

    /// Remove a list change listener.
    fn remove_list_listener(&self, listener: &ListChangeListener<E>);
}
