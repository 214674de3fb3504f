#![forbid(unsafe_code)]

//! Observable collections for FrankenTUI.
//!
//! - [`ObservableList`]: a shared list reporting every mutation as a
//!   [`ListChange`].
//! - [`ObservableMap`]: a shared hash map reporting one [`MapChange`] per
//!   changed entry.
//! - Views over any [`ListSource`]: [`FilteredList`], [`SortedList`], and
//!   [`ReadOnlyListView`]. Views are list sources themselves and chain.
//! - [`bind_content`] mirrors one list into another; [`bindings`] derives
//!   scalar [`Binding`](ftui_reactive::Binding)s from collections.
//!
//! # Change protocol
//!
//! A [`ListChange`] is a cursor over one or more [`ListStep`]s. Call
//! [`ListChange::next`] before reading a step; each step is expressed
//! against the list as it stands after the earlier steps, so replaying them
//! in order onto the old contents yields the new contents:
//!
//! ```ignore
//! list.add_list_listener(ListChangeListener::try_new(|change| {
//!     while change.next() {
//!         if change.was_added()? {
//!             println!("added {:?} at {}", change.added_sublist()?, change.from()?);
//!         }
//!     }
//!     Ok(())
//! }));
//! ```
//!
//! Every listener receives the change with its cursor rewound.
//!
//! # Invariants
//!
//! 1. One mutating call fires at most one list change; map mutations fire one
//!    change per affected entry.
//! 2. Invalidation listeners fire before list and map listeners.
//! 3. Views drop their source listener when the last handle goes away.

pub mod bindings;
pub mod change;
pub mod content;
pub mod error;
pub mod filtered;
pub mod list;
pub mod listener;
pub mod map;
mod notifier;
pub mod read_only;
pub mod sorted;
pub mod source;

pub use change::{
    IterableChange, ListChange, ListStep, NonIterableChange, SourceAdapterChange, collect_steps,
};
pub use content::{ContentBinding, bind_content};
pub use error::{ChangeError, ListError};
pub use filtered::FilteredList;
pub use list::ObservableList;
pub use listener::{ListChangeListener, ListListenerHelper, MapChangeListener, MapListenerHelper};
pub use map::{MapChange, ObservableMap};
pub use read_only::ReadOnlyListView;
pub use sorted::SortedList;
pub use source::ListSource;
