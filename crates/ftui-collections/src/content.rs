#![forbid(unsafe_code)]

//! Content binding: keep an [`ObservableList`] equal to another list.
//!
//! The target is overwritten once at bind time and then follows every source
//! change by replaying its steps, so target listeners see the same step shape
//! the source fired. The binding holds the target weakly; it stays active
//! until [`ContentBinding::unbind`] or until the target is dropped.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Replay rejected | Target was mutated directly and no longer matches | Warn, resynchronize with `set_all` |
//! | Target listener error | Downstream fault | Returned to the source's dispatch as a nested fault |

use std::fmt;
use std::rc::Rc;

use ftui_reactive::{ListenerResult, storage};

use crate::change::{ListChange, collect_steps};
use crate::list::{ListInner, ObservableList};
use crate::listener::ListChangeListener;
use crate::source::ListSource;

/// Active content binding from a source list into a target list.
pub struct ContentBinding<E> {
    source: Box<dyn ListSource<E>>,
    listener: ListChangeListener<E>,
}

impl<E: Clone + 'static> ContentBinding<E> {
    /// Stop mirroring. The target keeps its current contents.
    pub fn unbind(self) {
        self.source.remove_list_listener(&self.listener);
        tracing::trace!("content unbound");
    }
}

impl<E> fmt::Debug for ContentBinding<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentBinding")
            .field("listener", &self.listener)
            .finish_non_exhaustive()
    }
}

/// Mirror `source` into `target`.
pub fn bind_content<E, S>(target: &ObservableList<E>, source: &S) -> ContentBinding<E>
where
    E: Clone + 'static,
    S: ListSource<E> + Clone + 'static,
{
    target.set_all(source.to_vec());
    let listener = ListChangeListener::weak(&target.inner, mirror);
    source.add_list_listener(listener.clone());
    tracing::trace!(len = source.len(), "content bound");
    ContentBinding {
        source: Box::new(source.clone()),
        listener,
    }
}

fn mirror<E: Clone + 'static>(
    inner: &Rc<ListInner<E>>,
    change: &mut dyn ListChange<E>,
) -> ListenerResult {
    let target = ObservableList::from_inner(Rc::clone(inner));
    let steps = collect_steps(change)?;
    let report = match target.replay(steps) {
        Ok(report) => report,
        Err(err) => {
            tracing::warn!(error = %err, "content binding out of sync; resynchronizing");
            let contents = change.list().to_vec();
            target.set_all(contents);
            return Ok(());
        }
    };
    storage::propagate(report, "content binding propagation failed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn target_follows_source() {
        let source = ObservableList::from_vec(vec![1, 2, 3]);
        let target = ObservableList::from_vec(vec![9]);
        let _binding = bind_content(&target, &source);
        assert_eq!(target.to_vec(), vec![1, 2, 3]);

        source.add(4);
        source.remove(0).unwrap();
        source.set(0, 7).unwrap();
        source.sort_by(|a: &i32, b: &i32| b.cmp(a));
        assert_eq!(target.to_vec(), source.to_vec());
    }

    #[test]
    fn target_sees_source_step_shape() {
        let source = ObservableList::from_vec(vec![1, 2, 3, 4]);
        let target = ObservableList::new();
        let _binding = bind_content(&target, &source);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        target.add_list_listener(ListChangeListener::try_new(move |change| {
            sink.borrow_mut().push(collect_steps(change)?.len());
            Ok(())
        }));
        source.retain(|n| n % 2 == 0);
        assert_eq!(*seen.borrow(), vec![2]);
        assert_eq!(target.to_vec(), vec![2, 4]);
    }

    #[test]
    fn mirrors_a_view() {
        let source = ObservableList::from_vec(vec!["b", "a"]);
        let target = ObservableList::new();
        let _binding = bind_content(&target, &source.sorted());
        source.add("c");
        assert_eq!(target.to_vec(), vec!["a", "b", "c"]);
    }

    #[test]
    fn unbind_stops_mirroring() {
        let source = ObservableList::from_vec(vec![1]);
        let target = ObservableList::new();
        let binding = bind_content(&target, &source);
        binding.unbind();
        assert_eq!(source.listener_count(), 0);
        source.add(2);
        assert_eq!(target.to_vec(), vec![1]);
    }

    #[test]
    fn diverged_target_resynchronizes() {
        let source = ObservableList::from_vec(vec![1, 2]);
        let target = ObservableList::new();
        let _binding = bind_content(&target, &source);
        target.clear();
        source.remove(1).unwrap();
        assert_eq!(target.to_vec(), vec![1]);
    }
}
