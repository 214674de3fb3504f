#![forbid(unsafe_code)]

//! The list change protocol.
//!
//! A mutation of an observable list is reported as one [`ListChange`]: a
//! single-pass cursor over [`ListStep`]s. Listeners call
//! [`next`](ListChange::next) to move to the first step and keep calling it
//! until it returns `false`.
//!
//! ```text
//! list [A, B, C, D]  retain(|x| x != B && x != D)
//!
//! step 0: from=1 to=1 removed=[B]      → [A, C, D]
//! step 1: from=2 to=2 removed=[D]      → [A, C]
//! ```
//!
//! # Invariants
//!
//! 1. Each step is expressed against the list as it stands after every earlier
//!    step of the same change was applied. Replaying the steps in order onto a
//!    copy of the old contents yields the new contents.
//! 2. A step is exactly one of: add/remove (either side may be empty),
//!    permutation, update.
//! 3. `was_replaced() == was_added() && was_removed()`.
//! 4. Facets are only defined while the cursor is on a step; otherwise they
//!    return [`ChangeError::NotStarted`] or [`ChangeError::Exhausted`].
//!
//! Permutation indices are absolute: for `i` in `[from, to)`,
//! `permutation(i)` is the new index of the element that was at `i`.

use crate::error::{ChangeError, ListError, check_range};
use crate::source::ListSource;

/// One sub-change of a [`ListChange`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListStep<E> {
    from: usize,
    to: usize,
    removed: Vec<E>,
    added: Vec<E>,
    permutation: Vec<usize>,
    updated: bool,
}

impl<E> ListStep<E> {
    /// `removed` was taken out at `from` and `added` put in its place.
    #[must_use]
    pub fn add_remove(from: usize, removed: Vec<E>, added: Vec<E>) -> Self {
        Self {
            from,
            to: from + added.len(),
            removed,
            added,
            permutation: Vec::new(),
            updated: false,
        }
    }

    /// `added` was inserted at `from`.
    #[must_use]
    pub fn added(from: usize, added: Vec<E>) -> Self {
        Self::add_remove(from, Vec::new(), added)
    }

    /// `removed` was taken out at `from`.
    #[must_use]
    pub fn removed(from: usize, removed: Vec<E>) -> Self {
        Self::add_remove(from, removed, Vec::new())
    }

    /// The elements at `[from, from + permutation.len())` moved; element
    /// `from + k` is now at `permutation[k]`.
    #[must_use]
    pub fn permutation(from: usize, permutation: Vec<usize>) -> Self {
        Self {
            from,
            to: from + permutation.len(),
            removed: Vec::new(),
            added: Vec::new(),
            permutation,
            updated: false,
        }
    }

    /// The elements at `[from, from + updated.len())` changed in place and
    /// now equal `updated`.
    #[must_use]
    pub fn updated(from: usize, updated: Vec<E>) -> Self {
        Self {
            from,
            to: from + updated.len(),
            removed: Vec::new(),
            added: updated,
            permutation: Vec::new(),
            updated: true,
        }
    }

    /// First index affected.
    #[must_use]
    pub fn from(&self) -> usize {
        self.from
    }

    /// End of the affected range (exclusive) in the list after this step.
    #[must_use]
    pub fn to(&self) -> usize {
        self.to
    }

    /// Elements removed by this step.
    #[must_use]
    pub fn removed_elements(&self) -> &[E] {
        &self.removed
    }

    /// Snapshot of the elements now at `[from, to)`, for add and update steps.
    #[must_use]
    pub fn added_elements(&self) -> &[E] {
        &self.added
    }

    /// The new indices, for permutation steps.
    #[must_use]
    pub fn permutation_indices(&self) -> Option<&[usize]> {
        if self.permutation.is_empty() {
            None
        } else {
            Some(&self.permutation)
        }
    }

    #[must_use]
    pub fn was_added(&self) -> bool {
        !self.was_permutated() && !self.updated && self.to > self.from
    }

    #[must_use]
    pub fn was_removed(&self) -> bool {
        !self.removed.is_empty()
    }

    #[must_use]
    pub fn was_replaced(&self) -> bool {
        self.was_added() && self.was_removed()
    }

    #[must_use]
    pub fn was_permutated(&self) -> bool {
        !self.permutation.is_empty()
    }

    #[must_use]
    pub fn was_updated(&self) -> bool {
        self.updated
    }

    /// Whether the step changes nothing (empty add/remove, identity permutation).
    #[must_use]
    pub fn is_noop(&self) -> bool {
        if self.was_permutated() {
            return self
                .permutation
                .iter()
                .enumerate()
                .all(|(k, &to)| to == self.from + k);
        }
        !self.updated && self.removed.is_empty() && self.added.is_empty()
    }
}

impl<E: Clone> ListStep<E> {
    /// Apply this step to `items`.
    ///
    /// # Errors
    ///
    /// Returns [`ListError::InvalidRange`] if the step does not fit `items`.
    pub fn apply(&self, items: &mut Vec<E>) -> Result<(), ListError> {
        let len = items.len();
        if self.was_permutated() {
            check_range(self.from, self.to, len)?;
            if let Some(&bad) = self
                .permutation
                .iter()
                .find(|&&to| to < self.from || to >= self.to)
            {
                return Err(ListError::IndexOutOfBounds {
                    index: bad,
                    len: self.to,
                });
            }
            let moved: Vec<E> = items[self.from..self.to].to_vec();
            for (element, &target) in moved.into_iter().zip(&self.permutation) {
                items[target] = element;
            }
        } else if self.updated {
            check_range(self.from, self.to, len)?;
            items.splice(self.from..self.to, self.added.iter().cloned());
        } else {
            let end = self.from + self.removed.len();
            check_range(self.from, end, len)?;
            items.splice(self.from..end, self.added.iter().cloned());
        }
        Ok(())
    }
}

/// A single-pass cursor over the steps of one list mutation.
pub trait ListChange<E> {
    /// The list that changed.
    fn list(&self) -> &dyn ListSource<E>;

    /// Move to the next step. Returns `false` once every step was visited.
    fn next(&mut self) -> bool;

    /// Rewind to before the first step.
    fn reset(&mut self);

    /// The step under the cursor.
    ///
    /// # Errors
    ///
    /// [`ChangeError::NotStarted`] before the first `next()`,
    /// [`ChangeError::Exhausted`] after the last.
    fn current(&self) -> Result<&ListStep<E>, ChangeError>;

    fn from(&self) -> Result<usize, ChangeError> {
        Ok(self.current()?.from())
    }

    fn to(&self) -> Result<usize, ChangeError> {
        Ok(self.current()?.to())
    }

    fn removed(&self) -> Result<&[E], ChangeError> {
        Ok(self.current()?.removed_elements())
    }

    fn removed_size(&self) -> Result<usize, ChangeError> {
        Ok(self.current()?.removed_elements().len())
    }

    /// Snapshot of the elements added (or updated) by the current step.
    fn added_sublist(&self) -> Result<&[E], ChangeError> {
        Ok(self.current()?.added_elements())
    }

    fn added_size(&self) -> Result<usize, ChangeError> {
        let step = self.current()?;
        Ok(if step.was_added() { step.to() - step.from() } else { 0 })
    }

    fn was_added(&self) -> Result<bool, ChangeError> {
        Ok(self.current()?.was_added())
    }

    fn was_removed(&self) -> Result<bool, ChangeError> {
        Ok(self.current()?.was_removed())
    }

    fn was_replaced(&self) -> Result<bool, ChangeError> {
        Ok(self.current()?.was_replaced())
    }

    fn was_permutated(&self) -> Result<bool, ChangeError> {
        Ok(self.current()?.was_permutated())
    }

    fn was_updated(&self) -> Result<bool, ChangeError> {
        Ok(self.current()?.was_updated())
    }

    /// New index of the element that was at `index`.
    ///
    /// # Errors
    ///
    /// [`ChangeError::NoPermutation`] if the step is not a permutation,
    /// [`ChangeError::IndexOutOfRange`] if `index` is outside `[from, to)`.
    fn permutation(&self, index: usize) -> Result<usize, ChangeError> {
        let step = self.current()?;
        let indices = step.permutation_indices().ok_or(ChangeError::NoPermutation)?;
        if index < step.from() || index >= step.to() {
            return Err(ChangeError::IndexOutOfRange {
                index,
                from: step.from(),
                to: step.to(),
            });
        }
        Ok(indices[index - step.from()])
    }
}

/// Rewind `change`, copy out every step, and rewind it again.
///
/// # Errors
///
/// Propagates cursor errors from a misbehaving [`ListChange`] implementation.
pub fn collect_steps<E: Clone>(
    change: &mut dyn ListChange<E>,
) -> Result<Vec<ListStep<E>>, ChangeError> {
    change.reset();
    let mut steps = Vec::new();
    while change.next() {
        steps.push(change.current()?.clone());
    }
    change.reset();
    Ok(steps)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cursor {
    Before,
    At(usize),
    After,
}

impl Cursor {
    fn advance(&mut self, len: usize) -> bool {
        *self = match *self {
            Cursor::Before if len > 0 => Cursor::At(0),
            Cursor::At(i) if i + 1 < len => Cursor::At(i + 1),
            _ => Cursor::After,
        };
        matches!(self, Cursor::At(_))
    }

    fn index(self) -> Result<usize, ChangeError> {
        match self {
            Cursor::Before => Err(ChangeError::NotStarted),
            Cursor::At(i) => Ok(i),
            Cursor::After => Err(ChangeError::Exhausted),
        }
    }
}

// ---------------------------------------------------------------------------
// NonIterableChange
// ---------------------------------------------------------------------------

/// A change with exactly one step.
pub struct NonIterableChange<'a, E> {
    list: &'a dyn ListSource<E>,
    step: ListStep<E>,
    cursor: Cursor,
}

impl<'a, E> NonIterableChange<'a, E> {
    /// Wrap a prepared step.
    #[must_use]
    pub fn new(list: &'a dyn ListSource<E>, step: ListStep<E>) -> Self {
        Self {
            list,
            step,
            cursor: Cursor::Before,
        }
    }

    /// `added` inserted at `from`.
    #[must_use]
    pub fn simple_add(list: &'a dyn ListSource<E>, from: usize, added: Vec<E>) -> Self {
        Self::new(list, ListStep::added(from, added))
    }

    /// `removed` taken out at `from`.
    #[must_use]
    pub fn simple_removed(list: &'a dyn ListSource<E>, from: usize, removed: Vec<E>) -> Self {
        Self::new(list, ListStep::removed(from, removed))
    }

    /// `removed` replaced by `added` at `from`.
    #[must_use]
    pub fn generic_add_remove(
        list: &'a dyn ListSource<E>,
        from: usize,
        removed: Vec<E>,
        added: Vec<E>,
    ) -> Self {
        Self::new(list, ListStep::add_remove(from, removed, added))
    }

    /// Elements starting at `from` moved to `permutation`.
    #[must_use]
    pub fn simple_permutation(
        list: &'a dyn ListSource<E>,
        from: usize,
        permutation: Vec<usize>,
    ) -> Self {
        Self::new(list, ListStep::permutation(from, permutation))
    }

    /// Elements starting at `from` changed in place to `updated`.
    #[must_use]
    pub fn simple_update(list: &'a dyn ListSource<E>, from: usize, updated: Vec<E>) -> Self {
        Self::new(list, ListStep::updated(from, updated))
    }
}

impl<E> ListChange<E> for NonIterableChange<'_, E> {
    fn list(&self) -> &dyn ListSource<E> {
        self.list
    }

    fn next(&mut self) -> bool {
        self.cursor.advance(1)
    }

    fn reset(&mut self) {
        self.cursor = Cursor::Before;
    }

    fn current(&self) -> Result<&ListStep<E>, ChangeError> {
        self.cursor.index().map(|_| &self.step)
    }
}

// ---------------------------------------------------------------------------
// IterableChange
// ---------------------------------------------------------------------------

/// A batched change with any number of steps.
pub struct IterableChange<'a, E> {
    list: &'a dyn ListSource<E>,
    steps: Vec<ListStep<E>>,
    cursor: Cursor,
}

impl<'a, E> IterableChange<'a, E> {
    /// Wrap prepared steps, in sequential coordinates.
    #[must_use]
    pub fn new(list: &'a dyn ListSource<E>, steps: Vec<ListStep<E>>) -> Self {
        Self {
            list,
            steps,
            cursor: Cursor::Before,
        }
    }

    /// Number of steps.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }
}

impl<E> ListChange<E> for IterableChange<'_, E> {
    fn list(&self) -> &dyn ListSource<E> {
        self.list
    }

    fn next(&mut self) -> bool {
        self.cursor.advance(self.steps.len())
    }

    fn reset(&mut self) {
        self.cursor = Cursor::Before;
    }

    fn current(&self) -> Result<&ListStep<E>, ChangeError> {
        let index = self.cursor.index()?;
        self.steps.get(index).ok_or(ChangeError::Exhausted)
    }
}

// ---------------------------------------------------------------------------
// SourceAdapterChange
// ---------------------------------------------------------------------------

/// Forwards a change from one list while reporting another as its `list()`.
pub struct SourceAdapterChange<'a, 'c, E> {
    list: &'a dyn ListSource<E>,
    change: &'a mut (dyn ListChange<E> + 'c),
}

impl<'a, 'c, E> SourceAdapterChange<'a, 'c, E> {
    /// Present `change` as a change of `list`.
    pub fn new(list: &'a dyn ListSource<E>, change: &'a mut (dyn ListChange<E> + 'c)) -> Self {
        Self { list, change }
    }
}

impl<E> ListChange<E> for SourceAdapterChange<'_, '_, E> {
    fn list(&self) -> &dyn ListSource<E> {
        self.list
    }

    fn next(&mut self) -> bool {
        self.change.next()
    }

    fn reset(&mut self) {
        self.change.reset();
    }

    fn current(&self) -> Result<&ListStep<E>, ChangeError> {
        self.change.current()
    }
}
