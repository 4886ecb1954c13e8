//! Gate tracking for nested conditional regions.

/// A compact stand-in for the stack of booleans implied by nested
/// `OP_IF`/`OP_NOTIF` regions.
///
/// Individual entries are never observed; execution only needs to know
/// whether the stack is empty and whether any false entry is present. It is
/// therefore enough to store the implied size and the position of the first
/// false entry, with `toggle_top` covering `OP_ELSE`.
#[derive(Debug, Clone)]
pub struct ConditionStack {
    size: u32,
    /// Position of the first false entry, or [`Self::NO_FALSE`] if all true.
    first_false: u32,
}

impl Default for ConditionStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ConditionStack {
    const NO_FALSE: u32 = u32::MAX;

    pub fn new() -> Self {
        Self {
            size: 0,
            first_false: Self::NO_FALSE,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn all_true(&self) -> bool {
        self.first_false == Self::NO_FALSE
    }

    pub fn push(&mut self, value: bool) {
        if self.first_false == Self::NO_FALSE && !value {
            // Everything up to here is true; the new entry is the first false.
            self.first_false = self.size;
        }
        self.size += 1;
    }

    /// Removes the top entry. The caller must ensure the stack is non-empty.
    pub fn pop(&mut self) {
        debug_assert!(self.size > 0);
        self.size -= 1;
        if self.first_false == self.size {
            self.first_false = Self::NO_FALSE;
        }
    }

    /// Flips the top entry without observing it.
    ///
    /// Toggling anything but the first false entry is unobservable, so only
    /// the all-true and top-is-first-false cases change state.
    pub fn toggle_top(&mut self) {
        debug_assert!(self.size > 0);
        if self.first_false == Self::NO_FALSE {
            self.first_false = self.size - 1;
        } else if self.first_false == self.size - 1 {
            self.first_false = Self::NO_FALSE;
        }
    }
}
