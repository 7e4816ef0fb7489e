// Cyclic selection cursor over a navigable sequence.

/// `position` is `None` while nothing is selected.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NavigationCursor {
    position: Option<usize>,
    len: usize,
}

impl NavigationCursor {
    pub fn new(len: usize) -> Self {
        Self {
            position: None,
            len,
        }
    }

    pub fn position(&self) -> Option<usize> {
        self.position
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Advances with wraparound and returns the new position.
    /// From `None`, lands on 0. No-op on an empty sequence.
    pub fn next(&mut self) -> Option<usize> {
        if self.len == 0 {
            return None;
        }
        let next = match self.position {
            Some(position) => (position + 1) % self.len,
            None => 0,
        };
        self.position = Some(next);
        self.position
    }

    /// Steps back with wraparound. From `None`, behaves as if at 0, so it
    /// lands on the last entry. No-op on an empty sequence.
    pub fn previous(&mut self) -> Option<usize> {
        if self.len == 0 {
            return None;
        }
        let current = self.position.unwrap_or(0);
        self.position = Some((current + self.len - 1) % self.len);
        self.position
    }

    pub fn reset(&mut self) {
        self.position = None;
    }

    /// Updates the length without touching the selection. Growth only
    /// appends past the end, so a kept position still names the same entry.
    /// A shrink that strands the position clears it.
    pub fn resize(&mut self, len: usize) {
        self.len = len;
        if self.position.is_some_and(|position| position >= len) {
            self.position = None;
        }
    }

    /// Selects `position` directly (pointer click). Out of range is ignored.
    pub fn select(&mut self, position: usize) -> Option<usize> {
        if position < self.len {
            self.position = Some(position);
        }
        self.position
    }
}
