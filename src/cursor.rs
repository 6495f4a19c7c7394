//! Offset bookkeeping for `getUpdates`.

/// Highest update id consumed so far.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UpdateCursor {
    last_seen: Option<i64>,
}

impl UpdateCursor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Offset for the next poll, `None` until the first update is seen.
    #[must_use]
    pub fn next_offset(&self) -> Option<i64> {
        self.last_seen.map(|id| id + 1)
    }

    /// Record `update_id`. Never moves the cursor backwards.
    pub fn advance(&mut self, update_id: i64) {
        self.last_seen = Some(self.last_seen.map_or(update_id, |id| id.max(update_id)));
    }

    #[must_use]
    pub fn last_seen(&self) -> Option<i64> {
        self.last_seen
    }
}
