use crate::input::Millis;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

/// Deadline queue polled from event handling and the frame tick. A handle stays live until it
/// fires or is cancelled, so callers can tell a stale expiry from a current one.
#[derive(Debug)]
pub struct TimerQueue<K> {
    next_id: u64,
    entries: Vec<TimerEntry<K>>,
}

#[derive(Debug)]
struct TimerEntry<K> {
    handle: TimerHandle,
    deadline: Millis,
    payload: K,
}

impl<K> Default for TimerQueue<K> {
    fn default() -> Self {
        Self { next_id: 1, entries: Vec::new() }
    }
}

impl<K> TimerQueue<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, deadline: Millis, payload: K) -> TimerHandle {
        let handle = TimerHandle(self.next_id);
        self.next_id += 1;
        self.entries.push(TimerEntry { handle, deadline, payload });
        handle
    }

    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.handle != handle);
        before != self.entries.len()
    }

    pub fn is_live(&self, handle: TimerHandle) -> bool {
        self.entries.iter().any(|entry| entry.handle == handle)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Removes and returns every timer whose deadline is at or before `now`, earliest first.
    pub fn drain_due(&mut self, now: Millis) -> Vec<(TimerHandle, K)> {
        let mut due = Vec::new();
        let mut idx = 0;
        while idx < self.entries.len() {
            if self.entries[idx].deadline <= now {
                due.push(self.entries.swap_remove(idx));
            } else {
                idx += 1;
            }
        }
        due.sort_by_key(|entry| (entry.deadline, entry.handle.0));
        due.into_iter().map(|entry| (entry.handle, entry.payload)).collect()
    }
}
