use std::collections::BTreeMap;
use std::time::Duration;

use crate::lifecycle::ResetStep;

/// Whole milliseconds in `d`, saturating at `u64::MAX`.
pub fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Deferred work owned by a match.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Task {
    /// Destroy the cards played in `round`.
    CleanupPlayedCards { round: u32 },
    StartNextRound,
    Reset(ResetStep),
}

impl Task {
    /// Tasks that belong to the round loop, as opposed to the reset sequence.
    pub fn is_round_task(&self) -> bool {
        matches!(self, Task::CleanupPlayedCards { .. } | Task::StartNextRound)
    }
}

/// Ordered queue of delayed tasks on a virtual clock.
///
/// The clock only moves through [`Scheduler::advance`]. Tasks due at the
/// same instant come out in the order they were scheduled.
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    now: Duration,
    queue: BTreeMap<(Duration, u64), Task>,
    next_seq: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule_after(&mut self, delay: Duration, task: Task) -> Duration {
        let due = self.now + delay;
        self.queue.insert((due, self.next_seq), task);
        self.next_seq += 1;
        tracing::trace!(?task, due_ms = millis(due), "scheduled task");
        due
    }

    pub fn advance(&mut self, dt: Duration) {
        self.now += dt;
    }

    /// Takes the earliest task whose due time has passed.
    pub fn pop_due(&mut self) -> Option<Task> {
        let (&(due, _), _) = self.queue.first_key_value()?;
        if due > self.now {
            return None;
        }
        self.queue.pop_first().map(|(_, task)| task)
    }

    /// Drops every pending task matching `pred`. Returns how many were dropped.
    pub fn cancel_where<F>(&mut self, mut pred: F) -> usize
    where
        F: FnMut(&Task) -> bool,
    {
        let before = self.queue.len();
        self.queue.retain(|_, task| !pred(task));
        before - self.queue.len()
    }

    pub fn pending(&self) -> impl Iterator<Item = (Duration, Task)> + '_ {
        self.queue.iter().map(|(&(due, _), &task)| (due, task))
    }

    pub fn is_idle(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tasks_wait_for_their_due_time() {
        let mut s = Scheduler::new();
        s.schedule_after(Duration::from_secs(2), Task::StartNextRound);
        s.advance(Duration::from_millis(1999));
        assert_eq!(s.pop_due(), None);
        s.advance(Duration::from_millis(1));
        assert_eq!(s.pop_due(), Some(Task::StartNextRound));
        assert!(s.is_idle());
    }

    #[test]
    fn same_instant_keeps_insertion_order() {
        let mut s = Scheduler::new();
        s.schedule_after(Duration::from_secs(1), Task::Reset(ResetStep::ResetTurns));
        s.schedule_after(Duration::ZERO, Task::StartNextRound);
        s.schedule_after(Duration::from_secs(1), Task::Reset(ResetStep::ClearVictories));
        s.advance(Duration::from_secs(5));
        let drained: Vec<Task> = std::iter::from_fn(|| s.pop_due()).collect();
        assert_eq!(
            drained,
            vec![
                Task::StartNextRound,
                Task::Reset(ResetStep::ResetTurns),
                Task::Reset(ResetStep::ClearVictories),
            ]
        );
    }

    #[test]
    fn cancel_only_round_tasks() {
        let mut s = Scheduler::new();
        s.schedule_after(Duration::from_secs(1), Task::CleanupPlayedCards { round: 3 });
        s.schedule_after(Duration::from_secs(2), Task::StartNextRound);
        s.schedule_after(Duration::from_secs(3), Task::Reset(ResetStep::Complete));
        assert_eq!(s.cancel_where(Task::is_round_task), 2);
        assert_eq!(s.pending().count(), 1);
    }

    #[test]
    fn millis_saturates_instead_of_wrapping() {
        assert_eq!(millis(Duration::from_millis(1500)), 1500);
        assert_eq!(millis(Duration::MAX), u64::MAX);
    }
}
