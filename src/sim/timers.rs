//! Scheduled tasks tagged with the attempt they belong to
//!
//! Sleep expiry, the enemy's delayed turn and the jump animation flag are
//! all deferred mutations. Each is stored with its attempt id; tasks from an
//! older attempt are dropped instead of applied.

/// What a task does when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    SleepExpiry,
    /// Enemy strikes back in encounter `encounter`
    EnemyTurn { encounter: u32 },
    /// Clear the `jumping` animation flag
    JumpSettled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

#[derive(Debug, Clone)]
struct Task {
    id: TaskId,
    attempt: u32,
    due_ms: u64,
    kind: TaskKind,
}

/// Pending tasks in schedule order
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: Vec<Task>,
    next_id: u64,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, attempt: u32, due_ms: u64, kind: TaskKind) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.tasks.push(Task {
            id,
            attempt,
            due_ms,
            kind,
        });
        id
    }

    pub fn cancel(&mut self, id: TaskId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        self.tasks.len() != before
    }

    /// Cancel every task whose kind matches
    pub fn cancel_where(&mut self, pred: impl Fn(&TaskKind) -> bool) {
        self.tasks.retain(|t| !pred(&t.kind));
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Remove and return the earliest task due at `now` for `attempt`.
    /// Tasks from other attempts are discarded on the way.
    pub fn pop_due(&mut self, attempt: u32, now: u64) -> Option<TaskKind> {
        self.tasks.retain(|t| {
            let current = t.attempt == attempt;
            if !current {
                log::debug!(
                    "Discarding stale {:?} from attempt {} (current {})",
                    t.kind,
                    t.attempt,
                    attempt
                );
            }
            current
        });

        let idx = self
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due_ms <= now)
            .min_by_key(|(_, t)| (t.due_ms, t.id))
            .map(|(i, _)| i)?;
        Some(self.tasks.remove(idx).kind)
    }
}
