use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use fairchance_core::gateway::PersistenceGateway;
use fairchance_core::state_machine::StepStateMachine;
use fairchance_core::types::SubjectId;
use tokio::sync::{Mutex, RwLock};

/// A state machine shared by every request for one subject.
pub type SessionHandle = Arc<Mutex<StepStateMachine>>;

struct Session {
    machine: SessionHandle,
    last_used: Instant,
}

/// Keeps one [`StepStateMachine`] per subject that has recently changed.
///
/// Requests for the same subject take turns on its machine, and the
/// machine's last known state outlives a single request, so a storage
/// outage after a successful send does not bounce the admin back to step 1.
/// Sessions unused for longer than the idle limit are dropped the next time
/// one is opened.
pub struct AssessmentSessions {
    gateway: Arc<dyn PersistenceGateway>,
    idle: Duration,
    machines: RwLock<HashMap<SubjectId, Session>>,
}

impl AssessmentSessions {
    pub fn new(gateway: Arc<dyn PersistenceGateway>, idle: Duration) -> Self {
        Self {
            gateway,
            idle,
            machines: RwLock::new(HashMap::new()),
        }
    }

    /// The machine for `subject`, registered on first use. For requests
    /// that write.
    pub async fn machine(&self, subject: SubjectId) -> SessionHandle {
        let now = Instant::now();
        let mut machines = self.machines.write().await;
        self.evict_idle(&mut machines, subject, now);

        let session = machines.entry(subject).or_insert_with(|| {
            tracing::debug!(%subject, "Assessment session opened");
            Session {
                machine: Arc::new(Mutex::new(StepStateMachine::new(
                    Arc::clone(&self.gateway),
                    subject,
                ))),
                last_used: now,
            }
        });
        session.last_used = now;
        Arc::clone(&session.machine)
    }

    /// The registered machine for `subject`, or an unregistered one when the
    /// subject has no session. For requests that only read.
    pub async fn reader(&self, subject: SubjectId) -> SessionHandle {
        if let Some(session) = self.machines.read().await.get(&subject) {
            return Arc::clone(&session.machine);
        }
        Arc::new(Mutex::new(StepStateMachine::new(
            Arc::clone(&self.gateway),
            subject,
        )))
    }

    /// Number of subjects with a live session.
    pub async fn session_count(&self) -> usize {
        self.machines.read().await.len()
    }

    fn evict_idle(
        &self,
        machines: &mut HashMap<SubjectId, Session>,
        keep: SubjectId,
        now: Instant,
    ) {
        let before = machines.len();
        machines.retain(|subject, session| {
            *subject == keep
                || Arc::strong_count(&session.machine) > 1
                || now.duration_since(session.last_used) < self.idle
        });
        let evicted = before - machines.len();
        if evicted > 0 {
            tracing::debug!(evicted, remaining = machines.len(), "Idle assessment sessions dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fairchance_core::memory::MemoryGateway;

    fn sessions(idle: Duration) -> AssessmentSessions {
        AssessmentSessions::new(Arc::new(MemoryGateway::new()), idle)
    }

    #[tokio::test]
    async fn same_subject_shares_one_machine() {
        let sessions = sessions(Duration::from_secs(60));
        let a = sessions.machine(SubjectId::new(1, 2)).await;
        let b = sessions.machine(SubjectId::new(1, 2)).await;
        let c = sessions.machine(SubjectId::new(1, 3)).await;

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(sessions.session_count().await, 2);
    }

    #[tokio::test]
    async fn readers_do_not_open_sessions() {
        let sessions = sessions(Duration::from_secs(60));
        let unknown = sessions.reader(SubjectId::new(1, 2)).await;
        assert_eq!(sessions.session_count().await, 0);

        let open = sessions.machine(SubjectId::new(1, 2)).await;
        let shared = sessions.reader(SubjectId::new(1, 2)).await;
        assert!(Arc::ptr_eq(&open, &shared));
        assert!(!Arc::ptr_eq(&open, &unknown));
    }

    #[tokio::test]
    async fn idle_sessions_are_dropped() {
        let sessions = sessions(Duration::ZERO);
        drop(sessions.machine(SubjectId::new(1, 2)).await);
        drop(sessions.machine(SubjectId::new(1, 3)).await);
        assert_eq!(sessions.session_count().await, 1);
    }

    #[tokio::test]
    async fn sessions_in_use_are_kept() {
        let sessions = sessions(Duration::ZERO);
        let held = sessions.machine(SubjectId::new(1, 2)).await;
        sessions.machine(SubjectId::new(1, 3)).await;
        assert_eq!(sessions.session_count().await, 2);
        drop(held);
    }
}
