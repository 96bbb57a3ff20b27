use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

/// Admits at most one in-flight pipeline per repository name.
#[derive(Debug, Default)]
pub struct RepoGate {
    active: Mutex<HashSet<String>>,
}

/// Held while a repository is being synchronized; releases the name on drop.
#[derive(Debug)]
pub struct GateGuard {
    gate: Arc<RepoGate>,
    name: String,
}

impl RepoGate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Claim `name`, or `None` if another pipeline holds it.
    pub fn try_enter(self: &Arc<Self>, name: &str) -> Option<GateGuard> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if !active.insert(name.to_string()) {
            return None;
        }
        Some(GateGuard {
            gate: Arc::clone(self),
            name: name.to_string(),
        })
    }
}

impl Drop for GateGuard {
    fn drop(&mut self) {
        self.gate
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_claim_rejected_until_release() {
        let gate = RepoGate::new();
        let first = gate.try_enter("a").unwrap();
        assert!(gate.try_enter("a").is_none());
        assert!(gate.try_enter("b").is_some());
        drop(first);
        assert!(gate.try_enter("a").is_some());
    }
}
