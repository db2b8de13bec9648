use super::RepositorySet;
use crate::repository::Repository;
use std::sync::Arc;
use tracing::{info, warn};

/// An undo step recorded while a hub operation is in flight
pub enum Compensation {
    /// Put a removed repository back, unless something took its name since
    Republish {
        repos: Arc<RepositorySet>,
        repo: Arc<Repository>,
    },
}

impl Compensation {
    fn run(self) {
        match self {
            Compensation::Republish { repos, repo } => {
                let name = repo.name().to_string();
                if repos.insert_if_absent(repo) {
                    info!("Rolled back removal of repository {}", name);
                } else {
                    warn!("Repository {} was replaced meanwhile, not restoring", name);
                }
            }
        }
    }
}

/// Compensations for one operation
///
/// Runs them newest first on [`rollback`](Self::rollback), or on drop unless
/// [`commit`](Self::commit) was called.
#[derive(Default)]
pub struct CompensationStack {
    steps: Vec<Compensation>,
}

impl CompensationStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: Compensation) {
        self.steps.push(step);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The operation succeeded; discard every step.
    pub fn commit(mut self) {
        self.steps.clear();
    }

    pub fn rollback(mut self) {
        self.run_all();
    }

    fn run_all(&mut self) {
        while let Some(step) = self.steps.pop() {
            step.run();
        }
    }
}

impl Drop for CompensationStack {
    fn drop(&mut self) {
        if !self.steps.is_empty() {
            warn!("Operation abandoned, running {} compensation(s)", self.steps.len());
            self.run_all();
        }
    }
}
