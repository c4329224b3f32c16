//! Global git identity settings.
use anyhow::Result;

use super::{Resource, ResourceChange, ResourceState};
use crate::exec::Executor;

/// A `git config --global` entry.
#[derive(Debug)]
pub struct GitConfigResource<'a> {
    /// Config key (e.g., "user.email").
    pub key: String,
    /// Desired value.
    pub desired_value: String,
    executor: &'a dyn Executor,
}

impl<'a> GitConfigResource<'a> {
    /// Create a new git config resource.
    #[must_use]
    pub const fn new(key: String, desired_value: String, executor: &'a dyn Executor) -> Self {
        Self {
            key,
            desired_value,
            executor,
        }
    }

    /// `user.name` and `user.email` entries for an identity.
    #[must_use]
    pub fn identity(name: &str, email: &str, executor: &'a dyn Executor) -> [Self; 2] {
        [
            Self::new("user.name".to_string(), name.to_string(), executor),
            Self::new("user.email".to_string(), email.to_string(), executor),
        ]
    }
}

impl Resource for GitConfigResource<'_> {
    fn description(&self) -> String {
        format!("git {} = {}", self.key, self.desired_value)
    }

    fn current_state(&self) -> Result<ResourceState> {
        let result = self
            .executor
            .run_unchecked("git", &["config", "--global", "--get", &self.key])?;
        let current = result.stdout.trim().to_string();

        if !result.success || current.is_empty() {
            Ok(ResourceState::Missing)
        } else if current == self.desired_value {
            Ok(ResourceState::Correct)
        } else {
            Ok(ResourceState::Incorrect { current })
        }
    }

    fn apply(&self) -> Result<ResourceChange> {
        self.executor.run(
            "git",
            &["config", "--global", &self.key, &self.desired_value],
        )?;
        Ok(ResourceChange::Applied)
    }
}
