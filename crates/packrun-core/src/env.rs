//! Build environment and its checkpoint stack.
//!
//! The build environment is the mutable key/value state plugins see while
//! they run (`TARGET`, `TARGET_ARCH`, toolchain paths, ...). It is an
//! explicit object handed to every unit of work rather than process-global
//! state, and the checkpoint stack is the only way to mutate it: every
//! mutation must happen between a `checkpoint()` and its matching `revert()`.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{Error, Result};

/// A single environment variable and where it was set from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvVar {
    pub value: String,
    /// Human readable origin, e.g. "driver" or "command plugin".
    pub source: String,
}

/// Full key/value state of the environment at the time of a checkpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentSnapshot {
    vars: BTreeMap<String, EnvVar>,
}

/// Mutable build environment guarded by a LIFO checkpoint stack.
#[derive(Debug, Clone, Default)]
pub struct BuildEnvironment {
    vars: BTreeMap<String, EnvVar>,
    checkpoints: Vec<EnvironmentSnapshot>,
    taken: usize,
}

impl BuildEnvironment {
    /// Create an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an environment seeded with base values.
    ///
    /// Seeding happens before any checkpoint exists; afterwards the
    /// environment can only change inside a checkpoint bracket.
    pub fn from_vars<I, K, V, S>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V, S)>,
        K: Into<String>,
        V: Into<String>,
        S: Into<String>,
    {
        let vars = vars
            .into_iter()
            .map(|(key, value, source)| {
                (
                    key.into(),
                    EnvVar {
                        value: value.into(),
                        source: source.into(),
                    },
                )
            })
            .collect();
        Self {
            vars,
            ..Self::default()
        }
    }

    /// Capture the current state and push it. Returns the new stack depth.
    pub fn checkpoint(&mut self) -> usize {
        self.checkpoints.push(EnvironmentSnapshot {
            vars: self.vars.clone(),
        });
        self.taken += 1;
        self.checkpoints.len()
    }

    /// Pop the most recent checkpoint and restore the environment to it.
    pub fn revert(&mut self) -> Result<()> {
        let snapshot = self.checkpoints.pop().ok_or_else(|| {
            Error::Usage("revert called without a matching checkpoint".to_string())
        })?;
        self.vars = snapshot.vars;
        Ok(())
    }

    /// Restore the checkpoint that returned `depth`, discarding any frames
    /// pushed above it. Returns how many inner frames were discarded.
    ///
    /// Fails with `Error::Usage`, leaving the environment untouched, when
    /// that checkpoint has already been popped.
    pub fn revert_to(&mut self, depth: usize) -> Result<usize> {
        if depth == 0 || self.checkpoints.len() < depth {
            return Err(Error::Usage(format!(
                "checkpoint {} is no longer on the stack (depth {})",
                depth,
                self.checkpoints.len()
            )));
        }
        let discarded = self.checkpoints.len() - depth;
        self.checkpoints.truncate(depth);
        self.revert()?;
        Ok(discarded)
    }

    /// Force the stack to exactly `depth` frames with the current state set
    /// to `snapshot`. Frames missing below `depth` are re-created from
    /// `snapshot`.
    pub fn reset(&mut self, depth: usize, snapshot: &EnvironmentSnapshot) {
        self.checkpoints.truncate(depth);
        while self.checkpoints.len() < depth {
            self.checkpoints.push(snapshot.clone());
        }
        self.vars = snapshot.vars.clone();
    }

    /// Number of active checkpoints.
    pub fn depth(&self) -> usize {
        self.checkpoints.len()
    }

    /// Total checkpoints taken over the environment's lifetime.
    pub fn checkpoints_taken(&self) -> usize {
        self.taken
    }

    /// Set a variable. Requires an active checkpoint.
    pub fn set_value(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
        source: impl Into<String>,
    ) -> Result<()> {
        let key = key.into();
        self.ensure_guarded(&key)?;
        self.vars.insert(
            key,
            EnvVar {
                value: value.into(),
                source: source.into(),
            },
        );
        Ok(())
    }

    /// Remove a variable. Requires an active checkpoint.
    pub fn remove(&mut self, key: &str) -> Result<Option<EnvVar>> {
        self.ensure_guarded(key)?;
        Ok(self.vars.remove(key))
    }

    pub fn get_value(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(|v| v.value.as_str())
    }

    pub fn get_source(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(|v| v.source.as_str())
    }

    /// Iterate over `(key, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars
            .iter()
            .map(|(k, v)| (k.as_str(), v.value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Capture the current state without pushing it.
    pub fn snapshot(&self) -> EnvironmentSnapshot {
        EnvironmentSnapshot {
            vars: self.vars.clone(),
        }
    }

    /// Whether the current state equals a previously captured snapshot.
    pub fn matches(&self, snapshot: &EnvironmentSnapshot) -> bool {
        self.vars == snapshot.vars
    }

    fn ensure_guarded(&self, key: &str) -> Result<()> {
        if self.checkpoints.is_empty() {
            return Err(Error::Usage(format!(
                "attempted to modify '{}' outside a checkpoint",
                key
            )));
        }
        Ok(())
    }
}
