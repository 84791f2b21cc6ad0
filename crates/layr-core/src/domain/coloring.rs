//! Three-colour cycle detection over template names.
//!
//! Absent names are unvisited. A name is in progress while its resolution
//! is on the stack, then done. Meeting an in-progress name again is a
//! cycle; meeting a done one (a diamond) is fine.

use std::collections::HashMap;

use crate::error::{CycleKind, LayrError, LayrResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// Visit state for one top-level resolution call.
#[derive(Debug)]
pub struct Coloring {
    kind: CycleKind,
    marks: HashMap<String, Mark>,
    path: Vec<String>,
}

impl Coloring {
    pub fn new(kind: CycleKind) -> Self {
        Self {
            kind,
            marks: HashMap::new(),
            path: Vec::new(),
        }
    }

    /// Fail if `name` is already on the current path.
    pub fn check(&self, name: &str) -> LayrResult<()> {
        if self.marks.get(name) != Some(&Mark::InProgress) {
            return Ok(());
        }
        let start = self.path.iter().position(|p| p == name).unwrap_or(0);
        let mut chain = self.path[start..].to_vec();
        chain.push(name.to_string());
        Err(LayrError::Cycle {
            kind: self.kind,
            chain,
        })
    }

    pub fn enter(&mut self, name: &str) -> LayrResult<()> {
        self.check(name)?;
        self.marks.insert(name.to_string(), Mark::InProgress);
        self.path.push(name.to_string());
        Ok(())
    }

    pub fn leave(&mut self, name: &str) {
        self.marks.insert(name.to_string(), Mark::Done);
        if self.path.last().is_some_and(|last| last == name) {
            self.path.pop();
        }
    }
}
