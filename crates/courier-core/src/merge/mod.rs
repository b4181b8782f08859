//! Flattening routers into a single dispatch table.
//!
//! [`merge_routers`] walks each router depth-first and records every
//! procedure under its fully qualified path. Named routers contribute their
//! namespace as the first path segment; anonymous routers contribute their
//! entries at the root. Nested routers are qualified by the name they were
//! nested under.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;
use tracing::debug;

use crate::procedure::Procedure;
use crate::router::{PATH_SEPARATOR, Router, RouterEntry};

/// Tracing target for router merging.
pub(crate) const MERGE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::merge");

/// Errors raised while merging routers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    /// Two routers define the same qualified path.
    #[error("procedure path '{path}' is defined more than once")]
    Collision {
        /// The colliding path.
        path: String,
    },
}

/// Immutable lookup table from qualified paths to procedures.
pub struct MergedRouter<C> {
    procedures: Vec<(String, Procedure<C>)>,
    index: HashMap<String, usize>,
}

impl<C> MergedRouter<C> {
    /// Looks up a procedure by qualified path.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Procedure<C>> {
        self.index
            .get(path)
            .and_then(|position| self.procedures.get(*position))
            .map(|(_, procedure)| procedure)
    }

    /// Returns `true` when the path names a procedure.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    /// Returns the number of procedures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.procedures.len()
    }

    /// Returns `true` when no procedures are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.procedures.is_empty()
    }

    /// Iterates qualified paths in merge order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.procedures.iter().map(|(path, _)| path.as_str())
    }

    /// Iterates paths and procedures in merge order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Procedure<C>)> {
        self.procedures
            .iter()
            .map(|(path, procedure)| (path.as_str(), procedure))
    }

    fn insert(&mut self, path: String, procedure: Procedure<C>) -> Result<(), MergeError> {
        if self.index.contains_key(&path) {
            return Err(MergeError::Collision { path });
        }
        self.index.insert(path.clone(), self.procedures.len());
        self.procedures.push((path, procedure));
        Ok(())
    }
}

impl<C> Clone for MergedRouter<C> {
    fn clone(&self) -> Self {
        Self {
            procedures: self.procedures.clone(),
            index: self.index.clone(),
        }
    }
}

impl<C> fmt::Debug for MergedRouter<C> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("MergedRouter")
            .field("paths", &self.paths().collect::<Vec<_>>())
            .finish()
    }
}

/// Merges routers into one lookup table.
///
/// Routers are processed in order and each router's entries in registration
/// order, so [`MergedRouter::paths`] is deterministic.
///
/// ```
/// use courier_core::{Procedure, Router, merge_routers};
/// use serde_json::json;
///
/// let list: Procedure<()> = Procedure::query().resolve(|_ctx, _input| async { Ok(json!([])) });
/// let posts = Router::named("posts")
///     .and_then(|router| router.query("list", list))
///     .expect("posts router");
/// let merged = merge_routers([posts]).expect("merge");
/// assert!(merged.contains("posts.list"));
/// ```
///
/// # Errors
///
/// Returns [`MergeError::Collision`] naming the first path defined twice.
pub fn merge_routers<C, I>(routers: I) -> Result<MergedRouter<C>, MergeError>
where
    I: IntoIterator<Item = Router<C>>,
{
    let mut merged = MergedRouter {
        procedures: Vec::new(),
        index: HashMap::new(),
    };
    for router in routers {
        let (namespace, entries) = router.into_parts();
        flatten(&mut merged, namespace.as_deref(), entries)?;
    }
    debug!(
        target: MERGE_TARGET,
        procedures = merged.len(),
        "merged routers"
    );
    Ok(merged)
}

fn flatten<C>(
    merged: &mut MergedRouter<C>,
    prefix: Option<&str>,
    entries: Vec<(String, RouterEntry<C>)>,
) -> Result<(), MergeError> {
    for (name, entry) in entries {
        let path = match prefix {
            Some(prefix) => format!("{prefix}{PATH_SEPARATOR}{name}"),
            None => name,
        };
        match entry {
            RouterEntry::Procedure(procedure) => merged.insert(path, procedure)?,
            RouterEntry::Router(router) => {
                let (_, nested) = router.into_parts();
                flatten(merged, Some(&path), nested)?;
            }
        }
    }
    Ok(())
}
