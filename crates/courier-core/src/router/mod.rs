//! Ordered collections of procedures and nested routers.
//!
//! A [`Router`] is built by successive registration calls. Every call checks
//! the name against the router's existing entries, so a reused name fails
//! while the router is being built rather than when it is called. Routers are
//! combined into a single dispatch table by [`merge_routers`](crate::merge_routers).

use std::fmt;

use thiserror::Error;

use crate::procedure::{Procedure, ProcedureKind};

/// Separator joining router and procedure names into qualified paths.
pub const PATH_SEPARATOR: char = '.';

/// Errors raised while registering router entries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouterError {
    /// The name is already used by another entry of the same router.
    #[error("'{name}' is already registered on this router")]
    DuplicateName {
        /// The reused name.
        name: String,
    },

    /// The name cannot be used as a path segment.
    #[error("invalid name '{name}': {reason}")]
    InvalidName {
        /// The rejected name.
        name: String,
        /// Why the name was rejected.
        reason: &'static str,
    },

    /// A procedure was registered through the wrong registration method.
    #[error("'{name}' was declared as a {declared} but registered as a {registered}")]
    KindMismatch {
        /// Name of the entry.
        name: String,
        /// Kind the procedure was declared with.
        declared: ProcedureKind,
        /// Kind implied by the registration method.
        registered: ProcedureKind,
    },
}

impl RouterError {
    /// Creates a duplicate name error.
    #[must_use]
    pub fn duplicate_name(name: impl Into<String>) -> Self {
        Self::DuplicateName { name: name.into() }
    }

    /// Creates an invalid name error.
    #[must_use]
    pub fn invalid_name(name: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidName {
            name: name.into(),
            reason,
        }
    }
}

/// Checks that a name is usable as a single path segment.
///
/// # Errors
///
/// Returns [`RouterError::InvalidName`] for empty names and names containing
/// whitespace or the path separator.
pub fn validate_name(name: &str) -> Result<(), RouterError> {
    if name.is_empty() {
        return Err(RouterError::invalid_name(name, "name is empty"));
    }
    if name.contains(PATH_SEPARATOR) {
        return Err(RouterError::invalid_name(
            name,
            "name contains the path separator",
        ));
    }
    if name.chars().any(char::is_whitespace) {
        return Err(RouterError::invalid_name(name, "name contains whitespace"));
    }
    Ok(())
}

/// A registered router entry.
pub enum RouterEntry<C> {
    /// A procedure.
    Procedure(Procedure<C>),
    /// A nested router whose entries are qualified by the entry name.
    Router(Router<C>),
}

impl<C> fmt::Debug for RouterEntry<C> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Procedure(procedure) => {
                formatter.debug_tuple("Procedure").field(procedure).finish()
            }
            Self::Router(router) => formatter.debug_tuple("Router").field(router).finish(),
        }
    }
}

/// Ordered mapping from names to procedures and nested routers.
///
/// ```
/// use courier_core::{Procedure, Router, RouterError, Schema};
/// use serde_json::json;
///
/// # fn main() -> Result<(), RouterError> {
/// let posts: Router<()> = Router::named("posts")?
///     .query("list", Procedure::query().resolve(|_ctx, _input| async { Ok(json!([])) }))?
///     .mutation(
///         "create",
///         Procedure::mutation()
///             .input(Schema::object().field("title", Schema::String))
///             .resolve(|_ctx, input| async move { Ok(input) }),
///     )?;
/// assert_eq!(posts.procedure_count(), 2);
/// # Ok(())
/// # }
/// ```
pub struct Router<C> {
    namespace: Option<String>,
    entries: Vec<(String, RouterEntry<C>)>,
}

impl<C> Router<C> {
    /// Creates an anonymous router whose entries merge at the root.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            namespace: None,
            entries: Vec::new(),
        }
    }

    /// Creates a router whose entries merge under `namespace`.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::InvalidName`] if the namespace is not a valid
    /// path segment.
    pub fn named(namespace: impl Into<String>) -> Result<Self, RouterError> {
        let namespace = namespace.into();
        validate_name(&namespace)?;
        Ok(Self {
            namespace: Some(namespace),
            entries: Vec::new(),
        })
    }

    /// Returns the namespace, if any.
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Registers a query.
    ///
    /// # Errors
    ///
    /// Fails if the name is invalid or already used, or if the procedure was
    /// declared as a mutation.
    pub fn query(
        self,
        name: impl Into<String>,
        procedure: Procedure<C>,
    ) -> Result<Self, RouterError> {
        self.register_kind(name.into(), procedure, ProcedureKind::Query)
    }

    /// Registers a mutation.
    ///
    /// # Errors
    ///
    /// Fails if the name is invalid or already used, or if the procedure was
    /// declared as a query.
    pub fn mutation(
        self,
        name: impl Into<String>,
        procedure: Procedure<C>,
    ) -> Result<Self, RouterError> {
        self.register_kind(name.into(), procedure, ProcedureKind::Mutation)
    }

    /// Registers a procedure of either kind.
    ///
    /// # Errors
    ///
    /// Fails if the name is invalid or already used.
    pub fn procedure(
        self,
        name: impl Into<String>,
        procedure: Procedure<C>,
    ) -> Result<Self, RouterError> {
        self.insert(name.into(), RouterEntry::Procedure(procedure))
    }

    /// Nests a router under `name`.
    ///
    /// The nested router's own namespace is ignored; its entries are
    /// qualified by `name`.
    ///
    /// # Errors
    ///
    /// Fails if the name is invalid or already used.
    pub fn nest(self, name: impl Into<String>, router: Self) -> Result<Self, RouterError> {
        self.insert(name.into(), RouterEntry::Router(router))
    }

    /// Iterates entries in registration order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &RouterEntry<C>)> {
        self.entries
            .iter()
            .map(|(name, entry)| (name.as_str(), entry))
    }

    /// Returns the number of direct entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the router has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Counts procedures, including those of nested routers.
    #[must_use]
    pub fn procedure_count(&self) -> usize {
        self.entries
            .iter()
            .map(|(_, entry)| match entry {
                RouterEntry::Procedure(_) => 1,
                RouterEntry::Router(router) => router.procedure_count(),
            })
            .sum()
    }

    pub(crate) fn into_parts(self) -> (Option<String>, Vec<(String, RouterEntry<C>)>) {
        (self.namespace, self.entries)
    }

    fn register_kind(
        self,
        name: String,
        procedure: Procedure<C>,
        registered: ProcedureKind,
    ) -> Result<Self, RouterError> {
        if procedure.kind() != registered {
            return Err(RouterError::KindMismatch {
                name,
                declared: procedure.kind(),
                registered,
            });
        }
        self.insert(name, RouterEntry::Procedure(procedure))
    }

    fn insert(mut self, name: String, entry: RouterEntry<C>) -> Result<Self, RouterError> {
        validate_name(&name)?;
        if self.entries.iter().any(|(existing, _)| *existing == name) {
            return Err(RouterError::duplicate_name(name));
        }
        self.entries.push((name, entry));
        Ok(self)
    }
}

impl<C> Default for Router<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for Router<C> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Router")
            .field("namespace", &self.namespace)
            .field("entries", &self.entries)
            .finish()
    }
}
