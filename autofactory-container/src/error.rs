//! Error types for container and factory operations.
//!
//! Every error falls into one of three kinds (see [`ErrorKind`]):
//! registration errors are raised synchronously while registering,
//! type mismatches on the factory call that hits them, and resolution
//! errors are whatever the container hit while constructing the target.

use std::fmt;

use autofactory_support::rendering::render_chain;

use crate::key::DependencyKey;

/// Main error type for all autofactory operations.
#[derive(Debug, thiserror::Error)]
pub enum AutoFactoryError {
    /// Requested service was never registered.
    #[error("{}", .0)]
    NotRegistered(NotRegisteredError),

    /// A service was requested while it was already under construction.
    #[error("{}", .0)]
    CircularDependency(CircularDependencyError),

    /// A constructor or factory closure failed.
    #[error("Failed to construct {key}: {source}")]
    ConstructionFailed {
        key: DependencyKey,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Service was already registered (when override is disabled).
    #[error("{}", .0)]
    AlreadyRegistered(AlreadyRegisteredError),

    /// A target type does not satisfy the service it was registered for.
    #[error("{}", .0)]
    NotAssignable(NotAssignableError),

    /// The concrete type bound to a typed factory cannot satisfy the
    /// return type of the invoked method.
    #[error("{}", .0)]
    TypeMismatch(TypeMismatchError),

    /// A factory call reached the end of the interception chain unhandled.
    #[error("No interception behavior handled call to `{method}`")]
    NotIntercepted { method: &'static str },

    /// A factory outlived the container it resolves from.
    #[error("The container backing this factory has been dropped")]
    ContainerDropped,
}

/// Coarse classification of [`AutoFactoryError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Raised at registration time, never deferred to first use.
    Registration,
    /// Raised by a factory call whose bound type cannot satisfy its return type.
    TypeMismatch,
    /// Raised by the container while constructing the target.
    Resolution,
}

impl AutoFactoryError {
    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AutoFactoryError::AlreadyRegistered(_) | AutoFactoryError::NotAssignable(_) => {
                ErrorKind::Registration
            }
            AutoFactoryError::TypeMismatch(_) => ErrorKind::TypeMismatch,
            AutoFactoryError::NotRegistered(_)
            | AutoFactoryError::CircularDependency(_)
            | AutoFactoryError::ConstructionFailed { .. }
            | AutoFactoryError::NotIntercepted { .. }
            | AutoFactoryError::ContainerDropped => ErrorKind::Resolution,
        }
    }

    /// Shorthand for a [`TypeMismatchError`].
    pub fn type_mismatch(concrete: DependencyKey, expected: DependencyKey) -> Self {
        AutoFactoryError::TypeMismatch(TypeMismatchError { concrete, expected })
    }
}

/// Error when a service was not registered.
#[derive(Debug)]
pub struct NotRegisteredError {
    /// The service that was requested
    pub requested: DependencyKey,
    /// What was being constructed when the lookup failed
    pub required_by: Option<DependencyKey>,
    /// Registered type names that look similar
    pub suggestions: Vec<String>,
}

impl fmt::Display for NotRegisteredError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Service not registered: {}", self.requested)?;

        if let Some(parent) = self.required_by {
            write!(f, "\n  Required by: {parent}")?;
        }

        if !self.suggestions.is_empty() {
            write!(f, "\n  Did you mean one of:")?;
            for suggestion in &self.suggestions {
                write!(f, "\n    - {suggestion}")?;
            }
        }

        write!(
            f,
            "\n  Hint: register it with .register_type::<{}, _>() or pass it as a factory parameter",
            self.requested
        )
    }
}

/// Error when a resolve re-enters a service that is still being built.
#[derive(Debug)]
pub struct CircularDependencyError {
    /// Example: `[A, B, A]`
    pub chain: Vec<DependencyKey>,
}

impl fmt::Display for CircularDependencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.chain.iter().map(|k| k.type_name()).collect();
        write!(f, "Circular dependency detected:\n  {}", render_chain(&names))
    }
}

/// Error when a service is registered twice.
#[derive(Debug)]
pub struct AlreadyRegisteredError {
    pub key: DependencyKey,
}

impl fmt::Display for AlreadyRegisteredError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Service already registered: {}", self.key)?;
        write!(f, "\n  Hint: enable allow_override in ContainerSettings to replace it")
    }
}

/// Error when a target cannot stand in for the service it is mapped to.
#[derive(Debug)]
pub struct NotAssignableError {
    /// The service being registered
    pub source: DependencyKey,
    /// The type that was supposed to satisfy it
    pub target: DependencyKey,
}

impl fmt::Display for NotAssignableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cannot register {} for {}: no conversion from {} to {} is known",
            self.target, self.source, self.target, self.source,
        )?;
        write!(
            f,
            "\n  Hint: call .register_conversion::<{}, {}>() first",
            self.target, self.source,
        )
    }
}

/// Error when a typed factory's concrete type does not satisfy a method's
/// return type.
#[derive(Debug)]
pub struct TypeMismatchError {
    pub concrete: DependencyKey,
    pub expected: DependencyKey,
}

impl fmt::Display for TypeMismatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "The concrete type {} does not implement the factory return type {}",
            self.concrete.type_name(),
            self.expected.type_name(),
        )
    }
}

/// Convenient Result type for autofactory operations.
pub type Result<T> = std::result::Result<T, AutoFactoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    struct Widget;

    #[test]
    fn not_registered_error_display() {
        let err = AutoFactoryError::NotRegistered(NotRegisteredError {
            requested: DependencyKey::of::<String>(),
            required_by: Some(DependencyKey::of::<Widget>()),
            suggestions: vec!["core::option::Option<alloc::string::String>".into()],
        });

        let msg = err.to_string();
        assert!(msg.contains("not registered"));
        assert!(msg.contains("String"));
        assert!(msg.contains("Required by: Widget"));
        assert!(msg.contains("Did you mean"));
        assert_eq!(err.kind(), ErrorKind::Resolution);
    }

    #[test]
    fn circular_dependency_error_display() {
        let err = AutoFactoryError::CircularDependency(CircularDependencyError {
            chain: vec![
                DependencyKey::of::<String>(),
                DependencyKey::of::<i32>(),
                DependencyKey::of::<String>(),
            ],
        });

        let msg = err.to_string();
        assert!(msg.contains("Circular"));
        assert!(msg.contains("String → i32 → String"));
    }

    #[test]
    fn type_mismatch_names_both_types() {
        let err = AutoFactoryError::type_mismatch(
            DependencyKey::of::<Widget>(),
            DependencyKey::of::<String>(),
        );

        let msg = err.to_string();
        assert!(msg.contains("Widget"));
        assert!(msg.contains("alloc::string::String"));
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    }

    #[test]
    fn registration_errors_are_classified() {
        let err = AutoFactoryError::NotAssignable(NotAssignableError {
            source: DependencyKey::of::<String>(),
            target: DependencyKey::of::<Widget>(),
        });
        assert_eq!(err.kind(), ErrorKind::Registration);
        assert!(err.to_string().contains("register_conversion"));

        let err = AutoFactoryError::AlreadyRegistered(AlreadyRegisteredError {
            key: DependencyKey::of::<Widget>(),
        });
        assert_eq!(err.kind(), ErrorKind::Registration);
    }
}
