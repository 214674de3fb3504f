#![forbid(unsafe_code)]

//! Errors for property mutation and binding setup.

use thiserror::Error;

/// Errors from [`Property`](crate::Property) operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PropertyError {
    /// `set()` was called on a property that tracks a bound source.
    #[error("a bound value cannot be set: {name}")]
    Bound {
        /// Label of the property.
        name: String,
    },
    /// `bind()` was asked to bind a property to itself.
    #[error("cannot bind property to itself: {name}")]
    SelfBinding {
        /// Label of the property.
        name: String,
    },
}

/// Errors from [`BidirectionalBinding`](crate::BidirectionalBinding) setup and teardown.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingError {
    /// One or both endpoints were missing.
    #[error("Both properties must be specified")]
    MissingEndpoint,
    /// Both endpoints are the same property.
    #[error("Cannot bind property to itself")]
    SelfBinding,
    /// The initial value could not be converted for the first property.
    #[error("initial conversion failed: {0}")]
    Conversion(String),
    /// The initial synchronization was rejected by the first property.
    #[error(transparent)]
    Property(#[from] PropertyError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binding_messages() {
        assert_eq!(
            BindingError::MissingEndpoint.to_string(),
            "Both properties must be specified"
        );
        assert_eq!(
            BindingError::SelfBinding.to_string(),
            "Cannot bind property to itself"
        );
    }

    #[test]
    fn property_error_is_transparent() {
        let err = BindingError::from(PropertyError::Bound {
            name: "opacity".into(),
        });
        assert_eq!(err.to_string(), "a bound value cannot be set: opacity");
    }
}
