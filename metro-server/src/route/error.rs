//! Route normalization errors.

/// A route payload that cannot be turned into an itinerary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    /// The backend returned no steps
    #[error("route has no steps")]
    EmptyPath,

    /// The path holds transfer markers but no ride
    #[error("route has no ride segments")]
    NoRides,

    /// The first ride names no line and there is nothing to inherit from
    #[error("ride at step {index} has no line")]
    MissingRideLine { index: usize },

    /// A transfer whose lines cannot be inferred from neighbouring rides
    #[error("transfer at step {index} has no {side} line")]
    UnresolvedTransfer { index: usize, side: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(
            RouteError::UnresolvedTransfer {
                index: 2,
                side: "destination"
            }
            .to_string(),
            "transfer at step 2 has no destination line"
        );
        assert_eq!(
            RouteError::MissingRideLine { index: 0 }.to_string(),
            "ride at step 0 has no line"
        );
    }
}
