use crate::error::AccessError;

/// State of an independently fetched input.
///
/// Reconciliation only runs on `Ready` inputs. `Loading` and `Failed` are
/// ordinary states that the caller renders, not errors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Snapshot<T> {
    Loading,
    Failed(String),
    Ready(T),
}

impl<T> Snapshot<T> {
    pub fn from_result<E: std::fmt::Display>(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Snapshot::Ready(value),
            Err(e) => Snapshot::Failed(e.to_string()),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Snapshot::Ready(_))
    }

    pub fn as_ref(&self) -> Snapshot<&T> {
        match self {
            Snapshot::Loading => Snapshot::Loading,
            Snapshot::Failed(reason) => Snapshot::Failed(reason.clone()),
            Snapshot::Ready(value) => Snapshot::Ready(value),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Snapshot<U> {
        match self {
            Snapshot::Loading => Snapshot::Loading,
            Snapshot::Failed(reason) => Snapshot::Failed(reason),
            Snapshot::Ready(value) => Snapshot::Ready(f(value)),
        }
    }

    /// Combine two snapshots. Any failure wins, then loading, then ready.
    pub fn zip<U>(self, other: Snapshot<U>) -> Snapshot<(T, U)> {
        match (self, other) {
            (Snapshot::Failed(reason), _) | (_, Snapshot::Failed(reason)) => {
                Snapshot::Failed(reason)
            }
            (Snapshot::Ready(a), Snapshot::Ready(b)) => Snapshot::Ready((a, b)),
            _ => Snapshot::Loading,
        }
    }

    pub fn ready(self) -> Option<T> {
        match self {
            Snapshot::Ready(value) => Some(value),
            _ => None,
        }
    }

    /// For callers that cannot render a pending state.
    pub fn into_result(self) -> Result<T, AccessError> {
        match self {
            Snapshot::Ready(value) => Ok(value),
            Snapshot::Loading => Err(AccessError::SnapshotUnavailable("still loading".to_string())),
            Snapshot::Failed(reason) => Err(AccessError::SnapshotUnavailable(reason)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zip_ready() {
        let zipped = Snapshot::Ready(1).zip(Snapshot::Ready("a"));
        assert_eq!(zipped, Snapshot::Ready((1, "a")));
    }

    #[test]
    fn test_zip_failure_wins_over_loading() {
        let zipped = Snapshot::<u8>::Loading.zip(Snapshot::<u8>::Failed("boom".to_string()));
        assert_eq!(zipped, Snapshot::Failed("boom".to_string()));

        let zipped = Snapshot::<u8>::Failed("first".to_string()).zip(Snapshot::<u8>::Loading);
        assert_eq!(zipped, Snapshot::Failed("first".to_string()));
    }

    #[test]
    fn test_zip_loading() {
        assert_eq!(
            Snapshot::Ready(1).zip(Snapshot::<u8>::Loading),
            Snapshot::Loading
        );
    }

    #[test]
    fn test_from_result() {
        let ok: Result<u8, String> = Ok(3);
        assert_eq!(Snapshot::from_result(ok), Snapshot::Ready(3));
        let err: Result<u8, String> = Err("offline".to_string());
        assert_eq!(Snapshot::from_result(err), Snapshot::Failed("offline".to_string()));
    }

    #[test]
    fn test_into_result() {
        assert_eq!(Snapshot::Ready(5).into_result().unwrap(), 5);
        let err = Snapshot::<u8>::Loading.into_result().unwrap_err();
        assert!(matches!(err, AccessError::SnapshotUnavailable(_)));
    }

    #[test]
    fn test_map_preserves_state() {
        assert_eq!(Snapshot::Ready(2).map(|v| v * 2), Snapshot::Ready(4));
        assert_eq!(Snapshot::<u8>::Loading.map(|v| v * 2), Snapshot::Loading);
        assert!(!Snapshot::<u8>::Failed("x".to_string()).map(|v| v).is_ready());
    }
}
