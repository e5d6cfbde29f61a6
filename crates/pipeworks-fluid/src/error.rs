use pipeworks_core::id::PointId;

/// Errors raised by points and the fluid manager.
///
/// Capacity overflow, over-withdrawal and lost flow are expected steady-state
/// conditions and never surface here.
#[derive(Debug, thiserror::Error)]
pub enum FluidError {
    /// A point with this id is already registered.
    #[error("duplicate connection point {0}")]
    DuplicateRegistration(PointId),

    /// The point is not registered with this manager.
    #[error("unknown connection point {0}")]
    UnknownPoint(PointId),

    /// The operation is not valid in the current state of the point or manager.
    #[error("illegal state: {0}")]
    IllegalState(&'static str),

    /// A structural change was attempted while a tick is in progress.
    #[error("points cannot be added or removed while a fluid tick is in progress")]
    ConcurrentModification,
}
