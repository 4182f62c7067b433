/// Errors from geometry construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GeomError {
    #[error("bounding box requires at least one point")]
    EmptyBounds,
}
