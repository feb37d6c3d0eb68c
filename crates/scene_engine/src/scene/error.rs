//! Scene error types

use crate::render::RenderError;

/// Errors raised by scene graph, component and lifecycle operations
#[derive(thiserror::Error, Debug)]
pub enum SceneError {
    /// The node was disposed (or never belonged to this arena)
    #[error("Node has already been disposed")]
    NodeDisposed,

    /// The component was disposed
    #[error("Component has already been disposed")]
    ComponentDisposed,

    /// A node id from a different scene was passed in
    #[error("Node belongs to a different scene")]
    ForeignNode,

    /// A component id from a different scene was passed in
    #[error("Component belongs to a different scene")]
    ForeignComponent,

    /// The component exists but is not of the requested kind
    #[error("Expected a {expected} component, found {found}")]
    WrongComponentKind {
        /// Kind the caller asked for
        expected: &'static str,
        /// Kind that is actually stored
        found: &'static str,
    },

    /// Reparenting would make a node its own ancestor
    #[error("Reparenting would create a cycle in the hierarchy")]
    HierarchyCycle,

    /// A world matrix could not be inverted
    #[error("Transform is not invertible")]
    SingularTransform,

    /// An argument violated a documented precondition
    #[error("Precondition violated: {0}")]
    Precondition(String),

    /// Data named a topology, index format or queue the engine does not know
    #[error("Unsupported {what}: {value}")]
    Unsupported {
        /// Category of the rejected value
        what: &'static str,
        /// The rejected value
        value: String,
    },

    /// A behaviour hook reported a failure
    #[error("Behaviour failed: {0}")]
    Behaviour(String),

    /// Render-side failure surfaced through a scene call
    #[error(transparent)]
    Render(#[from] RenderError),
}
