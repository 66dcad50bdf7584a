//! Entity traits: identity + workspace ownership.

use crate::id::WorkspaceId;

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;
}

/// An entity that carries its workspace foreign key directly.
///
/// Child records (ledger rows, order items) are owned transitively through
/// their parent and do not implement this.
pub trait WorkspaceScoped: Entity {
    fn workspace_id(&self) -> WorkspaceId;

    /// True if the entity belongs to `workspace_id`.
    fn is_owned_by(&self, workspace_id: WorkspaceId) -> bool {
        self.workspace_id() == workspace_id
    }
}
