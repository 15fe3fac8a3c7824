//! Transition lifecycle vocabulary

/// Lifecycle state of a transitioned child.
///
/// `Unmounted` and `Exited` are both "not visible", but `Unmounted` means the
/// child has never been rendered, while `Exited` means it finished an exit
/// and may re-enter without an initial mount.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransitionState {
    /// Never rendered
    Unmounted,
    /// Fully exited, still eligible to re-enter
    Exited,
    /// Enter phase in progress
    Entering,
    /// Fully entered and visible
    Entered,
    /// Exit phase in progress
    Exiting,
}

impl TransitionState {
    /// Whether the child should currently be rendered by the host.
    pub fn is_visible(self) -> bool {
        matches!(self, Self::Entering | Self::Entered | Self::Exiting)
    }

    /// Whether a phase is in progress (a completion is pending).
    pub fn is_transitioning(self) -> bool {
        matches!(self, Self::Entering | Self::Exiting)
    }

    /// Whether the child has fully left the visible lifecycle.
    pub fn is_exited(self) -> bool {
        matches!(self, Self::Unmounted | Self::Exited)
    }
}

/// Most recently requested transition direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Enter,
    Exit,
}
