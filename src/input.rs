//! Input event payloads delivered by the host's windowing layer
//!
//! The crate never talks to a window system; the host forwards pointer
//! positions and key presses through [`crate::WarpSet`]'s routing methods
//! using these types.

/// Keyboard modifier flags active during an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
    };

    pub const SHIFT: Modifiers = Modifiers {
        shift: true,
        ctrl: false,
        alt: false,
    };
}

/// Keys the warp editor reacts to. Hosts map their native key codes onto
/// this set and may ignore everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    Tab,
    Escape,
    Minus,
    Plus,
    /// Toggles edit mode for the whole warp set.
    W,
    /// Toggles linear/curved interpolation on mesh warps.
    M,
    /// Resets the warp that owns the current selection.
    R,
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
}
