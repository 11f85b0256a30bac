//! Toolkit-neutral pointer and keyboard events

use glam::Vec2;

/// Modifier keys held during an event
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

    pub fn shift() -> Self {
        Self {
            shift: true,
            ..Self::NONE
        }
    }

    pub fn ctrl() -> Self {
        Self {
            ctrl: true,
            ..Self::NONE
        }
    }

    /// Adds to the selection instead of replacing it
    pub fn is_add(&self) -> bool {
        self.shift || self.ctrl
    }

    /// Locks a drag to its dominant axis
    pub fn is_axis_lock(&self) -> bool {
        self.shift
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Pointer event in window pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down {
        position: Vec2,
        button: MouseButton,
        modifiers: Modifiers,
    },
    Move {
        position: Vec2,
        modifiers: Modifiers,
    },
    Up {
        position: Vec2,
        button: MouseButton,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    A,
    Z,
    Y,
    Delete,
    Backspace,
    Escape,
    Space,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn new(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    pub fn plain(key: Key) -> Self {
        Self::new(key, Modifiers::NONE)
    }
}

/// Editor command bound to a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    SelectAll,
    Undo,
    Redo,
    DeleteSelection,
    CancelDrag,
    ClearSelection,
}

impl KeyEvent {
    pub fn command(&self) -> Option<KeyCommand> {
        match (self.key, self.modifiers.ctrl) {
            (Key::A, true) => Some(KeyCommand::SelectAll),
            (Key::Z, true) => Some(KeyCommand::Undo),
            (Key::Y, true) => Some(KeyCommand::Redo),
            (Key::Delete | Key::Backspace, _) => Some(KeyCommand::DeleteSelection),
            (Key::Escape, _) => Some(KeyCommand::CancelDrag),
            (Key::Space, _) => Some(KeyCommand::ClearSelection),
            _ => None,
        }
    }
}
