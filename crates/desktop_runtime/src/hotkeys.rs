//! Keyboard shortcut mapping for desktop switching and interaction cancellation.

use serde::{Deserialize, Serialize};

use crate::{model::CycleDirection, reducer::DesktopAction};

/// A key press with its modifier state, decoupled from any DOM event type.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyChord {
    pub key: String,
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

impl KeyChord {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    pub fn with_modifiers(mut self, modifiers: ModifierSet) -> Self {
        self.ctrl = modifiers.ctrl;
        self.alt = modifiers.alt;
        self.shift = modifiers.shift;
        self.meta = modifiers.meta;
        self
    }

    fn modifiers(&self) -> ModifierSet {
        ModifierSet {
            ctrl: self.ctrl,
            alt: self.alt,
            shift: self.shift,
            meta: self.meta,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModifierSet {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

impl ModifierSet {
    pub const fn ctrl_meta() -> Self {
        Self {
            ctrl: true,
            alt: false,
            shift: false,
            meta: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.ctrl || self.alt || self.shift || self.meta)
    }
}

/// Maps a key chord to the desktop action it triggers.
///
/// Nothing is consumed while a text-input element has focus. `Escape` without modifiers maps to
/// cancelling every in-progress drag or resize.
pub fn desktop_hotkey_action(
    chord: &KeyChord,
    text_input_focused: bool,
    switch_modifiers: ModifierSet,
) -> Option<DesktopAction> {
    if text_input_focused {
        return None;
    }

    if chord.key == "Escape" && chord.modifiers().is_empty() {
        return Some(DesktopAction::CancelAllInteractions);
    }

    if switch_modifiers.is_empty() || chord.modifiers() != switch_modifiers {
        return None;
    }

    match chord.key.as_str() {
        "ArrowRight" => Some(DesktopAction::CycleDesktop {
            direction: CycleDirection::Next,
        }),
        "ArrowLeft" => Some(DesktopAction::CycleDesktop {
            direction: CycleDirection::Previous,
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn ctrl_meta_arrows_cycle_desktops() {
        let right = KeyChord::new("ArrowRight").with_modifiers(ModifierSet::ctrl_meta());
        let left = KeyChord::new("ArrowLeft").with_modifiers(ModifierSet::ctrl_meta());

        assert_eq!(
            desktop_hotkey_action(&right, false, ModifierSet::ctrl_meta()),
            Some(DesktopAction::CycleDesktop {
                direction: CycleDirection::Next
            })
        );
        assert_eq!(
            desktop_hotkey_action(&left, false, ModifierSet::ctrl_meta()),
            Some(DesktopAction::CycleDesktop {
                direction: CycleDirection::Previous
            })
        );
    }

    #[test]
    fn text_input_focus_suppresses_all_hotkeys() {
        let right = KeyChord::new("ArrowRight").with_modifiers(ModifierSet::ctrl_meta());
        assert_eq!(desktop_hotkey_action(&right, true, ModifierSet::ctrl_meta()), None);
        assert_eq!(
            desktop_hotkey_action(&KeyChord::new("Escape"), true, ModifierSet::ctrl_meta()),
            None
        );
    }

    #[test]
    fn modifier_sets_must_match_exactly() {
        let mut chord = KeyChord::new("ArrowRight").with_modifiers(ModifierSet::ctrl_meta());
        chord.shift = true;
        assert_eq!(desktop_hotkey_action(&chord, false, ModifierSet::ctrl_meta()), None);
        assert_eq!(
            desktop_hotkey_action(&KeyChord::new("ArrowRight"), false, ModifierSet::ctrl_meta()),
            None
        );
    }

    #[test]
    fn bare_escape_cancels_interactions() {
        assert_eq!(
            desktop_hotkey_action(&KeyChord::new("Escape"), false, ModifierSet::ctrl_meta()),
            Some(DesktopAction::CancelAllInteractions)
        );
    }
}
