//! Multi-warp coordination: ordering, hit-testing and event routing

use glam::Vec2;

use crate::input::{Key, Modifiers};
use crate::warp::Warp;

/// An ordered collection of warps.
///
/// Order defines draw order and hit-test priority: the last warp is
/// topmost and sees pointer presses first. Edit mode is engine-level state
/// owned by the set; when disabled every warp still renders but all point
/// selection and mutation input is ignored, except the toggle key itself.
#[derive(Debug, Default)]
pub struct WarpSet {
    warps: Vec<Warp>,
    edit_mode: bool,
    /// Last pointer position, used to re-run selection after key presses.
    pointer: Vec2,
}

impl WarpSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_warps(warps: Vec<Warp>) -> Self {
        Self {
            warps,
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.warps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.warps.is_empty()
    }

    pub fn push(&mut self, warp: impl Into<Warp>) {
        self.warps.push(warp.into());
    }

    pub fn remove(&mut self, index: usize) -> Option<Warp> {
        if index < self.warps.len() {
            Some(self.warps.remove(index))
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.warps.clear();
    }

    pub fn get(&self, index: usize) -> Option<&Warp> {
        self.warps.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Warp> {
        self.warps.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Warp> {
        self.warps.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Warp> {
        self.warps.iter_mut()
    }

    pub fn warps(&self) -> &[Warp] {
        &self.warps
    }

    pub fn is_edit_mode(&self) -> bool {
        self.edit_mode
    }

    pub fn set_edit_mode(&mut self, enabled: bool) {
        self.edit_mode = enabled;
    }

    pub fn toggle_edit_mode(&mut self) {
        self.edit_mode = !self.edit_mode;
    }

    /// Select the control point closest to `pos` across all warps and
    /// deselect every other warp. Warps are scanned topmost-first; ties
    /// keep the first warp encountered in that order.
    pub fn select_closest(&mut self, pos: Vec2) {
        let mut best: Option<(usize, usize, f32)> = None;
        for i in (0..self.warps.len()).rev() {
            if let Some((index, distance)) = self.warps[i].find_nearest(pos) {
                if best.map(|(_, _, d)| distance < d).unwrap_or(true) {
                    best = Some((i, index, distance));
                }
            }
        }

        for (i, warp) in self.warps.iter_mut().enumerate() {
            match best {
                Some((warp_index, point_index, _)) if warp_index == i => {
                    warp.select_control_point(point_index);
                }
                _ => warp.deselect_control_point(),
            }
        }
    }

    /// Pointer motion: tracks the position and keeps the global selection
    /// following the cursor. Broadcast to all warps; never consumed.
    pub fn route_pointer_move(&mut self, pos: Vec2, _modifiers: Modifiers) -> bool {
        self.pointer = pos;
        if self.edit_mode {
            self.select_closest(pos);
        }
        false
    }

    /// Pointer press: selects the closest point, then offers the press to
    /// warps topmost-first; the first warp that consumes it stops
    /// propagation.
    pub fn route_pointer_down(&mut self, pos: Vec2, _modifiers: Modifiers) -> bool {
        self.pointer = pos;
        if !self.edit_mode {
            return false;
        }
        self.select_closest(pos);

        for warp in self.warps.iter_mut().rev() {
            if warp.pointer_down(pos, true) {
                return true;
            }
        }
        false
    }

    /// Pointer drag: offered topmost-first, first consumer wins.
    pub fn route_pointer_drag(&mut self, pos: Vec2, _modifiers: Modifiers) -> bool {
        self.pointer = pos;
        if !self.edit_mode {
            return false;
        }
        for warp in self.warps.iter_mut().rev() {
            if warp.pointer_drag(pos, true) {
                return true;
            }
        }
        false
    }

    /// Pointer release: broadcast, never consumed.
    pub fn route_pointer_up(&mut self, pos: Vec2, _modifiers: Modifiers) -> bool {
        self.pointer = pos;
        false
    }

    /// Key press routing. `W` toggles edit mode; `Escape` leaves it. Other
    /// keys are offered to warps topmost-first while edit mode is active,
    /// and afterwards the global selection is refreshed at the last pointer
    /// position. Cursor keys skip the refresh so they cannot steal the
    /// selection they are nudging.
    pub fn route_key_down(&mut self, key: Key, modifiers: Modifiers) -> bool {
        if key == Key::W {
            self.toggle_edit_mode();
            log::debug!(
                "edit mode {}",
                if self.edit_mode { "enabled" } else { "disabled" }
            );
            return true;
        }
        if !self.edit_mode {
            return false;
        }
        if key == Key::Escape {
            self.edit_mode = false;
            return true;
        }

        let mut handled = false;
        for warp in self.warps.iter_mut().rev() {
            if warp.key_down(key, modifiers, true) {
                handled = true;
                break;
            }
        }

        match key {
            Key::Up | Key::Down | Key::Left | Key::Right => {}
            _ => self.select_closest(self.pointer),
        }

        handled
    }

    pub fn route_key_up(&mut self, _key: Key, _modifiers: Modifiers) -> bool {
        false
    }

    /// Window resize: broadcast unconditionally, every warp tracks the view
    /// size independently.
    pub fn route_resize(&mut self, view_size: Vec2) {
        for warp in self.warps.iter_mut() {
            warp.resize(view_size);
        }
    }
}

impl IntoIterator for WarpSet {
    type Item = Warp;
    type IntoIter = std::vec::IntoIter<Warp>;

    fn into_iter(self) -> Self::IntoIter {
        self.warps.into_iter()
    }
}
