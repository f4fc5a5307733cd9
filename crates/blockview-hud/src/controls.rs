//! Arena-allocated HUD control tree.
//!
//! Controls live in a slot vector and refer to each other by [`ControlId`].
//! Parent and child links are plain indices; attaching, detaching and removing
//! are explicit tree operations. Positions are stored relative to the parent's
//! top-left corner as a center point plus a size.

use crate::error::HudError;
use crate::font::{draw_text, draw_text_centered, text_height};
use crate::raster::{Canvas, Color, DARK_GRAY, TRANSPARENT, WHITE_SMOKE, shade};

pub const MIN_CONTROL_SIZE: f32 = 10.0;
const DEFAULT_WIDTH: f32 = 100.0;
const DEFAULT_HEIGHT: f32 = 50.0;
const TEXT_SCALE: i32 = 2;
const CHECK_BOX: i32 = 32;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ControlId(usize);

/// Axis-aligned rectangle in bitmap pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && y >= self.y && x < self.x + self.width && y < self.y + self.height
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ControlKind {
    /// Framed panel with an optional title; children are laid out inside its padding.
    Window { title: Option<String>, padding: f32 },
    Label { text: String },
    Button { text: String, enabled: bool },
    Checkbox { text: String, checked: bool, enabled: bool },
}

impl ControlKind {
    fn clickable(&self) -> bool {
        matches!(self, Self::Button { .. } | Self::Checkbox { .. })
    }

    fn enabled(&self) -> bool {
        match self {
            Self::Button { enabled, .. } | Self::Checkbox { enabled, .. } => *enabled,
            _ => true,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Control {
    pub kind: ControlKind,
    pub foreground: Color,
    pub background: Color,
    center_x: f32,
    center_y: f32,
    width: f32,
    height: f32,
    parent: Option<ControlId>,
    children: Vec<ControlId>,
    pressed: bool,
}

impl Control {
    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn center(&self) -> (f32, f32) {
        (self.center_x, self.center_y)
    }

    pub fn parent(&self) -> Option<ControlId> {
        self.parent
    }

    pub fn children(&self) -> &[ControlId] {
        &self.children
    }
}

/// Mouse position in bitmap pixels and whether the primary button is down.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Pointer {
    pub x: f32,
    pub y: f32,
    pub pressed: bool,
}

/// What a pointer update did.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PointerOutcome {
    /// The pointer is over an enabled clickable control.
    pub hovering: bool,
    /// Controls whose click completed (button released inside them), in tree order.
    pub clicked: Vec<ControlId>,
}

#[derive(Default)]
pub struct ControlTree {
    slots: Vec<Option<Control>>,
    free: Vec<usize>,
    roots: Vec<ControlId>,
}

impl ControlTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn roots(&self) -> &[ControlId] {
        &self.roots
    }

    pub fn get(&self, id: ControlId) -> Option<&Control> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: ControlId) -> Option<&mut Control> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    fn node(&self, id: ControlId) -> Result<&Control, HudError> {
        self.get(id).ok_or(HudError::UnknownControl(id))
    }

    fn node_mut(&mut self, id: ControlId) -> Result<&mut Control, HudError> {
        self.get_mut(id).ok_or(HudError::UnknownControl(id))
    }

    /// Create a control with default size and colors under `parent` (or as a root).
    pub fn add(&mut self, parent: Option<ControlId>, kind: ControlKind) -> Result<ControlId, HudError> {
        if let Some(p) = parent {
            self.node(p)?;
        }
        let background = match kind {
            ControlKind::Label { .. } => TRANSPARENT,
            _ => DARK_GRAY,
        };
        let control = Control {
            kind,
            foreground: WHITE_SMOKE,
            background,
            center_x: DEFAULT_WIDTH / 2.0,
            center_y: DEFAULT_HEIGHT / 2.0,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            parent: None,
            children: Vec::new(),
            pressed: false,
        };
        let id = match self.free.pop() {
            Some(index) => {
                self.slots[index] = Some(control);
                ControlId(index)
            }
            None => {
                self.slots.push(Some(control));
                ControlId(self.slots.len() - 1)
            }
        };
        self.roots.push(id);
        if parent.is_some() {
            self.set_parent(id, parent)?;
        }
        Ok(id)
    }

    /// Move `id` under `parent`, or make it a root when `parent` is `None`.
    pub fn set_parent(&mut self, id: ControlId, parent: Option<ControlId>) -> Result<(), HudError> {
        self.node(id)?;
        if let Some(p) = parent {
            self.node(p)?;
            let mut cursor = Some(p);
            while let Some(c) = cursor {
                if c == id {
                    return Err(HudError::Cycle { child: id, parent: p });
                }
                cursor = self.node(c)?.parent;
            }
        }

        let old_parent = self.node(id)?.parent;
        match old_parent {
            Some(old) => self.node_mut(old)?.children.retain(|c| *c != id),
            None => self.roots.retain(|c| *c != id),
        }
        match parent {
            Some(p) => self.node_mut(p)?.children.push(id),
            None => self.roots.push(id),
        }
        self.node_mut(id)?.parent = parent;

        // Re-apply size and position limits against the new parent.
        let (w, h) = {
            let c = self.node(id)?;
            (c.width, c.height)
        };
        self.set_size(id, w, h)?;
        Ok(())
    }

    /// Remove `id` and its whole subtree. Returns the number of controls removed.
    pub fn remove(&mut self, id: ControlId) -> Result<usize, HudError> {
        let parent = self.node(id)?.parent;
        match parent {
            Some(p) => self.node_mut(p)?.children.retain(|c| *c != id),
            None => self.roots.retain(|c| *c != id),
        }
        let mut removed = 0;
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(control) = self.slots.get_mut(next.0).and_then(Option::take) {
                stack.extend(control.children);
                self.free.push(next.0);
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn parent_size(&self, id: ControlId) -> Option<(f32, f32)> {
        let parent = self.get(id)?.parent?;
        self.get(parent).map(|p| (p.width, p.height))
    }

    /// Size is at least [`MIN_CONTROL_SIZE`] and at most the parent's size.
    pub fn set_size(&mut self, id: ControlId, width: f32, height: f32) -> Result<(), HudError> {
        let (max_w, max_h) = self.parent_size(id).unwrap_or((f32::MAX, f32::MAX));
        let control = self.node_mut(id)?;
        control.width = width.max(MIN_CONTROL_SIZE).min(max_w.max(MIN_CONTROL_SIZE));
        control.height = height.max(MIN_CONTROL_SIZE).min(max_h.max(MIN_CONTROL_SIZE));
        let (cx, cy) = (control.center_x, control.center_y);
        self.set_center(id, cx, cy)
    }

    /// Center relative to the parent, clamped so the control stays inside it.
    pub fn set_center(&mut self, id: ControlId, x: f32, y: f32) -> Result<(), HudError> {
        let (max_w, max_h) = self.parent_size(id).unwrap_or((f32::MAX, f32::MAX));
        let control = self.node_mut(id)?;
        let (hw, hh) = (control.width / 2.0, control.height / 2.0);
        control.center_x = x.min(max_w - hw).max(hw);
        control.center_y = y.min(max_h - hh).max(hh);
        Ok(())
    }

    /// Attach `child` to `window` at vertical center `center_y`, spanning the
    /// window's width minus its padding.
    pub fn add_fill(&mut self, window: ControlId, child: ControlId, center_y: f32) -> Result<(), HudError> {
        let (width, padding) = {
            let w = self.node(window)?;
            let padding = match w.kind {
                ControlKind::Window { padding, .. } => padding,
                _ => 0.0,
            };
            (w.width, padding)
        };
        self.set_parent(child, Some(window))?;
        let height = self.node(child)?.height;
        self.set_size(child, width - 2.0 * padding, height)?;
        self.set_center(child, width / 2.0, center_y)
    }

    /// Bounds in bitmap pixels.
    pub fn absolute_rect(&self, id: ControlId) -> Result<Rect, HudError> {
        let control = self.node(id)?;
        let (mut x, mut y) = (
            control.center_x - control.width / 2.0,
            control.center_y - control.height / 2.0,
        );
        let mut cursor = control.parent;
        while let Some(p) = cursor {
            let parent = self.node(p)?;
            x += parent.center_x - parent.width / 2.0;
            y += parent.center_y - parent.height / 2.0;
            cursor = parent.parent;
        }
        Ok(Rect {
            x,
            y,
            width: control.width,
            height: control.height,
        })
    }

    /// Depth-first order starting from the roots.
    fn walk(&self) -> Vec<ControlId> {
        let mut order = Vec::with_capacity(self.len());
        let mut stack: Vec<ControlId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if let Some(control) = self.get(id) {
                order.push(id);
                stack.extend(control.children.iter().rev().copied());
            }
        }
        order
    }

    /// Track press state and report completed clicks. A checkbox flips its state
    /// on click; disabled controls never click.
    pub fn handle_pointer(&mut self, pointer: Pointer) -> PointerOutcome {
        let mut outcome = PointerOutcome::default();
        for id in self.walk() {
            let Ok(rect) = self.absolute_rect(id) else {
                continue;
            };
            let Some(control) = self.get_mut(id) else {
                continue;
            };
            let inside = rect.contains(pointer.x, pointer.y);
            let pressed = inside && pointer.pressed;
            let clicked = control.pressed && !pressed && inside;
            control.pressed = pressed;

            if !control.kind.clickable() || !control.kind.enabled() {
                continue;
            }
            outcome.hovering |= inside;
            if clicked {
                if let ControlKind::Checkbox { checked, .. } = &mut control.kind {
                    *checked = !*checked;
                }
                outcome.clicked.push(id);
            }
        }
        outcome
    }

    /// Draw every control, parents before children.
    pub fn draw(&self, canvas: &mut Canvas, pointer: Pointer) {
        for id in self.walk() {
            let (Some(control), Ok(rect)) = (self.get(id), self.absolute_rect(id)) else {
                continue;
            };
            draw_control(canvas, control, rect, pointer);
        }
    }
}

fn draw_control(canvas: &mut Canvas, control: &Control, rect: Rect, pointer: Pointer) {
    let (x, y, w, h) = (
        rect.x as i32,
        rect.y as i32,
        rect.width as i32,
        rect.height as i32,
    );
    let hover = rect.contains(pointer.x, pointer.y);
    let enabled = control.kind.enabled();
    let background = if !enabled {
        shade(control.background, 1.2)
    } else if hover && pointer.pressed {
        shade(control.background, 0.6)
    } else if hover {
        shade(control.background, 0.8)
    } else {
        control.background
    };
    let foreground = if enabled {
        control.foreground
    } else {
        shade(control.foreground, 1.2)
    };
    let (cx, cy) = (x + w / 2, y + h / 2);

    match &control.kind {
        ControlKind::Window { title, padding } => {
            canvas.fill_rect(x, y, w, h, control.background);
            canvas.stroke_rect(x, y, w, h, control.foreground);
            if let Some(title) = title {
                let top = y + *padding as i32 + text_height(TEXT_SCALE) / 2;
                draw_text_centered(canvas, cx, top, TEXT_SCALE, title, control.foreground);
            }
        }
        ControlKind::Label { text } => {
            canvas.fill_rect(x, y, w, h, control.background);
            draw_text_centered(canvas, cx, cy, TEXT_SCALE, text, control.foreground);
        }
        ControlKind::Button { text, .. } => {
            canvas.fill_rect(x, y, w, h, background);
            canvas.stroke_rect(x, y, w, h, foreground);
            draw_text_centered(canvas, cx, cy, TEXT_SCALE, text, foreground);
        }
        ControlKind::Checkbox { text, checked, .. } => {
            let top = cy - CHECK_BOX / 2;
            canvas.fill_rect(x + 2, top, CHECK_BOX, CHECK_BOX, background);
            canvas.stroke_rect(x + 2, top, CHECK_BOX, CHECK_BOX, foreground);
            if *checked {
                canvas.fill_rect(x + 10, top + 8, 16, 16, foreground);
            }
            let text_y = cy - text_height(TEXT_SCALE) / 2;
            draw_text(canvas, x + CHECK_BOX + 8, text_y, TEXT_SCALE, text, foreground);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn window(tree: &mut ControlTree) -> ControlId {
        let id = tree
            .add(
                None,
                ControlKind::Window {
                    title: Some("PAUSED".into()),
                    padding: 10.0,
                },
            )
            .unwrap();
        tree.set_size(id, 300.0, 200.0).unwrap();
        tree.set_center(id, 400.0, 300.0).unwrap();
        id
    }

    fn button(tree: &mut ControlTree, parent: ControlId, text: &str) -> ControlId {
        tree.add(
            Some(parent),
            ControlKind::Button {
                text: text.into(),
                enabled: true,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_parent_and_children_are_indices() {
        let mut tree = ControlTree::new();
        let win = window(&mut tree);
        let a = button(&mut tree, win, "A");
        let b = button(&mut tree, win, "B");
        assert_eq!(tree.get(win).unwrap().children(), &[a, b]);
        assert_eq!(tree.get(a).unwrap().parent(), Some(win));
        assert_eq!(tree.roots(), &[win]);
    }

    #[test]
    fn test_reparent_moves_between_child_lists() {
        let mut tree = ControlTree::new();
        let w1 = window(&mut tree);
        let w2 = window(&mut tree);
        let a = button(&mut tree, w1, "A");
        tree.set_parent(a, Some(w2)).unwrap();
        assert!(tree.get(w1).unwrap().children().is_empty());
        assert_eq!(tree.get(w2).unwrap().children(), &[a]);
        tree.set_parent(a, None).unwrap();
        assert!(tree.roots().contains(&a));
    }

    #[test]
    fn test_cycles_are_rejected() {
        let mut tree = ControlTree::new();
        let win = window(&mut tree);
        let a = button(&mut tree, win, "A");
        assert!(matches!(
            tree.set_parent(win, Some(a)),
            Err(HudError::Cycle { .. })
        ));
        assert!(matches!(
            tree.set_parent(win, Some(win)),
            Err(HudError::Cycle { .. })
        ));
    }

    #[test]
    fn test_remove_drops_subtree_and_reuses_slots() {
        let mut tree = ControlTree::new();
        let win = window(&mut tree);
        let a = button(&mut tree, win, "A");
        button(&mut tree, win, "B");
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.remove(win).unwrap(), 3);
        assert!(tree.is_empty());
        assert!(tree.get(a).is_none());
        assert!(tree.remove(win).is_err());

        let again = window(&mut tree);
        assert!(tree.get(again).is_some());
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_size_clamped_to_parent() {
        let mut tree = ControlTree::new();
        let win = window(&mut tree);
        let a = button(&mut tree, win, "A");
        tree.set_size(a, 1000.0, 2.0).unwrap();
        let control = tree.get(a).unwrap();
        assert_eq!(control.width(), 300.0);
        assert_eq!(control.height(), MIN_CONTROL_SIZE);
    }

    #[test]
    fn test_add_fill_and_absolute_rect() {
        let mut tree = ControlTree::new();
        let win = window(&mut tree);
        let a = tree
            .add(None, ControlKind::Label { text: "HI".into() })
            .unwrap();
        tree.add_fill(win, a, 60.0).unwrap();
        let rect = tree.absolute_rect(a).unwrap();
        // Window spans x 250..550, y 200..400.
        assert_eq!(rect.width, 280.0);
        assert_eq!(rect.x, 260.0);
        assert_eq!(rect.y, 200.0 + 60.0 - 25.0);
    }

    #[test]
    fn test_click_on_release_inside() {
        let mut tree = ControlTree::new();
        let win = window(&mut tree);
        let a = button(&mut tree, win, "A");
        let rect = tree.absolute_rect(a).unwrap();
        let (x, y) = (rect.x + 5.0, rect.y + 5.0);

        let down = tree.handle_pointer(Pointer { x, y, pressed: true });
        assert!(down.hovering);
        assert!(down.clicked.is_empty());
        let up = tree.handle_pointer(Pointer { x, y, pressed: false });
        assert_eq!(up.clicked, vec![a]);

        // Release outside cancels.
        tree.handle_pointer(Pointer { x, y, pressed: true });
        let away = tree.handle_pointer(Pointer {
            x: 0.0,
            y: 0.0,
            pressed: false,
        });
        assert!(away.clicked.is_empty());
        assert!(!away.hovering);
    }

    #[test]
    fn test_checkbox_toggles_and_disabled_ignored() {
        let mut tree = ControlTree::new();
        let win = window(&mut tree);
        let check = tree
            .add(
                Some(win),
                ControlKind::Checkbox {
                    text: "STEREO".into(),
                    checked: false,
                    enabled: true,
                },
            )
            .unwrap();
        let rect = tree.absolute_rect(check).unwrap();
        let (x, y) = (rect.x + 1.0, rect.y + 1.0);
        tree.handle_pointer(Pointer { x, y, pressed: true });
        tree.handle_pointer(Pointer { x, y, pressed: false });
        assert!(matches!(
            tree.get(check).unwrap().kind,
            ControlKind::Checkbox { checked: true, .. }
        ));

        if let Some(control) = tree.get_mut(check) {
            control.kind = ControlKind::Button {
                text: "OFF".into(),
                enabled: false,
            };
        }
        tree.handle_pointer(Pointer { x, y, pressed: true });
        let up = tree.handle_pointer(Pointer { x, y, pressed: false });
        assert!(up.clicked.is_empty());
    }

    #[test]
    fn test_draw_fills_window_background() {
        let mut tree = ControlTree::new();
        let win = window(&mut tree);
        button(&mut tree, win, "OK");
        let mut canvas = Canvas::new(800, 600);
        tree.draw(&mut canvas, Pointer::default());
        // Window border at its left edge, background inside.
        assert_eq!(canvas.pixel(250, 300), Some(WHITE_SMOKE));
        assert_eq!(canvas.pixel(400, 390), Some(DARK_GRAY));
        assert_eq!(canvas.pixel(10, 10), Some(TRANSPARENT));
    }
}
