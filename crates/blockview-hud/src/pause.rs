//! Pause menu built on the control tree.

use crate::controls::{ControlId, ControlKind, ControlTree, Pointer};
use crate::error::HudError;
use crate::raster::Canvas;

const WINDOW_WIDTH: f32 = 320.0;
const WINDOW_HEIGHT: f32 = 270.0;
const PADDING: f32 = 10.0;
const ROW_HEIGHT: f32 = 40.0;

/// Something the user asked for from the pause menu.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PauseAction {
    Resume,
    CycleEffect,
    ToggleStereo,
    Quit,
}

pub struct PauseScreen {
    tree: ControlTree,
    window: ControlId,
    stereo: ControlId,
    actions: Vec<(ControlId, PauseAction)>,
}

impl PauseScreen {
    /// Menu centered in a `width`×`height` bitmap.
    pub fn new(width: u32, height: u32) -> Result<Self, HudError> {
        let mut tree = ControlTree::new();
        let window = tree.add(
            None,
            ControlKind::Window {
                title: Some("PAUSED".into()),
                padding: PADDING,
            },
        )?;
        tree.set_size(window, WINDOW_WIDTH, WINDOW_HEIGHT)?;

        let mut actions = Vec::new();
        let mut row_y = 70.0;
        for (text, action) in [
            ("RESUME", PauseAction::Resume),
            ("NEXT EFFECT", PauseAction::CycleEffect),
        ] {
            let button = tree.add(
                None,
                ControlKind::Button {
                    text: text.into(),
                    enabled: true,
                },
            )?;
            tree.set_size(button, 0.0, ROW_HEIGHT)?;
            tree.add_fill(window, button, row_y)?;
            actions.push((button, action));
            row_y += ROW_HEIGHT + PADDING;
        }

        let stereo = tree.add(
            None,
            ControlKind::Checkbox {
                text: "STEREO".into(),
                checked: false,
                enabled: true,
            },
        )?;
        tree.set_size(stereo, 0.0, ROW_HEIGHT)?;
        tree.add_fill(window, stereo, row_y)?;
        actions.push((stereo, PauseAction::ToggleStereo));
        row_y += ROW_HEIGHT + PADDING;

        let quit = tree.add(
            None,
            ControlKind::Button {
                text: "QUIT".into(),
                enabled: true,
            },
        )?;
        tree.set_size(quit, 0.0, ROW_HEIGHT)?;
        tree.add_fill(window, quit, row_y)?;
        actions.push((quit, PauseAction::Quit));

        let mut screen = Self {
            tree,
            window,
            stereo,
            actions,
        };
        screen.layout(width, height)?;
        Ok(screen)
    }

    /// Keep the menu centered after a resize.
    pub fn layout(&mut self, width: u32, height: u32) -> Result<(), HudError> {
        self.tree
            .set_center(self.window, width as f32 / 2.0, height as f32 / 2.0)
    }

    /// Mirror the viewer's stereo flag into the checkbox.
    pub fn set_stereo(&mut self, on: bool) {
        if let Some(control) = self.tree.get_mut(self.stereo)
            && let ControlKind::Checkbox { checked, .. } = &mut control.kind
        {
            *checked = on;
        }
    }

    pub fn tree(&self) -> &ControlTree {
        &self.tree
    }

    /// Feed the pointer, returning whether it hovers a button and the actions clicked.
    pub fn handle_pointer(&mut self, pointer: Pointer) -> (bool, Vec<PauseAction>) {
        let outcome = self.tree.handle_pointer(pointer);
        let actions = outcome
            .clicked
            .iter()
            .filter_map(|id| {
                self.actions
                    .iter()
                    .find(|(control, _)| control == id)
                    .map(|(_, action)| *action)
            })
            .collect();
        (outcome.hovering, actions)
    }

    pub fn draw(&self, canvas: &mut Canvas, pointer: Pointer) {
        self.tree.draw(canvas, pointer);
    }

    /// Screen-space center of the control bound to `action`.
    pub fn action_center(&self, action: PauseAction) -> Option<(f32, f32)> {
        let (id, _) = self.actions.iter().find(|(_, a)| *a == action)?;
        let rect = self.tree.absolute_rect(*id).ok()?;
        Some((rect.x + rect.width / 2.0, rect.y + rect.height / 2.0))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
