//! Slice and frame navigation with the pointer.

use super::{Interaction, Tool, ToolContext, ToolKind};
use crate::constants::SCROLL_DRAG_THRESHOLD;
use crate::layers::{Point, ViewLayer};

/// Drag vertically to change slice, horizontally to change frame.
///
/// The wheel steps through slices, or through frames for single-slice data.
/// A double click starts playback, pressing the button stops it.
#[derive(Debug, Default)]
pub struct ScrollTool {
    origin: Option<Point>,
}

impl ScrollTool {
    pub fn new() -> Self {
        Self::default()
    }

    fn view<'c>(ctx: &'c mut ToolContext<'_>) -> Option<&'c mut ViewLayer> {
        let layer = ctx.layer;
        ctx.edit.layers.view_layer_mut(layer)
    }
}

impl Tool for ScrollTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Scroll
    }

    fn activate(&mut self, _active: bool) {
        self.origin = None;
    }

    fn handle(&mut self, interaction: &Interaction, ctx: &mut ToolContext<'_>) -> bool {
        match interaction {
            Interaction::MouseDown(point) => {
                if let Some(view) = Self::view(ctx)
                    && view.view().is_playing()
                {
                    view.stop();
                }
                self.origin = Some(*point);
                true
            }
            Interaction::MouseMove(point) => {
                let Some(mut origin) = self.origin else {
                    return false;
                };
                let Some(view) = Self::view(ctx) else {
                    return false;
                };

                let diff_y = point.y - origin.y;
                let y_move = diff_y.abs() > SCROLL_DRAG_THRESHOLD;
                if y_move {
                    if diff_y > 0.0 {
                        view.decrement_slice();
                    } else {
                        view.increment_slice();
                    }
                    origin.y = point.y;
                }

                let diff_x = point.x - origin.x;
                let x_move = diff_x.abs() > SCROLL_DRAG_THRESHOLD;
                if x_move {
                    if diff_x > 0.0 {
                        view.increment_frame();
                    } else {
                        view.decrement_frame();
                    }
                    origin.x = point.x;
                }

                self.origin = Some(origin);
                x_move || y_move
            }
            Interaction::MouseUp(_) | Interaction::MouseOut => self.origin.take().is_some(),
            Interaction::Wheel { delta_y, .. } => {
                let Some(view) = Self::view(ctx) else {
                    return false;
                };
                let has_slices = view.view().number_of_slices() != 1;
                let has_frames = view.view().number_of_frames() != 1;
                let up = *delta_y > 0.0;
                match (has_slices, has_frames, up) {
                    (true, _, true) => view.increment_slice(),
                    (true, _, false) => view.decrement_slice(),
                    (false, true, true) => view.increment_frame(),
                    (false, true, false) => view.decrement_frame(),
                    (false, false, _) => false,
                }
            }
            Interaction::DoubleClick(_) => match Self::view(ctx) {
                Some(view) => {
                    view.play();
                    true
                }
                None => false,
            },
            Interaction::KeyDown(key) => {
                ctx.forward_key(ToolKind::Scroll, key);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyboard::{Key, KeyEvent};
    use crate::tools::test_support::Fixture;

    fn position_k(fixture: &Fixture) -> usize {
        fixture
            .layers
            .view_layer(fixture.view)
            .unwrap()
            .view()
            .position()
            .k
    }

    fn frame(fixture: &Fixture) -> usize {
        fixture.layers.view_layer(fixture.view).unwrap().view().frame()
    }

    #[test]
    fn test_vertical_drag_changes_slice() {
        let mut fixture = Fixture::new(5, 1);
        let mut tool = ScrollTool::new();
        let view = fixture.view;
        let mut ctx = fixture.context(view, None, &[]);

        tool.handle(&Interaction::MouseDown(Point::new(50.0, 50.0)), &mut ctx);
        // Below the threshold: nothing happens.
        assert!(!tool.handle(&Interaction::MouseMove(Point::new(50.0, 40.0)), &mut ctx));
        // Upwards past the threshold: next slice.
        assert!(tool.handle(&Interaction::MouseMove(Point::new(50.0, 30.0)), &mut ctx));
        assert!(tool.handle(&Interaction::MouseMove(Point::new(50.0, 10.0)), &mut ctx));
        tool.handle(&Interaction::MouseUp(Point::new(50.0, 10.0)), &mut ctx);
        drop(ctx);

        assert_eq!(position_k(&fixture), 2);
    }

    #[test]
    fn test_downward_drag_and_moves_after_release() {
        let mut fixture = Fixture::new(5, 1);
        fixture
            .layers
            .view_layer_mut(fixture.view)
            .unwrap()
            .set_current_position(crate::layers::Position::new(5, 5, 3), true);
        let mut tool = ScrollTool::new();
        let view = fixture.view;
        let mut ctx = fixture.context(view, None, &[]);

        tool.handle(&Interaction::MouseDown(Point::new(0.0, 0.0)), &mut ctx);
        tool.handle(&Interaction::MouseMove(Point::new(0.0, 20.0)), &mut ctx);
        tool.handle(&Interaction::MouseOut, &mut ctx);
        assert!(!tool.handle(&Interaction::MouseMove(Point::new(0.0, 60.0)), &mut ctx));
        drop(ctx);

        assert_eq!(position_k(&fixture), 2);
    }

    #[test]
    fn test_horizontal_drag_changes_frame() {
        let mut fixture = Fixture::new(1, 4);
        let mut tool = ScrollTool::new();
        let view = fixture.view;
        let mut ctx = fixture.context(view, None, &[]);

        tool.handle(&Interaction::MouseDown(Point::new(0.0, 0.0)), &mut ctx);
        tool.handle(&Interaction::MouseMove(Point::new(16.0, 0.0)), &mut ctx);
        tool.handle(&Interaction::MouseMove(Point::new(32.0, 0.0)), &mut ctx);
        drop(ctx);

        assert_eq!(frame(&fixture), 2);
    }

    #[test]
    fn test_wheel_uses_frames_for_single_slice() {
        let mut fixture = Fixture::new(1, 3);
        let mut tool = ScrollTool::new();
        let view = fixture.view;
        let mut ctx = fixture.context(view, None, &[]);
        let wheel = Interaction::Wheel {
            delta_y: 1.0,
            point: Point::default(),
        };
        assert!(tool.handle(&wheel, &mut ctx));
        drop(ctx);
        assert_eq!(frame(&fixture), 1);
        assert_eq!(position_k(&fixture), 0);
    }

    #[test]
    fn test_double_click_plays_and_press_stops() {
        let mut fixture = Fixture::new(3, 1);
        let mut tool = ScrollTool::new();
        let view = fixture.view;
        let mut ctx = fixture.context(view, None, &[]);

        tool.handle(&Interaction::DoubleClick(Point::default()), &mut ctx);
        assert!(ctx.edit.layers.view_layer(view).unwrap().view().is_playing());
        tool.handle(&Interaction::MouseDown(Point::default()), &mut ctx);
        assert!(!ctx.edit.layers.view_layer(view).unwrap().view().is_playing());
    }

    #[test]
    fn test_key_down_is_forwarded() {
        let mut fixture = Fixture::new(1, 1);
        let seen = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let s = std::rc::Rc::clone(&seen);
        fixture
            .bus
            .add(crate::events::EventType::KeyDown, move |e| s.borrow_mut().push(e.clone()));

        let mut tool = ScrollTool::new();
        let view = fixture.view;
        let mut ctx = fixture.context(view, None, &[]);
        tool.handle(&Interaction::KeyDown(KeyEvent::new(Key::Char('a'))), &mut ctx);

        assert!(matches!(
            seen.borrow().as_slice(),
            [crate::events::Event::KeyDown {
                context: Some(ToolKind::Scroll),
                ..
            }]
        ));
    }
}
