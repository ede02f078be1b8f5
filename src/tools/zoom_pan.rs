//! Pan with a drag, zoom with the wheel.

use super::{Interaction, Tool, ToolContext, ToolKind};
use crate::constants::WHEEL_ZOOM_STEP;
use crate::layers::Point;

#[derive(Debug, Default)]
pub struct ZoomAndPanTool {
    last: Option<Point>,
}

impl ZoomAndPanTool {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Tool for ZoomAndPanTool {
    fn kind(&self) -> ToolKind {
        ToolKind::ZoomAndPan
    }

    fn activate(&mut self, _active: bool) {
        self.last = None;
    }

    fn handle(&mut self, interaction: &Interaction, ctx: &mut ToolContext<'_>) -> bool {
        match interaction {
            Interaction::MouseDown(point) => {
                self.last = Some(*point);
                true
            }
            Interaction::MouseMove(point) => {
                let Some(last) = self.last else {
                    return false;
                };
                let delta = Point::new(point.x - last.x, point.y - last.y);
                if delta == Point::default() {
                    return false;
                }
                ctx.edit.layers.add_translation(delta);
                self.last = Some(*point);
                true
            }
            Interaction::MouseUp(_) | Interaction::MouseOut => self.last.take().is_some(),
            Interaction::Wheel { delta_y, point } => {
                if *delta_y == 0.0 {
                    return false;
                }
                // Wheel down zooms out.
                let step = if *delta_y > 0.0 {
                    -WHEEL_ZOOM_STEP
                } else {
                    WHEEL_ZOOM_STEP
                };
                ctx.edit.layers.add_scale(step, *point)
            }
            Interaction::DoubleClick(_) => false,
            Interaction::KeyDown(key) => {
                ctx.forward_key(ToolKind::ZoomAndPan, key);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::Fixture;

    #[test]
    fn test_drag_translates() {
        let mut fixture = Fixture::new(1, 1);
        let before = fixture.layers.offset();
        let mut tool = ZoomAndPanTool::new();
        let view = fixture.view;
        let mut ctx = fixture.context(view, None, &[]);

        tool.handle(&Interaction::MouseDown(Point::new(10.0, 10.0)), &mut ctx);
        tool.handle(&Interaction::MouseMove(Point::new(15.0, 7.0)), &mut ctx);
        tool.handle(&Interaction::MouseUp(Point::new(15.0, 7.0)), &mut ctx);
        assert!(!tool.handle(&Interaction::MouseMove(Point::new(40.0, 40.0)), &mut ctx));
        drop(ctx);

        let after = fixture.layers.offset();
        assert!((after.x - before.x - 5.0).abs() < 1e-9);
        assert!((after.y - before.y + 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_wheel_zoom_is_bounded() {
        let mut fixture = Fixture::new(1, 1);
        let mut tool = ZoomAndPanTool::new();
        let view = fixture.view;
        let mut ctx = fixture.context(view, None, &[]);
        let zoom_in = Interaction::Wheel {
            delta_y: -1.0,
            point: Point::new(50.0, 50.0),
        };

        let mut steps = 0;
        while tool.handle(&zoom_in, &mut ctx) {
            steps += 1;
            assert!(steps < 100);
        }
        drop(ctx);

        assert!(steps > 0);
        assert!(fixture.layers.added_scale() <= 3.0);
    }

    #[test]
    fn test_wheel_down_zooms_out() {
        let mut fixture = Fixture::new(1, 1);
        let mut tool = ZoomAndPanTool::new();
        let view = fixture.view;
        let mut ctx = fixture.context(view, None, &[]);
        tool.handle(
            &Interaction::Wheel {
                delta_y: 1.0,
                point: Point::new(0.0, 0.0),
            },
            &mut ctx,
        );
        drop(ctx);
        assert!(fixture.layers.added_scale() < 1.0);
    }
}
