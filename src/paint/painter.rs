//! Pointer-event driver for brush tools
//!
//! Turns button press / motion / release and tool control requests into
//! `PaintCore` calls and kernel callbacks. Holding shift on press draws a
//! straight line from where the previous stroke on the same image ended.

use serde::{Deserialize, Serialize};

use crate::brush::StrokeCoords;
use crate::core::contracts::validate_position;
use crate::core::PaintError;
use crate::drawable::{Drawable, ImageId};
use crate::undo::UndoStack;

use super::{PaintCore, PaintKernel, PaintState};

/// Modifier keys held during a button press
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
}

/// Host requests that are not pointer events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolAction {
    /// Host is about to draw over the canvas
    Pause,
    Resume,
}

#[derive(Debug)]
pub struct Painter<K: PaintKernel> {
    core: PaintCore,
    kernel: K,
    active: bool,
    paused_count: u32,
    /// Image the last stroke painted on, for shift-click lines
    last_image: Option<ImageId>,
}

impl<K: PaintKernel> Painter<K> {
    pub fn new(core: PaintCore, kernel: K) -> Self {
        Self {
            core,
            kernel,
            active: false,
            paused_count: 0,
            last_image: None,
        }
    }

    pub fn core(&self) -> &PaintCore {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut PaintCore {
        &mut self.core
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    pub fn kernel_mut(&mut self) -> &mut K {
        &mut self.kernel
    }

    /// Whether a stroke is in progress
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_paused(&self) -> bool {
        self.paused_count > 0
    }

    /// Start a stroke at `sample`
    pub fn button_press(&mut self, drawable: &mut Drawable, sample: StrokeCoords, modifiers: Modifiers) -> Result<(), PaintError> {
        if self.active {
            tracing::debug!("button_press during an active stroke, restarting");
        }

        let previous_end = self.core.last;
        let draw_line = modifiers.shift && self.last_image.is_some() && self.last_image == drawable.image();

        self.core.init(drawable, sample.x, sample.y)?;
        self.core.cur = sample;
        if draw_line {
            self.core.start = previous_end;
            self.core.last = previous_end;
        } else {
            self.core.start = sample;
            self.core.last = sample;
        }

        self.active = true;
        self.last_image = drawable.image();

        self.kernel.paint(&mut self.core, drawable, PaintState::Init)?;
        if draw_line {
            self.core.interpolate(drawable, &mut self.kernel)?;
        } else {
            self.kernel.paint(&mut self.core, drawable, PaintState::Motion)?;
        }
        self.core.last = self.core.cur;
        Ok(())
    }

    /// Continue the stroke to `sample`. Ignored when no stroke is active.
    pub fn motion(&mut self, drawable: &mut Drawable, sample: StrokeCoords) -> Result<usize, PaintError> {
        if !self.active {
            return Ok(0);
        }
        validate_position(sample.x, sample.y)?;
        self.core.cur = sample;
        let dabs = self.core.interpolate(drawable, &mut self.kernel)?;
        self.core.last = self.core.cur;
        Ok(dabs)
    }

    /// End the stroke and record it. Returns whether an undo group was pushed.
    pub fn button_release(&mut self, drawable: &mut Drawable, undo: &mut dyn UndoStack) -> Result<bool, PaintError> {
        if !self.active {
            return Ok(false);
        }
        self.active = false;

        let finished = self.kernel.paint(&mut self.core, drawable, PaintState::Finish);
        let pushed = self.core.finish(drawable, self.kernel.kind(), undo)?;
        finished?;
        Ok(pushed)
    }

    pub fn control(&mut self, drawable: &mut Drawable, action: ToolAction) -> Result<(), PaintError> {
        match action {
            ToolAction::Pause => {
                if self.paused_count == 0 {
                    self.kernel.paint(&mut self.core, drawable, PaintState::Pause)?;
                }
                self.paused_count += 1;
            }
            ToolAction::Resume => {
                if self.paused_count == 0 {
                    tracing::warn!("Resume without matching pause");
                    return Ok(());
                }
                self.paused_count -= 1;
                if self.paused_count == 0 {
                    self.kernel.paint(&mut self.core, drawable, PaintState::Resume)?;
                }
            }
        }
        Ok(())
    }

    /// Tool deactivated mid-stroke. Pending pauses are dropped and the
    /// stroke is finished like a release, so painted pixels stay undoable.
    pub fn halt(&mut self, drawable: &mut Drawable, undo: &mut dyn UndoStack) -> Result<bool, PaintError> {
        self.paused_count = 0;
        if self.active {
            tracing::debug!("Halting active {} stroke", self.kernel.kind());
        }
        self.button_release(drawable, undo)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::brush::{Brush, BrushHardness, BrushSelection, MaskBuf};
    use crate::core::PaintConfig;
    use crate::display::NullDisplay;
    use crate::drawable::PixelFormat;
    use crate::paint::{ApplicationMode, CanvasApplication};
    use crate::tools::ToolKind;
    use crate::undo::UndoHistory;

    #[derive(Default)]
    struct Recorder {
        states: Vec<PaintState>,
        dabs: Vec<(f64, f64)>,
    }

    impl PaintKernel for Recorder {
        fn kind(&self) -> ToolKind {
            ToolKind::Paintbrush
        }

        fn paint(&mut self, core: &mut PaintCore, drawable: &mut Drawable, state: PaintState) -> Result<(), PaintError> {
            self.states.push(state);
            if state == PaintState::Motion {
                self.dabs.push((core.cur.x, core.cur.y));
                if let Some(buf) = core.get_paint_area(drawable) {
                    buf.fill(&[0, 0, 0, 255]);
                    let app = CanvasApplication {
                        hardness: BrushHardness::Hard,
                        mode: ApplicationMode::Incremental,
                        ..CanvasApplication::default()
                    };
                    core.paste_canvas(drawable, &app)?;
                }
            }
            Ok(())
        }
    }

    fn painter() -> Painter<Recorder> {
        let selection = Arc::new(BrushSelection::new());
        selection.insert(Brush::new("dot", MaskBuf::square(1, 255), 1));
        let core = PaintCore::new(selection, Arc::new(NullDisplay), PaintConfig::default());
        Painter::new(core, Recorder::default())
    }

    fn at(x: f64, y: f64) -> StrokeCoords {
        StrokeCoords::new(x, y, 0.5)
    }

    fn drawable() -> Drawable {
        Drawable::new(Some(ImageId(7)), 32, 32, PixelFormat::Rgba, [255, 255, 255, 0])
    }

    #[test]
    fn press_paints_a_single_dab() {
        let mut p = painter();
        let mut d = drawable();
        p.button_press(&mut d, at(4.0, 4.0), Modifiers::default()).unwrap();

        assert_eq!(p.kernel().states, vec![PaintState::Init, PaintState::Motion]);
        assert_eq!(p.kernel().dabs, vec![(4.0, 4.0)]);
        assert!(p.is_active());
        assert_eq!(p.core().last, at(4.0, 4.0));
    }

    #[test]
    fn full_stroke_records_one_undo_group() {
        let mut p = painter();
        let mut d = drawable();
        let mut history = UndoHistory::with_levels(8);

        p.button_press(&mut d, at(2.0, 2.0), Modifiers::default()).unwrap();
        assert_eq!(p.motion(&mut d, at(6.0, 2.0)).unwrap(), 4);
        assert_eq!(p.motion(&mut d, at(6.0, 2.0)).unwrap(), 0);
        assert!(p.button_release(&mut d, &mut history).unwrap());

        assert_eq!(history.len(), 1);
        assert!(!p.is_active());
        assert_eq!(p.kernel().states.last(), Some(&PaintState::Finish));
        assert_eq!(d.pixel(4, 2).unwrap()[3], 255);

        // motion after release is ignored
        assert_eq!(p.motion(&mut d, at(9.0, 9.0)).unwrap(), 0);
    }

    #[test]
    fn shift_click_draws_line_from_previous_end() {
        let mut p = painter();
        let mut d = drawable();
        let mut history = UndoHistory::with_levels(8);

        p.button_press(&mut d, at(2.0, 2.0), Modifiers::default()).unwrap();
        p.button_release(&mut d, &mut history).unwrap();

        p.kernel_mut().dabs.clear();
        p.button_press(&mut d, at(5.0, 2.0), Modifiers { shift: true }).unwrap();
        assert_eq!(p.kernel().dabs, vec![(3.0, 2.0), (4.0, 2.0), (5.0, 2.0)]);
        assert_eq!(p.core().start, at(2.0, 2.0));
    }

    #[test]
    fn shift_click_on_other_image_starts_fresh() {
        let mut p = painter();
        let mut d = drawable();
        let mut other = Drawable::new(Some(ImageId(8)), 32, 32, PixelFormat::Rgba, [0; 4]);
        let mut history = UndoHistory::with_levels(8);

        p.button_press(&mut d, at(2.0, 2.0), Modifiers::default()).unwrap();
        p.button_release(&mut d, &mut history).unwrap();

        p.kernel_mut().dabs.clear();
        p.button_press(&mut other, at(5.0, 2.0), Modifiers { shift: true }).unwrap();
        assert_eq!(p.kernel().dabs, vec![(5.0, 2.0)]);
    }

    #[test]
    fn pause_and_resume_are_counted() {
        let mut p = painter();
        let mut d = drawable();
        p.button_press(&mut d, at(2.0, 2.0), Modifiers::default()).unwrap();
        p.kernel_mut().states.clear();

        p.control(&mut d, ToolAction::Pause).unwrap();
        p.control(&mut d, ToolAction::Pause).unwrap();
        p.control(&mut d, ToolAction::Resume).unwrap();
        assert!(p.is_paused());
        p.control(&mut d, ToolAction::Resume).unwrap();
        assert!(!p.is_paused());
        assert_eq!(p.kernel().states, vec![PaintState::Pause, PaintState::Resume]);

        // pausing leaves the stroke untouched
        assert!(p.core().is_active());
        assert_eq!(p.core().distance(), 0.0);
    }

    #[test]
    fn halt_records_painted_pixels() {
        let mut p = painter();
        let mut d = drawable();
        let mut history = UndoHistory::with_levels(8);

        p.button_press(&mut d, at(4.0, 4.0), Modifiers::default()).unwrap();
        p.motion(&mut d, at(12.0, 4.0)).unwrap();
        p.control(&mut d, ToolAction::Pause).unwrap();
        assert!(p.halt(&mut d, &mut history).unwrap());

        assert!(!p.is_active());
        assert!(!p.is_paused());
        assert!(!p.core().is_active());
        assert_eq!(p.kernel().states.last(), Some(&PaintState::Finish));
        assert_eq!(history.len(), 1);

        // release after halt has nothing left to record
        assert!(!p.button_release(&mut d, &mut history).unwrap());
        assert_eq!(history.len(), 1);

        history.undo(&mut d).unwrap();
        assert_eq!(d.pixel(8, 4).unwrap(), &[255, 255, 255, 0]);
    }

    #[test]
    fn halt_without_stroke_records_nothing() {
        let mut p = painter();
        let mut d = drawable();
        let mut history = UndoHistory::with_levels(8);

        assert!(!p.halt(&mut d, &mut history).unwrap());
        assert!(history.is_empty());
    }

    #[test]
    fn press_far_outside_range_is_rejected() {
        let mut p = painter();
        let mut d = drawable();

        assert!(matches!(
            p.button_press(&mut d, at(3.0e9, 4.0), Modifiers::default()),
            Err(PaintError::InvalidInput(_))
        ));
        assert!(!p.is_active());
        assert!(p.kernel().states.is_empty());

        p.button_press(&mut d, at(4.0, 4.0), Modifiers::default()).unwrap();
        assert!(p.motion(&mut d, at(4.0, -3.0e9)).is_err());
        assert_eq!(p.core().cur, at(4.0, 4.0));
        assert_eq!(p.motion(&mut d, at(6.0, 4.0)).unwrap(), 2);
    }

    #[test]
    fn press_without_brush_fails_cleanly() {
        let core = PaintCore::new(Arc::new(BrushSelection::new()), Arc::new(NullDisplay), PaintConfig::default());
        let mut p = Painter::new(core, Recorder::default());
        let mut d = drawable();

        assert!(matches!(
            p.button_press(&mut d, at(1.0, 1.0), Modifiers::default()),
            Err(PaintError::NoBrush)
        ));
        assert!(!p.is_active());
        assert!(p.kernel().states.is_empty());
    }
}
