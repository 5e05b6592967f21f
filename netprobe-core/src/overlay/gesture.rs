//! Drag-vs-tap recognition for the floating control
//!
//! A press becomes a drag once the pointer moves more than the threshold away
//! from where it went down, on either axis. From then on every move shifts the
//! control by the incremental pointer delta. A release that never became a
//! drag is a tap.

use serde::{Deserialize, Serialize};

/// Screen position in device-independent pixels
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Raw pointer input on the control, in screen coordinates
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerEvent {
    Down(Point),
    Move(Point),
    Up(Point),
}

/// What a pointer event amounted to
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Gesture {
    /// Press recorded, nothing decided yet
    Pressed,
    /// Control should move by this delta
    Drag { dx: f32, dy: f32 },
    /// Press released without dragging
    Tap,
    /// Drag finished; the gesture was consumed as a reposition
    DragEnd,
    /// Event outside a press sequence (e.g. move without down)
    Ignored,
}

#[derive(Clone, Debug)]
pub struct GestureTracker {
    threshold: f32,
    origin: Option<Point>,
    last: Point,
    dragging: bool,
}

impl GestureTracker {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            origin: None,
            last: Point::default(),
            dragging: false,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Forget any press in progress
    pub fn reset(&mut self) {
        self.origin = None;
        self.dragging = false;
    }

    pub fn is_pressed(&self) -> bool {
        self.origin.is_some()
    }

    pub fn handle(&mut self, event: PointerEvent) -> Gesture {
        match event {
            PointerEvent::Down(p) => {
                self.origin = Some(p);
                self.last = p;
                self.dragging = false;
                Gesture::Pressed
            }
            PointerEvent::Move(p) => match self.track(p) {
                Some(gesture) => gesture,
                None => Gesture::Ignored,
            },
            PointerEvent::Up(p) => {
                if self.origin.is_none() {
                    return Gesture::Ignored;
                }
                // The release point counts as a final move, so a fast flick
                // with no intermediate moves still repositions the control.
                let last_move = self.track(p);
                let was_dragging = self.dragging;
                self.origin = None;
                self.dragging = false;
                match (was_dragging, last_move) {
                    (false, _) => Gesture::Tap,
                    (true, Some(Gesture::Drag { dx, dy })) if dx != 0.0 || dy != 0.0 => {
                        Gesture::Drag { dx, dy }
                    }
                    (true, _) => Gesture::DragEnd,
                }
            }
        }
    }

    /// Apply a pointer position inside a press; `None` outside a press
    fn track(&mut self, p: Point) -> Option<Gesture> {
        let origin = self.origin?;

        if !self.dragging
            && ((p.x - origin.x).abs() > self.threshold || (p.y - origin.y).abs() > self.threshold)
        {
            self.dragging = true;
        }

        if !self.dragging {
            return Some(Gesture::Pressed);
        }

        let (dx, dy) = (p.x - self.last.x, p.y - self.last.y);
        self.last = p;
        Some(Gesture::Drag { dx, dy })
    }
}
