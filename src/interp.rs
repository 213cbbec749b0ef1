use crate::types::PixelPos;

/// Linear motion between two pixel positions, advanced by a fixed step per frame.
#[derive(Clone, Debug, PartialEq)]
pub struct TileInterpolator {
    step: f32,
    t: f32,
    from: PixelPos,
    to: PixelPos,
    active: bool,
}

impl TileInterpolator {
    pub fn new(step: f32) -> Self {
        Self {
            step: step.clamp(f32::EPSILON, 1.0),
            t: 0.0,
            from: PixelPos::default(),
            to: PixelPos::default(),
            active: false,
        }
    }

    pub fn begin(&mut self, from: PixelPos, to: PixelPos) {
        self.from = from;
        self.to = to;
        self.t = 0.0;
        self.active = true;
    }

    pub fn clear(&mut self) {
        self.active = false;
        self.t = 0.0;
    }

    pub fn t(&self) -> f32 {
        self.t
    }

    pub fn destination(&self) -> PixelPos {
        self.to
    }

    pub fn advance(&mut self) -> PixelPos {
        if self.active && self.t < 1.0 {
            self.t = (self.t + self.step).min(1.0);
            // absorb float drift so a whole number of steps lands on 1
            if 1.0 - self.t < 1e-5 {
                self.t = 1.0;
            }
        }
        self.position()
    }

    pub fn position(&self) -> PixelPos {
        if !self.active || self.t <= 0.0 {
            return self.from;
        }
        if self.t >= 1.0 {
            return self.to;
        }
        PixelPos {
            x: (1.0 - self.t) * self.from.x + self.t * self.to.x,
            y: (1.0 - self.t) * self.from.y + self.t * self.to.y,
        }
    }

    pub fn arrived(&self) -> bool {
        self.active && (self.t >= 1.0 || self.position() == self.to)
    }

    /// Swaps the endpoints mid-flight, keeping the current pixel position.
    pub fn reverse(&mut self) {
        if !self.active {
            return;
        }
        std::mem::swap(&mut self.from, &mut self.to);
        self.t = 1.0 - self.t;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames_to_arrive(step: f32) -> usize {
        let mut interp = TileInterpolator::new(step);
        let to = PixelPos { x: 40.0, y: 20.0 };
        interp.begin(PixelPos { x: 20.0, y: 20.0 }, to);
        let mut frames = 0;
        while !interp.arrived() {
            interp.advance();
            frames += 1;
            assert!(frames <= 10_000);
        }
        assert_eq!(interp.position(), to);
        assert_eq!(interp.t(), 1.0);
        frames
    }

    #[test]
    fn arrival_is_exact_and_deterministic() {
        assert_eq!(frames_to_arrive(0.2), frames_to_arrive(0.2));
        assert_eq!(frames_to_arrive(0.2), 5);
        assert_eq!(frames_to_arrive(1.0), 1);
        assert_eq!(frames_to_arrive(0.3), 4);
        assert_eq!(frames_to_arrive(0.07), 15);
    }

    #[test]
    fn reverse_keeps_pixel_position() {
        let mut interp = TileInterpolator::new(0.25);
        interp.begin(PixelPos { x: 0.0, y: 0.0 }, PixelPos { x: 20.0, y: 0.0 });
        interp.advance();
        let before = interp.position();
        interp.reverse();
        let after = interp.position();
        assert!((before.x - after.x).abs() < 1e-4);
        assert_eq!(interp.destination(), PixelPos { x: 0.0, y: 0.0 });
        interp.advance();
        interp.advance();
        interp.advance();
        assert!(interp.arrived());
        assert_eq!(interp.position(), PixelPos { x: 0.0, y: 0.0 });
    }

    #[test]
    fn inactive_interpolator_does_not_move() {
        let mut interp = TileInterpolator::new(0.2);
        assert!(!interp.arrived());
        assert_eq!(interp.advance(), PixelPos::default());
        assert_eq!(interp.t(), 0.0);
    }
}
