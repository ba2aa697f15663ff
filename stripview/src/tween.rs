/// Offset interpolation for animated programmatic moves.
///
/// The curve is fixed (ease-in-out cubic); hosts only choose animated or not.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Tween {
    pub(crate) from: f64,
    pub(crate) to: f64,
    /// Set by the first `tick` after the move was requested.
    pub(crate) start_ms: Option<u64>,
    pub(crate) duration_ms: u64,
    /// Item index the move settles on.
    pub(crate) target_index: usize,
}

impl Tween {
    pub(crate) fn new(from: f64, to: f64, duration_ms: u64, target_index: usize) -> Self {
        Self {
            from,
            to,
            start_ms: None,
            duration_ms: duration_ms.max(1),
            target_index,
        }
    }

    pub(crate) fn is_done(&self, now_ms: u64) -> bool {
        match self.start_ms {
            Some(start) => now_ms.saturating_sub(start) >= self.duration_ms,
            None => false,
        }
    }

    pub(crate) fn sample(&self, now_ms: u64) -> f64 {
        let Some(start) = self.start_ms else {
            return self.from;
        };
        let elapsed = now_ms.saturating_sub(start);
        let t = (elapsed as f64 / self.duration_ms as f64).clamp(0.0, 1.0);
        self.from + (self.to - self.from) * ease_in_out_cubic(t)
    }
}

fn ease_in_out_cubic(t: f64) -> f64 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        let u = -2.0 * t + 2.0;
        1.0 - (u * u * u) / 2.0
    }
}
