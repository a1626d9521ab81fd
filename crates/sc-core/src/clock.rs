use std::time::Instant;

/// Time source for `after(...)`/`idle(...)` guards and the tester harness.
///
/// Two modes, mirroring the reference clock:
/// - manual: `set_time` is the only way time advances, and it must be
///   monotonic.
/// - synchronized: `time` tracks wall-clock elapsed time since `start()`,
///   scaled by `speed`. Changing `speed` folds whatever has elapsed under
///   the old speed into the fixed base before rescaling, so time already
///   observed never jumps.
#[derive(Debug)]
pub struct Clock {
    /// Manually-set base time (manual mode) or accumulated time at the last
    /// `start`/`speed` change (synchronized mode).
    base: f64,
    /// Wall-clock instant `base` was established at, used only when
    /// synchronized and playing.
    anchor: Instant,
    playing: bool,
    speed: f64,
    synchronized: bool,
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock {
    pub fn new() -> Self {
        Self {
            base: 0.0,
            anchor: Instant::now(),
            playing: false,
            speed: 1.0,
            synchronized: false,
        }
    }

    /// Current time. In manual mode this is just the last value set. In
    /// synchronized mode it is `base` plus wall-clock elapsed since the
    /// last `start`/`speed` change, scaled by `speed`, if currently playing.
    pub fn time(&self) -> f64 {
        if self.synchronized && self.playing {
            self.base + self.anchor.elapsed().as_secs_f64() * self.speed
        } else {
            self.base
        }
    }

    /// Set the time directly. Rejects moving backwards. If the clock is
    /// currently playing, this just rebases the wall-clock anchor to the new
    /// value and playback continues from there; only a stopped clock is
    /// switched into manual mode by this call.
    pub fn set_time(&mut self, value: f64) -> Result<(), ClockError> {
        let current = self.time();
        if value < current {
            return Err(ClockError::NotMonotonic {
                current,
                requested: value,
            });
        }
        self.base = value;
        self.anchor = Instant::now();
        if !self.playing {
            self.synchronized = false;
        }
        Ok(())
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Change the playback speed. Folds elapsed time under the old speed
    /// into `base` first, so `time()` is continuous across the change.
    pub fn set_speed(&mut self, speed: f64) {
        self.base = self.time();
        self.anchor = Instant::now();
        self.speed = speed;
        self.synchronized = true;
    }

    /// Start (or resume) synchronized wall-clock playback.
    pub fn start(&mut self) {
        if !self.playing {
            self.base = self.time();
            self.anchor = Instant::now();
            self.playing = true;
            self.synchronized = true;
        }
    }

    /// Stop synchronized playback; `time()` then holds steady.
    pub fn stop(&mut self) {
        if self.playing {
            self.base = self.time();
            self.playing = false;
        }
    }

    pub fn playing(&self) -> bool {
        self.playing
    }
}

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum ClockError {
    #[error("clock time must be monotonic: cannot move from {current} to {requested}")]
    NotMonotonic { current: f64, requested: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_time_rejects_moving_backwards() {
        let mut clock = Clock::new();
        clock.set_time(5.0).unwrap();
        let err = clock.set_time(2.0).unwrap_err();
        assert_eq!(
            err,
            ClockError::NotMonotonic {
                current: 5.0,
                requested: 2.0
            }
        );
    }

    #[test]
    fn manual_time_accepts_holding_still_or_advancing() {
        let mut clock = Clock::new();
        clock.set_time(5.0).unwrap();
        clock.set_time(5.0).unwrap();
        clock.set_time(7.5).unwrap();
        assert_eq!(clock.time(), 7.5);
    }

    #[test]
    fn stopped_clock_holds_steady() {
        let mut clock = Clock::new();
        clock.start();
        clock.stop();
        let t1 = clock.time();
        let t2 = clock.time();
        assert_eq!(t1, t2);
    }

    #[test]
    fn default_clock_is_not_playing() {
        let clock = Clock::new();
        assert!(!clock.playing());
        assert_eq!(clock.time(), 0.0);
    }
}
