use std::time::{Duration, Instant};

/// Paces a loop to at most `fps` iterations per second.
pub struct FpsLimiter {
    fps_control: Instant,
    fps_wait: Duration,
}

impl FpsLimiter {
    pub fn new(fps: usize) -> Self {
        Self {
            fps_control: Instant::now(),
            fps_wait: Duration::from_millis(1000 / fps.max(1) as u64),
        }
    }

    /// Sleeps for whatever is left of the current period, then starts the next one.
    pub fn wait(&mut self) {
        let elapsed = self.fps_control.elapsed();

        if self.fps_wait > elapsed {
            spin_sleep::sleep(self.fps_wait - elapsed);
        }
        self.fps_control = Instant::now();
    }

    pub fn period(&self) -> Duration {
        self.fps_wait
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waits_out_the_period() {
        let mut limiter = FpsLimiter::new(50);
        assert_eq!(limiter.period(), Duration::from_millis(20));

        let start = Instant::now();
        limiter.wait();
        limiter.wait();
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[test]
    fn zero_fps_does_not_divide_by_zero() {
        assert_eq!(FpsLimiter::new(0).period(), Duration::from_secs(1));
    }
}
