use std::time::Duration;

/// Running totals of per-stage durations, indexed by stage.
#[derive(Debug, Default, Clone)]
pub struct TimeCalc {
    n: Vec<u32>,
    duration: Vec<Duration>,
}

#[allow(dead_code)]
impl TimeCalc {
    pub fn total(&self) -> Duration {
        self.duration.iter().sum::<Duration>()
    }

    /// Number of samples recorded for stage `i`.
    pub fn n_i(&self, i: usize) -> u32 {
        self.n.get(i).copied().unwrap_or(0)
    }

    pub fn avg_i(&self, i: usize) -> Option<Duration> {
        match (self.duration.get(i), self.n_i(i)) {
            (Some(d), n) if n > 0 => Some(*d / n),
            _ => None,
        }
    }

    pub fn ts(&self) -> &Vec<Duration> {
        &self.duration
    }

    pub fn add_or_push(&mut self, i: usize, x: Duration) {
        if i >= self.duration.len() {
            self.duration.resize(i + 1, Duration::ZERO);
            self.n.resize(i + 1, 0);
        }
        self.duration[i] += x;
        self.n[i] += 1;
    }

    pub fn clear(&mut self) {
        self.n = Default::default();
        self.duration = Default::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averages_per_stage() {
        let mut t = TimeCalc::default();
        t.add_or_push(0, Duration::from_millis(10));
        t.add_or_push(0, Duration::from_millis(20));
        t.add_or_push(2, Duration::from_millis(5));
        assert_eq!(t.avg_i(0), Some(Duration::from_millis(15)));
        assert_eq!(t.avg_i(1), None);
        assert_eq!(t.avg_i(2), Some(Duration::from_millis(5)));
        assert_eq!(t.total(), Duration::from_millis(35));
        t.clear();
        assert_eq!(t.n_i(0), 0);
    }
}
