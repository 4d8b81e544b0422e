//! Exponential Moving Average.
//!
//! k = 2/(n+1), seeded with the SMA of the first n closes, then
//! EMA[i] = C[i]*k + EMA[i-1]*(1-k). The first (n-1) updates yield no value.

#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    k: f64,
    seen: usize,
    sum: f64,
    current: Option<f64>,
    previous: Option<f64>,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        let period = period.max(1);
        Self {
            period,
            k: 2.0 / (period as f64 + 1.0),
            seen: 0,
            sum: 0.0,
            current: None,
            previous: None,
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// Number of closes consumed so far.
    pub fn len(&self) -> usize {
        self.seen
    }

    pub fn is_empty(&self) -> bool {
        self.seen == 0
    }

    /// Feed the next close; returns the EMA once warmed up.
    pub fn update(&mut self, close: f64) -> Option<f64> {
        self.seen += 1;
        self.previous = self.current;
        if self.seen < self.period {
            self.sum += close;
        } else if self.seen == self.period {
            self.sum += close;
            self.current = Some(self.sum / self.period as f64);
        } else if let Some(ema) = self.current {
            self.current = Some(close * self.k + ema * (1.0 - self.k));
        }
        self.current
    }

    pub fn value(&self) -> Option<f64> {
        self.current
    }

    /// EMA[i] - EMA[i-1]; needs one bar beyond the warmup.
    pub fn slope(&self) -> Option<f64> {
        match (self.current, self.previous) {
            (Some(now), Some(before)) => Some(now - before),
            _ => None,
        }
    }
}
