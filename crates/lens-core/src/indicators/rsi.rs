/// RSI (Relative Strength Index) — Wilder smoothing of avg gain/loss.
///
/// The pipeline treats this as its bounded 0–100 oscillator; the neutral
/// value during warm-up is 50.
#[derive(Debug, Clone)]
pub struct RsiIndicator {
    window: usize,
    prev_close: f64,
    avg_gain: f64,
    avg_loss: f64,
    pub value: f64,
    count: usize,
    gain_sum: f64,
    loss_sum: f64,
    warm: bool,
    has_prev: bool,
}

impl RsiIndicator {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            prev_close: 0.0,
            avg_gain: 0.0,
            avg_loss: 0.0,
            value: 50.0,
            count: 0,
            gain_sum: 0.0,
            loss_sum: 0.0,
            warm: false,
            has_prev: false,
        }
    }

    pub fn update(&mut self, close: f64) -> f64 {
        if !close.is_finite() {
            return self.value;
        }

        if !self.has_prev {
            self.prev_close = close;
            self.has_prev = true;
            return 50.0;
        }

        let change = close - self.prev_close;
        let gain = if change > 0.0 { change } else { 0.0 };
        let loss = if change < 0.0 { -change } else { 0.0 };
        self.prev_close = close;

        if !self.warm {
            self.gain_sum += gain;
            self.loss_sum += loss;
            self.count += 1;
            if self.count >= self.window {
                self.avg_gain = self.gain_sum / self.window as f64;
                self.avg_loss = self.loss_sum / self.window as f64;
                self.warm = true;
            } else {
                self.value = 50.0;
                return 50.0;
            }
        } else {
            // Wilder smoothing
            let w = self.window as f64;
            self.avg_gain = (self.avg_gain * (w - 1.0) + gain) / w;
            self.avg_loss = (self.avg_loss * (w - 1.0) + loss) / w;
        }

        if self.avg_loss == 0.0 {
            self.value = 100.0;
        } else {
            let rs = self.avg_gain / self.avg_loss;
            self.value = 100.0 - 100.0 / (1.0 + rs);
        }
        self.value
    }

    pub fn is_warm(&self) -> bool {
        self.warm
    }
}
