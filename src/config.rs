/// How much of the vblank interval the scheduler reserves for compositing
/// when the measured render times are lower.
///
/// Lower policies start compositing later, reducing input-to-photon latency
/// at the cost of robustness against render-time spikes.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LatencyPolicy {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl Default for LatencyPolicy {
    fn default() -> Self {
        Self::Medium
    }
}

impl LatencyPolicy {
    pub fn factor(self) -> f64 {
        match self {
            LatencyPolicy::VeryLow => 0.1,
            LatencyPolicy::Low => 0.25,
            LatencyPolicy::Medium => 0.5,
            LatencyPolicy::High => 0.75,
            LatencyPolicy::VeryHigh => 1.0,
        }
    }
}

/// How the expected render time is derived from recent paint durations.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RenderTimeEstimator {
    Minimum,
    Maximum,
    Average,
}

impl Default for RenderTimeEstimator {
    fn default() -> Self {
        Self::Maximum
    }
}
