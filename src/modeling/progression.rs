use crate::config::ProgressionParams;

/// Cost and payoff of pushing one mastery rank.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MasteryAdvancement {
    pub effort_required: f64,
    /// Visible gain per unit effort, shrinking with rank.
    pub advancement: f64,
}

/// Experience-to-level curve plus perceived-progress scaling.
///
/// Requirements grow geometrically and are truncated toward zero when the
/// scaled value is narrowed to whole experience points.
#[derive(Debug, Clone)]
pub struct ProgressionCurve {
    params: ProgressionParams,
}

impl ProgressionCurve {
    /// Highest level the curve is defined for. The default curve still fits
    /// comfortably in `u64` here, so truncation never saturates and the
    /// requirement stays strictly increasing across the whole range.
    pub const MAX_LEVEL: u32 = 300;

    pub fn new(params: ProgressionParams) -> Self {
        Self { params }
    }

    /// Experience needed to clear the given level. Strictly increasing over
    /// `1..=MAX_LEVEL`; levels outside that range clamp to the nearest bound.
    pub fn experience_requirement(&self, level: u32) -> u64 {
        let level = level.clamp(1, Self::MAX_LEVEL);
        if level == 1 {
            return self.params.base_requirement;
        }
        let scaled = self.params.base_requirement as f64
            * self.params.growth_rate.powi((level - 1) as i32);
        scaled as u64
    }

    /// Logarithmically compressed progress through the current level, so the
    /// early stretch of a level reads faster than the late stretch.
    pub fn level_progress(&self, current_exp: u64, level_exp: u64) -> f64 {
        let raw = current_exp as f64 / level_exp.max(1) as f64;
        (raw.ln_1p() / std::f64::consts::LN_2).clamp(0.0, 1.0)
    }

    /// Each extra mastery rank costs geometrically more effort for
    /// proportionally less visible gain.
    pub fn mastery_advancement(&self, mastery_level: u32) -> MasteryAdvancement {
        let m = mastery_level.max(1);
        let effort_required =
            self.params.mastery_base_effort * self.params.mastery_growth.powi(m as i32 - 1);
        let advancement = if m == 1 {
            1.0
        } else {
            (1.0 / ((m - 1) as f64).sqrt()).clamp(0.1, 1.0)
        };
        MasteryAdvancement {
            effort_required,
            advancement,
        }
    }

    /// Coefficient of variation of perceived progress across the supplied
    /// per-level progress values. Lower means the curve is closer to a
    /// constant-perceived-effort law.
    pub fn constant_perceived_effort(&self, levels: &[f64]) -> f64 {
        if levels.is_empty() {
            return 0.0;
        }
        let k = self.params.perceived_k;
        let min_progress = self.params.perceived_min_progress;
        let perceived: Vec<f64> = levels
            .iter()
            .map(|&v| {
                if v > min_progress {
                    k * (v / min_progress).ln()
                } else {
                    0.0
                }
            })
            .collect();
        let mean = perceived.iter().sum::<f64>() / perceived.len() as f64;
        if mean <= f64::EPSILON {
            return 0.0;
        }
        let variance = perceived
            .iter()
            .map(|p| (p - mean).powi(2))
            .sum::<f64>()
            / perceived.len() as f64;
        variance.sqrt() / mean
    }
}
