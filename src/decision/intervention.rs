use crate::config::InterventionParams;
use crate::types::{InterventionContext, InterventionOutcome, InterventionType};

/// Maps an intervention intent plus player context to a descriptive outcome.
///
/// Applying the outcome (mutating difficulty, granting the bonus) is the
/// orchestrator's job; nothing here has side effects.
#[derive(Debug, Clone)]
pub struct InterventionDispatcher {
    params: InterventionParams,
}

impl InterventionDispatcher {
    pub fn new(params: InterventionParams) -> Self {
        Self { params }
    }

    pub fn trigger_intervention(
        &self,
        intervention_type: InterventionType,
        context: &InterventionContext,
    ) -> InterventionOutcome {
        match intervention_type {
            InterventionType::DifficultyReduction => InterventionOutcome {
                intervention_type,
                description: format!(
                    "Reduced difficulty by {:.2} to relieve pressure at {:.2}",
                    self.params.difficulty_step, context.current_difficulty
                ),
                difficulty_delta: Some(-self.params.difficulty_step),
                bonus_amount: None,
                recommended_category: None,
                milestone: None,
            },
            InterventionType::ContentRecommendation => {
                let description = match context.recommended_category {
                    Some(category) => {
                        format!("Suggested switching to {} content", category.as_str())
                    }
                    None => "Suggested rotating to a fresh content category".to_string(),
                };
                InterventionOutcome {
                    intervention_type,
                    description,
                    difficulty_delta: None,
                    bonus_amount: None,
                    recommended_category: context.recommended_category,
                    milestone: None,
                }
            }
            InterventionType::RewardBonus => InterventionOutcome {
                intervention_type,
                description: format!(
                    "Granted a {:.0}-unit motivation_bonus reward",
                    self.params.bonus_amount
                ),
                difficulty_delta: None,
                bonus_amount: Some(self.params.bonus_amount),
                recommended_category: None,
                milestone: None,
            },
            InterventionType::AchievementMilestone => {
                let milestone = context
                    .milestone
                    .clone()
                    .unwrap_or_else(|| "milestone".to_string());
                InterventionOutcome {
                    intervention_type,
                    description: format!("Unlocked milestone {milestone}"),
                    difficulty_delta: None,
                    bonus_amount: None,
                    recommended_category: None,
                    milestone: Some(milestone),
                }
            }
        }
    }
}
