use crate::{number, state_number, state_or_input, ACTIVE_STEPS, ELEVATED_HR};
use async_trait::async_trait;
use fourtwo_core::{Block, BlockError, ExecutionContext, Stage};
use serde_json::json;

/// Single binary threshold on steps.
#[derive(Debug, Default)]
pub struct ThresholdBlock;

#[async_trait]
impl Block for ThresholdBlock {
    fn id(&self) -> &'static str {
        "reasoning.threshold"
    }

    fn stage(&self) -> Stage {
        Stage::Reasoning
    }

    fn label(&self) -> &'static str {
        "Threshold Reasoner"
    }

    fn description(&self) -> &'static str {
        "Simple rule-based activity classification"
    }

    async fn run(&self, ctx: &mut ExecutionContext) -> Result<(), BlockError> {
        let steps = state_or_input(ctx, "steps");
        let hr_avg = state_number(ctx, "heartRateAvg");

        let active_today = number(&steps) > ACTIVE_STEPS;
        let elevated_hr = number(&hr_avg) > ELEVATED_HR;
        let activity_level = if active_today { "high" } else { "low" };

        ctx.state.insert("activeToday".into(), json!(active_today));
        ctx.state.insert("elevatedHR".into(), json!(elevated_hr));
        ctx.state.insert("activityLevel".into(), json!(activity_level));

        ctx.push_log(
            "REASONING_THRESHOLD",
            json!({
                "action": "Applied threshold rules",
                "steps": steps,
                "hrAvg": hr_avg,
                "activeToday": active_today,
                "elevatedHR": elevated_hr,
                "activityLevel": activity_level,
            }),
        );
        Ok(())
    }
}

/// Multi-tier ladder: activity level plus a recommendation.
#[derive(Debug, Default)]
pub struct RuleClassifierBlock;

impl RuleClassifierBlock {
    /// `(activityLevel, recommendation)` for the given readings
    pub fn classify(steps: f64, hr_avg: f64) -> (&'static str, &'static str) {
        if steps > 10000.0 && hr_avg < 140.0 {
            ("excellent", "maintain")
        } else if steps > ACTIVE_STEPS && hr_avg < ELEVATED_HR {
            ("good", "maintain")
        } else if steps > 5000.0 {
            ("moderate", "increase")
        } else {
            ("low", "urgent_increase")
        }
    }
}

#[async_trait]
impl Block for RuleClassifierBlock {
    fn id(&self) -> &'static str {
        "reasoning.classifier"
    }

    fn stage(&self) -> Stage {
        Stage::Reasoning
    }

    fn label(&self) -> &'static str {
        "Rule-Based Classifier"
    }

    fn description(&self) -> &'static str {
        "Multi-factor activity classification"
    }

    async fn run(&self, ctx: &mut ExecutionContext) -> Result<(), BlockError> {
        let steps = state_or_input(ctx, "steps");
        let hr_avg = state_number(ctx, "heartRateAvg");
        let (steps_n, hr_n) = (number(&steps), number(&hr_avg));

        let (activity_level, recommendation) = Self::classify(steps_n, hr_n);

        ctx.state.insert("activeToday".into(), json!(steps_n > ACTIVE_STEPS));
        ctx.state.insert("elevatedHR".into(), json!(hr_n > ELEVATED_HR));
        ctx.state.insert("activityLevel".into(), json!(activity_level));
        ctx.state.insert("recommendation".into(), json!(recommendation));

        ctx.push_log(
            "REASONING_CLASSIFY",
            json!({
                "action": "Classified activity level",
                "steps": steps,
                "hrAvg": hr_avg,
                "activityLevel": activity_level,
                "recommendation": recommendation,
            }),
        );
        Ok(())
    }
}
