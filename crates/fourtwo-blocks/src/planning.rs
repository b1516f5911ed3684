use crate::{number, state_flag, state_number};
use async_trait::async_trait;
use fourtwo_core::{Block, BlockError, ExecutionContext, Stage};
use serde_json::{json, Value};

/// Above this average an elevated heart rate overrides the normal plan.
pub const SAFETY_OVERRIDE_HR: f64 = 160.0;

/// Maps the activity classification to a canned plan.
#[derive(Debug, Default)]
pub struct DailyPlannerBlock;

#[async_trait]
impl Block for DailyPlannerBlock {
    fn id(&self) -> &'static str {
        "planning.daily"
    }

    fn stage(&self) -> Stage {
        Stage::Planning
    }

    fn label(&self) -> &'static str {
        "Daily Goal Planner"
    }

    fn description(&self) -> &'static str {
        "Create action plan based on activity"
    }

    async fn run(&self, ctx: &mut ExecutionContext) -> Result<(), BlockError> {
        let active_today = state_flag(ctx, "activeToday");
        let activity_level = ctx
            .state
            .get("activityLevel")
            .and_then(Value::as_str)
            .unwrap_or("low")
            .to_string();

        let (plan, message) = if activity_level == "excellent" {
            ("congratulate", "Amazing work! You exceeded your goals!")
        } else if active_today {
            ("congratulate", "Great job hitting your step goal!")
        } else {
            ("nudge", "You can do it! Just a few more steps to reach your goal.")
        };

        ctx.state.insert("plan".into(), json!(plan));
        ctx.state.insert("message".into(), json!(message));

        ctx.push_log(
            "PLANNING_DAILY",
            json!({
                "action": "Created daily plan",
                "activeToday": active_today,
                "activityLevel": activity_level,
                "plan": plan,
                "message": message,
            }),
        );
        Ok(())
    }
}

/// Like the daily planner, with a safety branch that wins when the heart
/// rate is elevated.
#[derive(Debug, Default)]
pub struct SafetyPlannerBlock;

#[async_trait]
impl Block for SafetyPlannerBlock {
    fn id(&self) -> &'static str {
        "planning.safety"
    }

    fn stage(&self) -> Stage {
        Stage::Planning
    }

    fn label(&self) -> &'static str {
        "Safety Planner"
    }

    fn description(&self) -> &'static str {
        "Check health metrics before suggesting activity"
    }

    async fn run(&self, ctx: &mut ExecutionContext) -> Result<(), BlockError> {
        let elevated_hr = state_flag(ctx, "elevatedHR");
        let hr_avg = state_number(ctx, "heartRateAvg");
        let active_today = state_flag(ctx, "activeToday");

        let (plan, message, safety_warning) = if elevated_hr && number(&hr_avg) > SAFETY_OVERRIDE_HR {
            (
                "rest",
                "Your heart rate is elevated. Please rest and consult a doctor if this continues.",
                true,
            )
        } else if elevated_hr {
            (
                "light_activity",
                "Your heart rate is slightly elevated. Consider light activity only.",
                false,
            )
        } else if active_today {
            ("congratulate", "Great job! Your metrics look healthy.", false)
        } else {
            (
                "encourage",
                "Your health metrics are good - you can safely increase activity!",
                false,
            )
        };

        ctx.state.insert("plan".into(), json!(plan));
        ctx.state.insert("message".into(), json!(message));
        ctx.state.insert("safetyWarning".into(), json!(safety_warning));

        ctx.push_log(
            "PLANNING_SAFETY",
            json!({
                "action": "Checked safety constraints",
                "elevatedHR": elevated_hr,
                "hrAvg": hr_avg,
                "plan": plan,
                "message": message,
                "safetyWarning": safety_warning,
            }),
        );
        Ok(())
    }
}
