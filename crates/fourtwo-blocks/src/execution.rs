use crate::{number, state_flag, state_number};
use async_trait::async_trait;
use fourtwo_core::{Block, BlockError, ExecutionContext, Stage, TOOL_SEND_NOTIFICATION};
use serde_json::{json, Value};

const DEFAULT_MESSAGE: &str = "Keep up the good work!";

/// Delivers the planned message through the `sendNotification` tool.
///
/// A missing tool is an expected outcome, not a block error: the block logs
/// `EXECUTION_ERROR` and reports `success = false` itself.
#[derive(Debug, Default)]
pub struct SendNotificationBlock;

#[async_trait]
impl Block for SendNotificationBlock {
    fn id(&self) -> &'static str {
        "execution.notify"
    }

    fn stage(&self) -> Stage {
        Stage::Execution
    }

    fn label(&self) -> &'static str {
        "Send Notification"
    }

    fn description(&self) -> &'static str {
        "Deliver message to user"
    }

    fn tool_calls(&self) -> &'static [&'static str] {
        &[TOOL_SEND_NOTIFICATION]
    }

    async fn run(&self, ctx: &mut ExecutionContext) -> Result<(), BlockError> {
        let plan = ctx.state.get("plan").cloned().unwrap_or(Value::Null);
        let message = ctx
            .state
            .get("message")
            .filter(|v| !v.is_null())
            .cloned()
            .unwrap_or_else(|| json!(DEFAULT_MESSAGE));

        if !ctx.has_tool(TOOL_SEND_NOTIFICATION) {
            tracing::info!(run_id = %ctx.run_id, "notification tool unavailable");
            ctx.push_log(
                "EXECUTION_ERROR",
                json!({
                    "action": "Failed to send notification",
                    "error": format!("{} tool not available", TOOL_SEND_NOTIFICATION),
                }),
            );
            ctx.success = Some(false);
            return Ok(());
        }

        let result = ctx.call_tool(
            TOOL_SEND_NOTIFICATION,
            &json!({ "type": plan, "message": message }),
        )?;

        ctx.state.insert("notificationSent".into(), json!(true));
        ctx.state.insert("notificationType".into(), plan.clone());
        ctx.success = Some(true);

        ctx.push_log(
            "EXECUTION_NOTIFY",
            json!({
                "action": "Sent notification",
                "type": plan,
                "message": message,
                "result": result,
            }),
        );
        Ok(())
    }
}

/// Increments the streak on an active day, resets it otherwise.
#[derive(Debug, Default)]
pub struct UpdateStreakBlock;

#[async_trait]
impl Block for UpdateStreakBlock {
    fn id(&self) -> &'static str {
        "execution.streak"
    }

    fn stage(&self) -> Stage {
        Stage::Execution
    }

    fn label(&self) -> &'static str {
        "Update Streak"
    }

    fn description(&self) -> &'static str {
        "Update user progress and streak counter"
    }

    async fn run(&self, ctx: &mut ExecutionContext) -> Result<(), BlockError> {
        let active_today = state_flag(ctx, "activeToday");
        let current = number(&state_number(ctx, "currentStreak")) as i64;

        let (streak, verb) = if active_today {
            (current.saturating_add(1), "incremented")
        } else {
            (0, "reset")
        };

        ctx.state.insert("streak".into(), json!(streak));
        ctx.state.insert("streakUpdated".into(), json!(true));
        ctx.success = Some(true);

        ctx.push_log(
            "EXECUTION_STREAK",
            json!({
                "action": format!("Streak {}", verb),
                "activeToday": active_today,
                "previousStreak": current,
                "newStreak": streak,
            }),
        );
        Ok(())
    }
}
