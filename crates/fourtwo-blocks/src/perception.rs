use crate::{heart_rate_samples, input_or_zero};
use async_trait::async_trait;
use fourtwo_core::{Block, BlockError, ExecutionContext, Stage};
use serde_json::{json, Value};

/// Copies the raw wearable fields into state verbatim.
#[derive(Debug, Default)]
pub struct ParseWearablesBlock;

#[async_trait]
impl Block for ParseWearablesBlock {
    fn id(&self) -> &'static str {
        "perception.parse"
    }

    fn stage(&self) -> Stage {
        Stage::Perception
    }

    fn label(&self) -> &'static str {
        "Parse Wearables"
    }

    fn description(&self) -> &'static str {
        "Extract raw sensor data from wearable device"
    }

    fn uses_memory(&self) -> bool {
        false
    }

    async fn run(&self, ctx: &mut ExecutionContext) -> Result<(), BlockError> {
        let steps = input_or_zero(ctx, "steps");
        let heart_rate = heart_rate_samples(ctx)?;
        let samples = heart_rate.len();

        ctx.state.insert("rawSteps".into(), steps.clone());
        ctx.state.insert("rawHeartRate".into(), Value::Array(heart_rate));

        ctx.push_log(
            "PERCEPTION_PARSE",
            json!({
                "action": "Parsed wearable data",
                "rawSteps": steps,
                "rawHeartRateSamples": samples,
            }),
        );
        Ok(())
    }
}

/// Same fields, but the heart-rate series is reduced to its rounded mean.
#[derive(Debug, Default)]
pub struct SmoothWearablesBlock;

#[async_trait]
impl Block for SmoothWearablesBlock {
    fn id(&self) -> &'static str {
        "perception.smooth"
    }

    fn stage(&self) -> Stage {
        Stage::Perception
    }

    fn label(&self) -> &'static str {
        "Smooth Wearables"
    }

    fn description(&self) -> &'static str {
        "Apply noise reduction to sensor readings"
    }

    fn uses_memory(&self) -> bool {
        false
    }

    async fn run(&self, ctx: &mut ExecutionContext) -> Result<(), BlockError> {
        let steps = input_or_zero(ctx, "steps");
        let samples = heart_rate_samples(ctx)?;

        let mut readings = Vec::with_capacity(samples.len());
        for (index, sample) in samples.iter().enumerate() {
            let bpm = sample.as_f64().ok_or_else(|| {
                BlockError::InvalidInput(format!("heartRate[{}] is not a number: {}", index, sample))
            })?;
            readings.push(bpm);
        }
        let average = mean_bpm(&readings);

        ctx.state.insert("steps".into(), steps.clone());
        ctx.state.insert("heartRateAvg".into(), json!(average));

        ctx.push_log(
            "PERCEPTION_SMOOTH",
            json!({
                "action": "Smoothed sensor data",
                "steps": steps,
                "heartRateAvg": average,
                "originalSamples": readings.len(),
            }),
        );
        Ok(())
    }
}

/// Rounded arithmetic mean, 0 for an empty series
fn mean_bpm(readings: &[f64]) -> i64 {
    if readings.is_empty() {
        return 0;
    }
    let sum: f64 = readings.iter().sum();
    (sum / readings.len() as f64).round() as i64
}
