#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::classify::backend::{ClassifierBackend, MODEL_INPUT_HEIGHT, MODEL_INPUT_WIDTH};

/// Tract-based backend for ONNX sign classification.
///
/// Loads a local model file once at startup and runs per-region inference.
/// No network I/O and no disk writes beyond model loading.
pub struct TractBackend {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>>,
}

impl TractBackend {
    /// Load an ONNX model from disk and fix its input to (1, 30, 30, 3).
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let model_path = model_path.as_ref();
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(
                        1,
                        MODEL_INPUT_HEIGHT as usize,
                        MODEL_INPUT_WIDTH as usize,
                        3
                    ),
                ),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self { model })
    }
}

impl ClassifierBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn predict(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        let expected_len = (MODEL_INPUT_WIDTH * MODEL_INPUT_HEIGHT * 3) as usize;
        if input.len() != expected_len {
            return Err(anyhow!(
                "expected {} tensor elements, received {}",
                expected_len,
                input.len()
            ));
        }

        let tensor = tract_ndarray::Array4::from_shape_vec(
            (
                1,
                MODEL_INPUT_HEIGHT as usize,
                MODEL_INPUT_WIDTH as usize,
                3,
            ),
            input.to_vec(),
        )
        .context("tensor shape mismatch")?
        .into_tensor();

        let outputs = self
            .model
            .run(tvec!(tensor.into()))
            .context("ONNX inference failed")?;
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let scores = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;

        Ok(scores.iter().copied().collect())
    }
}
