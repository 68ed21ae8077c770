use anyhow::Result;

/// Model input width in pixels.
pub const MODEL_INPUT_WIDTH: u32 = 30;
/// Model input height in pixels.
pub const MODEL_INPUT_HEIGHT: u32 = 30;

/// Opaque classification model boundary.
///
/// Input is NHWC tensor data for shape (1, 30, 30, 3): RGB channel order,
/// f32 in `[0, 1]`, flattened row-major, batch dimension of one implied.
/// Output is the raw score vector, one score per sign class.
///
/// Implementations must not retain the input slice beyond the call and
/// must not perform network I/O during `predict`.
pub trait ClassifierBackend: Send {
    /// Backend identifier for logs.
    fn name(&self) -> &'static str;

    /// Run inference on one region's tensor data.
    fn predict(&mut self, input: &[f32]) -> Result<Vec<f32>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
