//! Restoring trained parameters from safetensors checkpoints.

use candle_core::{DType, Device, Tensor};
use candle_nn::{VarBuilder, VarMap};
use std::collections::HashMap;
use std::path::Path;

use crate::error::{NsynthError, Result};

/// A model that can be assembled from named parameters.
///
/// `Config` carries the architecture; the builder supplies the values.
pub trait FromVarBuilder: Sized {
    type Config;

    fn from_var_builder(config: &Self::Config, vb: VarBuilder) -> Result<Self>;
}

/// Restore a model for inference from the safetensors file at `path`,
/// placing every tensor on `device`.
///
/// Resuming training is not supported: `train == true` returns
/// [`NsynthError::TrainingResumeUnsupported`] without touching the file.
///
/// # Example
///
/// ```rust,ignore
/// let device = nsynth::parse_device("cpu")?;
/// let config = WavenetConfig::from_file("model/config.json")?;
/// let model: WavenetAutoEncoder =
///     load_model("model/model.safetensors", &device, &config, false)?;
/// ```
pub fn load_model<M, P>(path: P, device: &Device, config: &M::Config, train: bool) -> Result<M>
where
    M: FromVarBuilder,
    P: AsRef<Path>,
{
    if train {
        return Err(NsynthError::TrainingResumeUnsupported);
    }

    let path = path.as_ref();
    let weights = load_weights(path, device)?;
    tracing::info!(
        path = %path.display(),
        tensors = weights.len(),
        device = %crate::device_info(device),
        "restoring checkpoint"
    );

    let vb = VarBuilder::from_tensors(weights, DType::F32, device);
    M::from_var_builder(config, vb)
}

/// Read every tensor in a safetensors file onto `device`.
pub fn load_weights(path: &Path, device: &Device) -> Result<HashMap<String, Tensor>> {
    candle_core::safetensors::load(path, device).map_err(|source| NsynthError::Checkpoint {
        path: path.to_path_buf(),
        source,
    })
}

/// Write the parameters held by `varmap` as a safetensors checkpoint.
pub fn save_varmap<P: AsRef<Path>>(varmap: &VarMap, path: P) -> Result<()> {
    varmap.save(path)?;
    Ok(())
}
