//! Compute pipeline construction.

use std::sync::Arc;

use crate::RhiError;

use super::super::device::DeviceShared;
use super::{ComputePipelineDesc, VulkanPipeline};

// TODO: wire compute pipelines through the same cache path once a consumer
// lands; the descriptor plumbing is already in place.
pub(super) fn create_compute_pipeline(
    _device: &Arc<DeviceShared>,
    _desc: &ComputePipelineDesc<'_>,
) -> Result<VulkanPipeline, RhiError> {
    log::error!("compute pipelines are unsupported yet");
    Err(RhiError::config("compute pipelines are unsupported yet"))
}
