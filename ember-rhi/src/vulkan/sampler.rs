//! Samplers, including the Y′CbCr conversion object multi-planar formats
//! sample through.

use std::sync::Arc;

use ash::vk;

use crate::{CompareMode, MipMapMode, RhiError, SampleLocation, SamplerDesc, SamplerModelConversion, SamplerRange};

use super::convert;
use super::device::DeviceShared;

pub struct VulkanSampler {
    device: Arc<DeviceShared>,
    handle: vk::Sampler,
    ycbcr_conversion: vk::SamplerYcbcrConversion,
}

impl VulkanSampler {
    pub(crate) fn create(device: &Arc<DeviceShared>, desc: &SamplerDesc) -> Result<VulkanSampler, RhiError> {
        // Lod range defaults derive from the mipmap mode unless overridden.
        let (min_lod, max_lod) = desc.lod_range.unwrap_or((
            0.0,
            if desc.mipmap_mode == MipMapMode::Linear { vk::LOD_CLAMP_NONE } else { 0.0 },
        ));

        let mut create_info = vk::SamplerCreateInfo::default()
            .mag_filter(convert::to_vk_filter(desc.mag_filter))
            .min_filter(convert::to_vk_filter(desc.min_filter))
            .mipmap_mode(convert::to_vk_mipmap_mode(desc.mipmap_mode))
            .address_mode_u(convert::to_vk_address_mode(desc.address_u))
            .address_mode_v(convert::to_vk_address_mode(desc.address_v))
            .address_mode_w(convert::to_vk_address_mode(desc.address_w))
            .mip_lod_bias(desc.mip_lod_bias)
            .anisotropy_enable(desc.max_anisotropy > 0.0)
            .max_anisotropy(desc.max_anisotropy)
            .compare_enable(desc.compare_func != CompareMode::Never)
            .compare_op(convert::to_vk_compare_op(desc.compare_func))
            .min_lod(min_lod)
            .max_lod(max_lod)
            .border_color(vk::BorderColor::FLOAT_TRANSPARENT_BLACK)
            .unnormalized_coordinates(false);

        let mut ycbcr_conversion = vk::SamplerYcbcrConversion::null();
        let mut conversion_info = vk::SamplerYcbcrConversionInfo::default();
        if desc.conversion.format.is_planar() {
            let conversion_create = vk::SamplerYcbcrConversionCreateInfo::default()
                .format(convert::to_vk_format(desc.conversion.format))
                .ycbcr_model(to_vk_ycbcr_model(desc.conversion.model))
                .ycbcr_range(to_vk_ycbcr_range(desc.conversion.range))
                .components(vk::ComponentMapping::default())
                .x_chroma_offset(to_vk_chroma_location(desc.conversion.chroma_offset_x))
                .y_chroma_offset(to_vk_chroma_location(desc.conversion.chroma_offset_y))
                .chroma_filter(convert::to_vk_filter(desc.conversion.chroma_filter))
                .force_explicit_reconstruction(desc.conversion.force_explicit_reconstruction);
            ycbcr_conversion = unsafe {
                device
                    .device
                    .create_sampler_ycbcr_conversion(&conversion_create, None)
                    .map_err(|e| RhiError::resource(format!("vkCreateSamplerYcbcrConversion: {e:?}")))?
            };
            conversion_info = conversion_info.conversion(ycbcr_conversion);
            create_info = create_info.push_next(&mut conversion_info);
        }

        let handle = unsafe {
            match device.device.create_sampler(&create_info, None) {
                Ok(handle) => handle,
                Err(e) => {
                    if ycbcr_conversion != vk::SamplerYcbcrConversion::null() {
                        device.device.destroy_sampler_ycbcr_conversion(ycbcr_conversion, None);
                    }
                    return Err(RhiError::resource(format!("vkCreateSampler: {e:?}")));
                }
            }
        };

        Ok(VulkanSampler { device: Arc::clone(device), handle, ycbcr_conversion })
    }

    pub fn handle(&self) -> vk::Sampler {
        self.handle
    }

    pub fn has_ycbcr_conversion(&self) -> bool {
        self.ycbcr_conversion != vk::SamplerYcbcrConversion::null()
    }
}

fn to_vk_ycbcr_model(model: SamplerModelConversion) -> vk::SamplerYcbcrModelConversion {
    match model {
        SamplerModelConversion::RgbIdentity => vk::SamplerYcbcrModelConversion::RGB_IDENTITY,
        SamplerModelConversion::YcbcrIdentity => vk::SamplerYcbcrModelConversion::YCBCR_IDENTITY,
        SamplerModelConversion::Ycbcr709 => vk::SamplerYcbcrModelConversion::YCBCR_709,
        SamplerModelConversion::Ycbcr601 => vk::SamplerYcbcrModelConversion::YCBCR_601,
        SamplerModelConversion::Ycbcr2020 => vk::SamplerYcbcrModelConversion::YCBCR_2020,
    }
}

fn to_vk_ycbcr_range(range: SamplerRange) -> vk::SamplerYcbcrRange {
    match range {
        SamplerRange::Full => vk::SamplerYcbcrRange::ITU_FULL,
        SamplerRange::Narrow => vk::SamplerYcbcrRange::ITU_NARROW,
    }
}

fn to_vk_chroma_location(location: SampleLocation) -> vk::ChromaLocation {
    match location {
        SampleLocation::Cosited => vk::ChromaLocation::COSITED_EVEN,
        SampleLocation::Midpoint => vk::ChromaLocation::MIDPOINT,
    }
}

impl Drop for VulkanSampler {
    fn drop(&mut self) {
        unsafe {
            self.device.device.destroy_sampler(self.handle, None);
            if self.ycbcr_conversion != vk::SamplerYcbcrConversion::null() {
                self.device.device.destroy_sampler_ycbcr_conversion(self.ycbcr_conversion, None);
            }
        }
    }
}

impl std::fmt::Debug for VulkanSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanSampler").finish()
    }
}
