//! Instance bring-up: layer/extension selection, debug messenger, adapter
//! enumeration and ranking.

use std::ffi::{c_void, CStr, CString};
use std::sync::Arc;

use ash::vk;

use crate::{AdapterDesc, AdapterType, BackendDesc, QueueType, RhiError, MAX_ADAPTERS_PER_BACKEND};

use super::adapter::VulkanAdapter;

/// Instance-level state shared by every object the backend produces. The
/// backend outlives its adapters through this handle.
pub(crate) struct InstanceShared {
    pub entry: ash::Entry,
    pub instance: ash::Instance,
    debug_messenger: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
}

impl InstanceShared {
    pub fn has_debug_utils(&self) -> bool {
        self.debug_messenger.is_some()
    }
}

impl Drop for InstanceShared {
    fn drop(&mut self) {
        unsafe {
            if let Some((loader, messenger)) = self.debug_messenger.take() {
                loader.destroy_debug_utils_messenger(messenger, None);
            }
            self.instance.destroy_instance(None);
        }
    }
}

impl std::fmt::Debug for InstanceShared {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceShared").finish_non_exhaustive()
    }
}

unsafe extern "system" fn debug_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    _types: vk::DebugUtilsMessageTypeFlagsEXT,
    callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user_data: *mut c_void,
) -> vk::Bool32 {
    let message = if callback_data.is_null() || (*callback_data).p_message.is_null() {
        std::borrow::Cow::Borrowed("<no message>")
    } else {
        CStr::from_ptr((*callback_data).p_message).to_string_lossy()
    };
    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        log::error!("[vulkan] {message}");
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        log::warn!("[vulkan] {message}");
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        log::info!("[vulkan] {message}");
    } else {
        log::debug!("[vulkan] {message}");
    }
    vk::FALSE
}

/// Returns validation layer names to enable if validation is requested
/// (feature or EMBER_VALIDATION=1).
#[cfg(feature = "validation")]
fn validation_layer_names() -> Vec<CString> {
    let disable =
        std::env::var("EMBER_VALIDATION").is_ok_and(|v| v == "0" || v.eq_ignore_ascii_case("false"));
    if disable {
        return vec![];
    }
    vec![CString::new("VK_LAYER_KHRONOS_validation").unwrap()]
}

#[cfg(not(feature = "validation"))]
fn validation_layer_names() -> Vec<CString> {
    if std::env::var("EMBER_VALIDATION").is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true")) {
        log::warn!("EMBER_VALIDATION=1 set but ember-rhi built without the 'validation' feature");
    }
    vec![]
}

/// Intersect wanted names with those reported available; missing wanted
/// entries are logged, never fatal.
fn intersect_names(available: &[CString], wanted: &[CString]) -> Vec<CString> {
    let mut ready = Vec::new();
    for want in wanted {
        if ready.contains(want) {
            continue;
        }
        if available.contains(want) {
            log::info!("{} enabled", want.to_string_lossy());
            ready.push(want.clone());
        } else {
            log::warn!("{} is not supported", want.to_string_lossy());
        }
    }
    ready
}

fn wanted_instance_extensions() -> Vec<CString> {
    let mut wanted: Vec<&CStr> = Vec::new();
    #[cfg(feature = "window")]
    {
        wanted.push(ash::khr::surface::NAME);
        wanted.push(ash::khr::get_surface_capabilities2::NAME);
        // HDR color spaces.
        wanted.push(ash::ext::swapchain_colorspace::NAME);
        // Platform surfaces; only those the loader reports survive the
        // intersection below.
        wanted.push(ash::khr::win32_surface::NAME);
        wanted.push(ash::khr::xlib_surface::NAME);
        wanted.push(ash::khr::xcb_surface::NAME);
        wanted.push(ash::khr::wayland_surface::NAME);
        wanted.push(ash::ext::metal_surface::NAME);
    }
    if cfg!(debug_assertions) || cfg!(feature = "validation") {
        wanted.push(ash::ext::debug_utils::NAME);
    }
    wanted.into_iter().map(CString::from).collect()
}

/// Entry object of the RHI: owns the instance, the debug messenger, and the
/// slot-pooled adapters, ranked best first.
pub struct VulkanBackend {
    shared: Arc<InstanceShared>,
    adapters: Vec<Arc<VulkanAdapter>>,
}

impl VulkanBackend {
    pub fn create(desc: &BackendDesc) -> Result<VulkanBackend, RhiError> {
        let entry = unsafe {
            ash::Entry::load().map_err(|e| RhiError::config(format!("Vulkan loader: {e}")))?
        };

        let available_layers: Vec<CString> = unsafe {
            entry
                .enumerate_instance_layer_properties()
                .map_err(|e| RhiError::resource(format!("vkEnumerateInstanceLayerProperties: {e:?}")))?
                .iter()
                .map(|p| CStr::from_ptr(p.layer_name.as_ptr()).to_owned())
                .collect()
        };
        let available_extensions: Vec<CString> = unsafe {
            entry
                .enumerate_instance_extension_properties(None)
                .map_err(|e| {
                    RhiError::resource(format!("vkEnumerateInstanceExtensionProperties: {e:?}"))
                })?
                .iter()
                .map(|p| CStr::from_ptr(p.extension_name.as_ptr()).to_owned())
                .collect()
        };

        let ready_layers = intersect_names(&available_layers, &validation_layer_names());
        let ready_extensions = intersect_names(&available_extensions, &wanted_instance_extensions());
        let layer_ptrs: Vec<*const i8> = ready_layers.iter().map(|c| c.as_ptr()).collect();
        let extension_ptrs: Vec<*const i8> = ready_extensions.iter().map(|c| c.as_ptr()).collect();
        let debug_utils_enabled =
            ready_extensions.iter().any(|e| e.as_c_str() == ash::ext::debug_utils::NAME);

        let app_name = CString::new(desc.app_name.as_str())
            .map_err(|_| RhiError::config("app name contains a NUL byte"))?;
        let engine_name = CString::new("Ember").unwrap();
        let app_info = vk::ApplicationInfo::default()
            .application_name(&app_name)
            .application_version(vk::make_api_version(0, 0, 1, 0))
            .engine_name(&engine_name)
            .engine_version(vk::make_api_version(0, 0, 1, 0))
            .api_version(vk::API_VERSION_1_2);
        let create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_layer_names(&layer_ptrs)
            .enabled_extension_names(&extension_ptrs);
        let instance = unsafe {
            entry
                .create_instance(&create_info, None)
                .map_err(|e| RhiError::resource(format!("vkCreateInstance: {e:?}")))?
        };

        let debug_messenger = if debug_utils_enabled {
            let loader = ash::ext::debug_utils::Instance::new(&entry, &instance);
            let messenger_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
                .message_severity(
                    vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                        | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                        | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                        | vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE,
                )
                .message_type(
                    vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                        | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                        | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
                )
                .pfn_user_callback(Some(debug_callback));
            match unsafe { loader.create_debug_utils_messenger(&messenger_info, None) } {
                Ok(messenger) => Some((loader, messenger)),
                Err(e) => {
                    log::warn!("vkCreateDebugUtilsMessengerEXT failed: {e:?}");
                    None
                }
            }
        } else {
            None
        };

        let shared = Arc::new(InstanceShared { entry, instance, debug_messenger });

        let physical_devices = unsafe {
            shared
                .instance
                .enumerate_physical_devices()
                .map_err(|e| RhiError::resource(format!("vkEnumeratePhysicalDevices: {e:?}")))?
        };
        if physical_devices.is_empty() {
            return Err(RhiError::config("no Vulkan physical device detected"));
        }

        let mut adapters: Vec<Arc<VulkanAdapter>> = physical_devices
            .into_iter()
            .take(MAX_ADAPTERS_PER_BACKEND)
            .enumerate()
            .map(|(i, handle)| Arc::new(VulkanAdapter::new(Arc::clone(&shared), handle, i as u8)))
            .collect();
        adapters.sort_by(|a, b| {
            if VulkanAdapter::is_better_gpu(a.as_ref(), b.as_ref()) {
                std::cmp::Ordering::Less
            } else {
                std::cmp::Ordering::Greater
            }
        });

        if !adapters[0].supports_queue(QueueType::Graphics) {
            return Err(RhiError::config("no adapter with a graphics-capable queue family"));
        }
        if adapters[0].adapter_type() == AdapterType::Cpu {
            return Err(RhiError::config("the only available adapter is a CPU implementation"));
        }

        Ok(VulkanBackend { shared, adapters })
    }

    /// First idle adapter, best ranked first; marks the slot busy.
    pub fn request_adapter(&self, _desc: &AdapterDesc) -> Option<Arc<VulkanAdapter>> {
        for adapter in &self.adapters {
            if adapter.idle_to_busy() {
                let settings = adapter.gpu_settings();
                log::info!(
                    "selected GPU[{}], name: {}, vendor id: {:#x}, model id: {:#x}, driver: {}",
                    adapter.node_index(),
                    settings.gpu_vendor_preset.gpu_name,
                    settings.gpu_vendor_preset.vendor_id,
                    settings.gpu_vendor_preset.model_id,
                    settings.gpu_vendor_preset.gpu_driver_version,
                );
                return Some(Arc::clone(adapter));
            }
        }
        log::error!("failed to find an idle adapter");
        None
    }

    /// Returns the adapter slot to the pool. Every device created from the
    /// adapter must have been released first.
    pub fn release_adapter(&self, adapter: Arc<VulkanAdapter>) {
        debug_assert_eq!(adapter.active_device_count(), 0, "adapter released with live devices");
        adapter.busy_to_idle();
    }

    pub(crate) fn shared(&self) -> &Arc<InstanceShared> {
        &self.shared
    }

    pub fn instance_handle(&self) -> vk::Instance {
        self.shared.instance.handle()
    }
}

impl std::fmt::Debug for VulkanBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanBackend").field("adapters", &self.adapters.len()).finish()
    }
}
