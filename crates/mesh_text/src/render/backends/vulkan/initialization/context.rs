//! Vulkan context management
//!
//! Instance, physical device selection and logical device creation for a
//! Vulkan 1.3 device with `VK_EXT_mesh_shader` and dynamic rendering.

use std::ffi::{c_char, CStr, CString};

use ash::extensions::ext::{DebugUtils, MeshShader};
use ash::extensions::khr::{Surface, Swapchain as SwapchainLoader};
use ash::{vk, Device, Entry, Instance};

use super::window::Window;
use crate::render::{RenderError, RenderResult};

const VALIDATION_LAYER: &str = "VK_LAYER_KHRONOS_validation";

/// Vulkan instance wrapper with RAII cleanup
pub struct VulkanInstance {
    /// Vulkan entry point
    pub entry: Entry,
    /// Vulkan instance handle
    pub instance: Instance,
    debug: Option<(DebugUtils, vk::DebugUtilsMessengerEXT)>,
}

impl VulkanInstance {
    /// Create a Vulkan 1.3 instance with the extensions the window needs
    ///
    /// Validation is requested when `enable_validation` is set and the
    /// Khronos layer is installed; messages are routed to `log`.
    pub fn new(window: &Window, app_name: &str, enable_validation: bool) -> RenderResult<Self> {
        let entry = unsafe { Entry::load() }
            .map_err(|e| RenderError::InitializationFailed(format!("Failed to load Vulkan: {e}")))?;

        let app_name_cstr = to_cstring(app_name)?;
        let engine_name_cstr = to_cstring("mesh_text")?;
        let app_info = vk::ApplicationInfo::builder()
            .application_name(&app_name_cstr)
            .application_version(vk::make_api_version(0, 0, 1, 0))
            .engine_name(&engine_name_cstr)
            .engine_version(vk::make_api_version(0, 0, 1, 0))
            .api_version(vk::API_VERSION_1_3);

        let required_extensions = window.get_required_instance_extensions()?;
        let cstr_extensions = required_extensions
            .iter()
            .map(|ext| to_cstring(ext))
            .collect::<RenderResult<Vec<_>>>()?;
        let mut extensions: Vec<*const c_char> = cstr_extensions.iter().map(|ext| ext.as_ptr()).collect();

        let validation = enable_validation && Self::validation_layer_available(&entry);
        if enable_validation && !validation {
            log::warn!("{} not installed, continuing without validation", VALIDATION_LAYER);
        }

        let layer_names = if validation { vec![to_cstring(VALIDATION_LAYER)?] } else { Vec::new() };
        let layer_name_ptrs: Vec<*const c_char> = layer_names.iter().map(|name| name.as_ptr()).collect();
        if validation {
            extensions.push(DebugUtils::name().as_ptr());
        }

        let create_info = vk::InstanceCreateInfo::builder()
            .application_info(&app_info)
            .enabled_extension_names(&extensions)
            .enabled_layer_names(&layer_name_ptrs);

        let instance = unsafe { entry.create_instance(&create_info, None) }
            .map_err(RenderError::api("vkCreateInstance"))?;

        let debug = if validation {
            let debug_utils = DebugUtils::new(&entry, &instance);
            match Self::setup_debug_messenger(&debug_utils) {
                Ok(messenger) => Some((debug_utils, messenger)),
                Err(e) => {
                    unsafe { instance.destroy_instance(None) };
                    return Err(e);
                }
            }
        } else {
            None
        };

        log::info!("Created Vulkan 1.3 instance (validation: {})", validation);

        Ok(Self { entry, instance, debug })
    }

    fn validation_layer_available(entry: &Entry) -> bool {
        entry
            .enumerate_instance_layer_properties()
            .map(|layers| {
                layers.iter().any(|layer| {
                    let name = unsafe { CStr::from_ptr(layer.layer_name.as_ptr()) };
                    name.to_bytes() == VALIDATION_LAYER.as_bytes()
                })
            })
            .unwrap_or(false)
    }

    fn setup_debug_messenger(debug_utils: &DebugUtils) -> RenderResult<vk::DebugUtilsMessengerEXT> {
        let create_info = vk::DebugUtilsMessengerCreateInfoEXT::builder()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::WARNING | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(debug_callback));

        unsafe { debug_utils.create_debug_utils_messenger(&create_info, None) }
            .map_err(RenderError::api("vkCreateDebugUtilsMessengerEXT"))
    }
}

impl Drop for VulkanInstance {
    fn drop(&mut self) {
        unsafe {
            if let Some((debug_utils, messenger)) = &self.debug {
                debug_utils.destroy_debug_utils_messenger(*messenger, None);
            }
            self.instance.destroy_instance(None);
        }
    }
}

/// Debug callback for validation layers
unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    if callback_data.is_null() || (*callback_data).p_message.is_null() {
        return vk::FALSE;
    }
    let message = CStr::from_ptr((*callback_data).p_message).to_string_lossy();

    if message_severity >= vk::DebugUtilsMessageSeverityFlagsEXT::ERROR {
        log::error!("[Vulkan] {:?} - {}", message_type, message);
    } else if message_severity >= vk::DebugUtilsMessageSeverityFlagsEXT::WARNING {
        log::warn!("[Vulkan] {:?} - {}", message_type, message);
    } else {
        log::debug!("[Vulkan] {:?} - {}", message_type, message);
    }

    vk::FALSE
}

/// Device extensions every candidate must expose
fn required_device_extensions() -> [&'static CStr; 2] {
    [SwapchainLoader::name(), MeshShader::name()]
}

/// Ranking used to pick between suitable devices; higher wins
pub fn score_device(device_type: vk::PhysicalDeviceType, task_shader: bool) -> u32 {
    let mut score = 1;
    if device_type == vk::PhysicalDeviceType::DISCRETE_GPU {
        score += 1000;
    }
    if task_shader {
        score += 100;
    }
    score
}

/// Physical device selection and capabilities
pub struct PhysicalDeviceInfo {
    /// Vulkan physical device handle
    pub device: vk::PhysicalDevice,
    /// Device properties and limits
    pub properties: vk::PhysicalDeviceProperties,
    /// Memory heaps and types
    pub memory_properties: vk::PhysicalDeviceMemoryProperties,
    /// Index of the graphics queue family
    pub graphics_family: u32,
    /// Index of the presentation queue family
    pub present_family: u32,
    /// Whether task shaders are supported alongside mesh shaders
    pub task_shader: bool,
    /// Selection score
    pub score: u32,
}

impl PhysicalDeviceInfo {
    /// Select the highest scoring device that meets every requirement
    ///
    /// When no device qualifies, the reason the last candidate was rejected
    /// is returned.
    pub fn select_suitable_device(
        instance: &Instance,
        surface: vk::SurfaceKHR,
        surface_loader: &Surface,
    ) -> RenderResult<Self> {
        let devices = unsafe { instance.enumerate_physical_devices() }
            .map_err(RenderError::api("vkEnumeratePhysicalDevices"))?;

        let mut best: Option<Self> = None;
        let mut last_rejection = RenderError::InitializationFailed("No Vulkan devices found".to_string());

        for device in devices {
            match Self::evaluate_device(instance, device, surface, surface_loader) {
                Ok(candidate) => {
                    log::debug!("GPU candidate {} scored {}", candidate.name(), candidate.score);
                    if best.as_ref().map_or(true, |b| candidate.score > b.score) {
                        best = Some(candidate);
                    }
                }
                Err(e) => {
                    let properties = unsafe { instance.get_physical_device_properties(device) };
                    log::info!("Skipping GPU {}: {}", device_name(&properties), e);
                    last_rejection = e;
                }
            }
        }

        let selected = best.ok_or(last_rejection)?;
        log::info!(
            "Selected GPU: {} (task shaders: {})",
            selected.name(),
            selected.task_shader
        );
        Ok(selected)
    }

    fn evaluate_device(
        instance: &Instance,
        device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        surface_loader: &Surface,
    ) -> RenderResult<Self> {
        let properties = unsafe { instance.get_physical_device_properties(device) };
        if properties.api_version < vk::API_VERSION_1_3 {
            return Err(RenderError::MissingFeature("Vulkan 1.3"));
        }

        let extensions = unsafe { instance.enumerate_device_extension_properties(device) }
            .map_err(RenderError::api("vkEnumerateDeviceExtensionProperties"))?;
        for required in required_device_extensions() {
            let available = extensions.iter().any(|ext| {
                let name = unsafe { CStr::from_ptr(ext.extension_name.as_ptr()) };
                name == required
            });
            if !available {
                return Err(RenderError::MissingFeature(if required == MeshShader::name() {
                    "VK_EXT_mesh_shader"
                } else {
                    "VK_KHR_swapchain"
                }));
            }
        }

        let mut mesh_features = vk::PhysicalDeviceMeshShaderFeaturesEXT::default();
        let mut vulkan13_features = vk::PhysicalDeviceVulkan13Features::default();
        let mut features2 = vk::PhysicalDeviceFeatures2::builder()
            .push_next(&mut mesh_features)
            .push_next(&mut vulkan13_features);
        unsafe { instance.get_physical_device_features2(device, &mut features2) };

        if mesh_features.mesh_shader == vk::FALSE {
            return Err(RenderError::MissingFeature("meshShader"));
        }
        if vulkan13_features.dynamic_rendering == vk::FALSE {
            return Err(RenderError::MissingFeature("dynamicRendering"));
        }

        let queue_families = unsafe { instance.get_physical_device_queue_family_properties(device) };
        let mut graphics_family = None;
        let mut present_family = None;

        for (index, family) in queue_families.iter().enumerate() {
            let index = index as u32;

            if family.queue_flags.contains(vk::QueueFlags::GRAPHICS) && graphics_family.is_none() {
                graphics_family = Some(index);
            }

            let present_support = unsafe { surface_loader.get_physical_device_surface_support(device, index, surface) }
                .map_err(RenderError::api("vkGetPhysicalDeviceSurfaceSupportKHR"))?;

            // Prefer a family that does both
            if present_support && (present_family.is_none() || graphics_family == Some(index)) {
                present_family = Some(index);
            }
        }

        let graphics_family = graphics_family
            .ok_or_else(|| RenderError::InitializationFailed("No graphics queue family found".to_string()))?;
        let present_family = present_family
            .ok_or_else(|| RenderError::InitializationFailed("No present queue family found".to_string()))?;

        let task_shader = mesh_features.task_shader == vk::TRUE;
        let memory_properties = unsafe { instance.get_physical_device_memory_properties(device) };

        Ok(Self {
            device,
            properties,
            memory_properties,
            graphics_family,
            present_family,
            task_shader,
            score: score_device(properties.device_type, task_shader),
        })
    }

    /// Device name as reported by the driver
    pub fn name(&self) -> String {
        device_name(&self.properties)
    }
}

fn device_name(properties: &vk::PhysicalDeviceProperties) -> String {
    unsafe { CStr::from_ptr(properties.device_name.as_ptr()) }
        .to_string_lossy()
        .into_owned()
}

fn to_cstring(s: &str) -> RenderResult<CString> {
    CString::new(s).map_err(|e| RenderError::InitializationFailed(format!("Invalid name {s:?}: {e}")))
}

/// Logical device wrapper with RAII cleanup
pub struct LogicalDevice {
    /// Vulkan logical device handle
    pub device: Device,
    /// Graphics operations queue
    pub graphics_queue: vk::Queue,
    /// Surface presentation queue
    pub present_queue: vk::Queue,
    /// Swapchain extension loader
    pub swapchain_loader: SwapchainLoader,
    /// Mesh shader extension loader
    pub mesh_shader: MeshShader,
}

impl LogicalDevice {
    /// Create the logical device with mesh shaders and dynamic rendering enabled
    pub fn new(instance: &Instance, physical_device_info: &PhysicalDeviceInfo) -> RenderResult<Self> {
        let mut unique_families = vec![physical_device_info.graphics_family, physical_device_info.present_family];
        unique_families.dedup();

        let priorities = [1.0];
        let queue_infos: Vec<vk::DeviceQueueCreateInfo> = unique_families
            .iter()
            .map(|&family| {
                vk::DeviceQueueCreateInfo::builder()
                    .queue_family_index(family)
                    .queue_priorities(&priorities)
                    .build()
            })
            .collect();

        let extension_names = required_device_extensions().map(CStr::as_ptr);

        let mut mesh_features = vk::PhysicalDeviceMeshShaderFeaturesEXT::builder()
            .mesh_shader(true)
            .task_shader(physical_device_info.task_shader);
        let mut vulkan13_features = vk::PhysicalDeviceVulkan13Features::builder().dynamic_rendering(true);

        let create_info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(&queue_infos)
            .enabled_extension_names(&extension_names)
            .push_next(&mut mesh_features)
            .push_next(&mut vulkan13_features);

        let device = unsafe { instance.create_device(physical_device_info.device, &create_info, None) }
            .map_err(RenderError::api("vkCreateDevice"))?;

        let graphics_queue = unsafe { device.get_device_queue(physical_device_info.graphics_family, 0) };
        let present_queue = unsafe { device.get_device_queue(physical_device_info.present_family, 0) };

        let swapchain_loader = SwapchainLoader::new(instance, &device);
        let mesh_shader = MeshShader::new(instance, &device);

        Ok(Self {
            device,
            graphics_queue,
            present_queue,
            swapchain_loader,
            mesh_shader,
        })
    }
}

impl Drop for LogicalDevice {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();
            self.device.destroy_device(None);
        }
    }
}

/// Owns the instance, the window surface and the logical device
///
/// Fields drop in declaration order: the surface is destroyed explicitly in
/// [`Drop`], then the device, then the instance.
pub struct VulkanContext {
    surface: vk::SurfaceKHR,
    surface_loader: Surface,
    physical_device: PhysicalDeviceInfo,
    device: LogicalDevice,
    instance: VulkanInstance,
}

impl VulkanContext {
    /// Create instance, surface and device for the window
    pub fn new(window: &mut Window, app_name: &str, enable_validation: bool) -> RenderResult<Self> {
        let instance = VulkanInstance::new(window, app_name, enable_validation)?;

        let surface_loader = Surface::new(&instance.entry, &instance.instance);
        let surface = window.create_vulkan_surface(instance.instance.handle())?;

        let physical_device =
            match PhysicalDeviceInfo::select_suitable_device(&instance.instance, surface, &surface_loader) {
                Ok(info) => info,
                Err(e) => {
                    unsafe { surface_loader.destroy_surface(surface, None) };
                    return Err(e);
                }
            };

        let device = match LogicalDevice::new(&instance.instance, &physical_device) {
            Ok(device) => device,
            Err(e) => {
                unsafe { surface_loader.destroy_surface(surface, None) };
                return Err(e);
            }
        };

        Ok(Self {
            surface,
            surface_loader,
            physical_device,
            device,
            instance,
        })
    }

    /// Get a reference to the Vulkan instance
    pub fn instance(&self) -> &Instance {
        &self.instance.instance
    }

    /// Get the surface handle
    pub const fn surface(&self) -> vk::SurfaceKHR {
        self.surface
    }

    /// Get the surface loader
    pub const fn surface_loader(&self) -> &Surface {
        &self.surface_loader
    }

    /// Get the physical device info
    pub const fn physical_device(&self) -> &PhysicalDeviceInfo {
        &self.physical_device
    }

    /// Get the raw Device handle
    pub const fn device(&self) -> &Device {
        &self.device.device
    }

    /// Get the swapchain loader
    pub const fn swapchain_loader(&self) -> &SwapchainLoader {
        &self.device.swapchain_loader
    }

    /// Get the mesh shader loader
    pub const fn mesh_shader(&self) -> &MeshShader {
        &self.device.mesh_shader
    }

    /// Get the graphics queue
    pub const fn graphics_queue(&self) -> vk::Queue {
        self.device.graphics_queue
    }

    /// Get the present queue
    pub const fn present_queue(&self) -> vk::Queue {
        self.device.present_queue
    }

    /// Get the graphics queue family index
    pub const fn graphics_family(&self) -> u32 {
        self.physical_device.graphics_family
    }

    /// Get the present queue family index
    pub const fn present_family(&self) -> u32 {
        self.physical_device.present_family
    }

    /// Block until the device is idle
    pub fn wait_idle(&self) -> RenderResult<()> {
        unsafe { self.device.device.device_wait_idle() }.map_err(RenderError::api("vkDeviceWaitIdle"))
    }
}

impl Drop for VulkanContext {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device.device_wait_idle();
            self.surface_loader.destroy_surface(self.surface, None);
        }
    }
}
