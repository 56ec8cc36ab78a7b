//! Clear-screen bring-up demo: backend → adapter → device → swap chain,
//! then one acquire/record/submit/present loop per frame.

use std::sync::Arc;

use ember_app::{App, AppConfig, LoadFlags};
use ember_rhi::{
    AdapterDesc, BackendDesc, BindRenderTargetsDesc, BindTargetDesc, ClearValue, CmdDesc,
    CmdPoolDesc, DeviceDesc, FenceDesc, ImageBarrierState, LoadActionType, QueueDesc,
    QueuePresentDesc, QueueSubmitDesc, RenderTargetBarrier, ResourceState, SemaphoreDesc,
    StoreActionType, SwapChainDesc, VulkanAdapter, VulkanBackend, VulkanCmd, VulkanCmdPool,
    VulkanDevice, VulkanFence, VulkanQueue, VulkanSemaphore, VulkanSwapChain,
};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use winit::window::Window;

const FRAME_COUNT: u32 = 3;

#[derive(Default)]
struct HelloTriangle {
    backend: Option<VulkanBackend>,
    adapter: Option<Arc<VulkanAdapter>>,
    device: Option<Arc<VulkanDevice>>,
    queue: Option<VulkanQueue>,
    swap_chain: Option<VulkanSwapChain>,
    cmd_pools: Vec<VulkanCmdPool>,
    cmds: Vec<VulkanCmd>,
    acquire_semaphores: Vec<VulkanSemaphore>,
    render_semaphores: Vec<VulkanSemaphore>,
    fences: Vec<VulkanFence>,
    frame_index: usize,
}

impl App for HelloTriangle {
    fn name(&self) -> &str {
        "hello_triangle"
    }

    fn init(&mut self, _window: &Window) -> bool {
        let backend = match VulkanBackend::create(&BackendDesc { app_name: self.name().to_string() }) {
            Ok(backend) => backend,
            Err(e) => {
                log::error!("backend creation failed: {e}");
                return false;
            }
        };
        let Some(adapter) = backend.request_adapter(&AdapterDesc::default()) else {
            return false;
        };
        let device = match adapter.request_device(&DeviceDesc::default()) {
            Ok(device) => device,
            Err(e) => {
                log::error!("device creation failed: {e}");
                return false;
            }
        };
        let queue = match device.request_queue(&QueueDesc::graphics()) {
            Ok(queue) => queue,
            Err(e) => {
                log::error!("queue request failed: {e}");
                return false;
            }
        };

        self.backend = Some(backend);
        self.adapter = Some(adapter);
        self.device = Some(device);
        self.queue = Some(queue);
        true
    }

    fn load(&mut self, _flags: LoadFlags, window: &Window) -> bool {
        let (Some(device), Some(queue)) = (self.device.as_ref(), self.queue.as_ref()) else {
            return false;
        };
        let (Ok(display_handle), Ok(window_handle)) = (window.display_handle(), window.window_handle())
        else {
            return false;
        };
        let size = window.inner_size();

        let swap_chain = match device.create_swap_chain(&SwapChainDesc {
            display_handle: display_handle.as_raw(),
            window_handle: window_handle.as_raw(),
            present_queue: queue,
            width: size.width,
            height: size.height,
            image_count: FRAME_COUNT,
            use_hdr: false,
            enable_vsync: true,
            color_clear_value: ClearValue::Color { r: 0.12, g: 0.12, b: 0.25, a: 1.0 },
        }) {
            Ok(swap_chain) => swap_chain,
            Err(e) => {
                log::error!("swap chain creation failed: {e}");
                return false;
            }
        };

        for i in 0..swap_chain.image_count() {
            let Ok(pool) = device.create_cmd_pool(&CmdPoolDesc {
                queue,
                transient: false,
                allow_individual_reset: false,
            }) else {
                return false;
            };
            let Ok(cmd) = device.create_cmd(&CmdDesc { pool: &pool, secondary: false }) else {
                return false;
            };
            let Ok(acquire) =
                device.create_semaphore(&SemaphoreDesc { name: format!("ImageAcquired[{i}]") })
            else {
                return false;
            };
            let Ok(render) =
                device.create_semaphore(&SemaphoreDesc { name: format!("RenderComplete[{i}]") })
            else {
                return false;
            };
            let Ok(fence) = device
                .create_fence(&FenceDesc { name: format!("FrameFence[{i}]"), signaled: false })
            else {
                return false;
            };
            self.cmd_pools.push(pool);
            self.cmds.push(cmd);
            self.acquire_semaphores.push(acquire);
            self.render_semaphores.push(render);
            self.fences.push(fence);
        }

        self.swap_chain = Some(swap_chain);
        self.frame_index = 0;
        true
    }

    fn unload(&mut self, _flags: LoadFlags) -> bool {
        if let Some(device) = self.device.as_ref() {
            device.wait_idle();
        }
        self.fences.clear();
        self.render_semaphores.clear();
        self.acquire_semaphores.clear();
        // Command buffers free back into their pools, so they go first.
        self.cmds.clear();
        self.cmd_pools.clear();
        self.swap_chain = None;
        true
    }

    fn update(&mut self, _delta_time: f32) -> bool {
        true
    }

    fn draw(&mut self) -> bool {
        let (Some(queue), Some(swap_chain)) = (self.queue.as_ref(), self.swap_chain.as_ref()) else {
            return false;
        };
        let frame = self.frame_index;

        self.fences[frame].wait();

        let Some(image_index) = swap_chain.acquire_next_image(&self.acquire_semaphores[frame]) else {
            // Out of date; the resize path rebuilds the swap chain.
            return true;
        };
        let Some(render_target) = swap_chain.render_target(image_index) else {
            return false;
        };

        let cmd = &self.cmds[frame];
        self.cmd_pools[frame].reset();
        cmd.begin();

        cmd.resource_barrier(
            &[],
            &[],
            &[RenderTargetBarrier {
                render_target,
                barrier: ImageBarrierState {
                    current_state: ResourceState::PRESENT,
                    new_state: ResourceState::RENDER_TARGET,
                    ..Default::default()
                },
                subresource_barrier: false,
                mip_level: 0,
                array_layer: 0,
            }],
        );

        cmd.bind_render_targets(&BindRenderTargetsDesc {
            color: vec![BindTargetDesc {
                render_target,
                load_action: LoadActionType::Clear,
                store_action: StoreActionType::Store,
                clear_value: None,
            }],
            depth_stencil: None,
        });
        let (width, height) = swap_chain.extent();
        cmd.set_viewport(0.0, 0.0, width as f32, height as f32, 0.0, 1.0);
        cmd.set_scissor(0, 0, width, height);
        // Close the pass before transitioning back for present.
        cmd.bind_render_targets(&BindRenderTargetsDesc::default());

        cmd.resource_barrier(
            &[],
            &[],
            &[RenderTargetBarrier {
                render_target,
                barrier: ImageBarrierState {
                    current_state: ResourceState::RENDER_TARGET,
                    new_state: ResourceState::PRESENT,
                    ..Default::default()
                },
                subresource_barrier: false,
                mip_level: 0,
                array_layer: 0,
            }],
        );
        cmd.end();

        queue.submit(&QueueSubmitDesc {
            cmds: vec![cmd],
            wait_semaphores: vec![&self.acquire_semaphores[frame]],
            signal_semaphores: vec![&self.render_semaphores[frame]],
            signal_fence: Some(&self.fences[frame]),
        });
        queue.present(&QueuePresentDesc {
            swap_chain,
            index: image_index,
            wait_semaphores: vec![&self.render_semaphores[frame]],
        });

        self.frame_index = (frame + 1) % self.cmds.len();
        true
    }

    fn exit(&mut self) {
        if let Some(device) = self.device.as_ref() {
            device.wait_idle();
        }
        self.queue = None;
        if let (Some(adapter), Some(device)) = (self.adapter.as_ref(), self.device.take()) {
            adapter.release_device(device);
        }
        if let (Some(backend), Some(adapter)) = (self.backend.as_ref(), self.adapter.take()) {
            backend.release_adapter(adapter);
        }
        self.backend = None;
    }
}

fn main() {
    env_logger::init();
    let config = AppConfig { title: "Ember — hello triangle".to_string(), width: 800, height: 600 };
    if let Err(e) = ember_app::run(HelloTriangle::default(), config) {
        log::error!("event loop error: {e}");
    }
}
