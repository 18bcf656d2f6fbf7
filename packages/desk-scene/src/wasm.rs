//! Browser embedding.
//!
//! [`mount_desk_scene`] creates the canvas and GPU surface asynchronously,
//! then mounts a [`SceneSession`] whose host is the page. The session lives in
//! a shared slot; every browser callback holds only a weak reference to it and
//! skips the event if the slot is gone or already borrowed.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{HtmlCanvasElement, HtmlElement};

use crate::config::SceneConfig;
use crate::gpu::surface::SurfaceBackend;
use crate::host::{FrameHandle, Host, HostEvent, IntervalHandle, ListenerHandle, ListenerKind};
use crate::input::{ContainerRect, PointerEvent};
use crate::render_loop::TimeSource;
use crate::session::{MountOptions, SceneSession};

type WebSession = SceneSession<WebHost, SurfaceBackend>;
type SessionSlot = Rc<RefCell<Option<WebSession>>>;

#[wasm_bindgen]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);
}

fn dispatch(slot: &Weak<RefCell<Option<WebSession>>>, event: HostEvent) {
    let Some(slot) = slot.upgrade() else {
        return;
    };
    let Ok(mut guard) = slot.try_borrow_mut() else {
        return;
    };
    if let Some(session) = guard.as_mut() {
        session.handle(event);
    }
}

// ============================================================================
// Time
// ============================================================================

struct PerformanceTime {
    performance: Option<web_sys::Performance>,
}

impl TimeSource for PerformanceTime {
    fn now_secs(&self) -> f64 {
        match &self.performance {
            Some(p) => p.now() / 1000.0,
            None => js_sys::Date::now() / 1000.0,
        }
    }
}

// ============================================================================
// Host
// ============================================================================

struct Listener {
    target: web_sys::EventTarget,
    event_type: &'static str,
    callback: Closure<dyn FnMut(web_sys::Event)>,
}

pub struct WebHost {
    window: web_sys::Window,
    container: HtmlElement,
    slot: Weak<RefCell<Option<WebSession>>>,
    frame_callback: Closure<dyn FnMut(f64)>,
    listeners: HashMap<ListenerHandle, Listener>,
    intervals: HashMap<IntervalHandle, (i32, Closure<dyn FnMut()>)>,
    overlay: Option<HtmlElement>,
    class_added: Option<String>,
    next_id: u64,
}

impl WebHost {
    fn new(window: web_sys::Window, container: HtmlElement, slot: Weak<RefCell<Option<WebSession>>>) -> Self {
        let frame_slot = slot.clone();
        let frame_callback = Closure::<dyn FnMut(f64)>::new(move |_timestamp: f64| {
            dispatch(&frame_slot, HostEvent::Frame);
        });
        let _ = container
            .style()
            .set_property("transition", "transform 0.3s ease");

        Self {
            window,
            container,
            slot,
            frame_callback,
            listeners: HashMap::new(),
            intervals: HashMap::new(),
            overlay: None,
            class_added: None,
            next_id: 0,
        }
    }

    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn listener_callback(&self, kind: ListenerKind) -> Closure<dyn FnMut(web_sys::Event)> {
        let slot = self.slot.clone();
        Closure::<dyn FnMut(web_sys::Event)>::new(move |event: web_sys::Event| {
            let host_event = match kind {
                ListenerKind::Resize => HostEvent::Resize,
                ListenerKind::PointerEnter => HostEvent::Pointer(PointerEvent::Enter),
                ListenerKind::PointerLeave => HostEvent::Pointer(PointerEvent::Leave),
                ListenerKind::DoubleClick => HostEvent::Pointer(PointerEvent::DoubleClick),
                ListenerKind::PointerMove => {
                    let Some(mouse) = event.dyn_ref::<web_sys::MouseEvent>() else {
                        return;
                    };
                    HostEvent::Pointer(PointerEvent::Move {
                        client_x: mouse.client_x() as f32,
                        client_y: mouse.client_y() as f32,
                    })
                }
            };
            dispatch(&slot, host_event);
        })
    }

    fn ensure_overlay(&mut self) -> Option<&HtmlElement> {
        if self.overlay.is_none() {
            let document = self.window.document()?;
            let overlay: HtmlElement = document.create_element("div").ok()?.dyn_into().ok()?;
            let style = overlay.style();
            for (name, value) in [
                ("position", "absolute"),
                ("top", "8px"),
                ("left", "8px"),
                ("padding", "6px 8px"),
                ("background", "rgba(0, 0, 0, 0.7)"),
                ("color", "#fff"),
                ("font", "12px monospace"),
                ("white-space", "pre"),
                ("pointer-events", "none"),
                ("border-radius", "4px"),
            ] {
                let _ = style.set_property(name, value);
            }
            self.container.append_child(&overlay).ok()?;
            self.overlay = Some(overlay);
        }
        self.overlay.as_ref()
    }
}

impl Host for WebHost {
    fn container(&self) -> Option<ContainerRect> {
        let rect = self.container.get_bounding_client_rect();
        Some(ContainerRect {
            left: rect.left() as f32,
            top: rect.top() as f32,
            width: rect.width() as f32,
            height: rect.height() as f32,
        })
    }

    fn device_pixel_ratio(&self) -> f32 {
        self.window.device_pixel_ratio() as f32
    }

    fn request_frame(&mut self) -> FrameHandle {
        match self
            .window
            .request_animation_frame(self.frame_callback.as_ref().unchecked_ref())
        {
            Ok(id) => FrameHandle(id as u64),
            Err(e) => {
                log::error!("requestAnimationFrame failed: {:?}", e);
                FrameHandle(0)
            }
        }
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        let _ = self.window.cancel_animation_frame(handle.0 as i32);
    }

    fn add_listener(&mut self, kind: ListenerKind) -> ListenerHandle {
        let handle = ListenerHandle(self.next());
        let (target, event_type): (web_sys::EventTarget, &'static str) = match kind {
            ListenerKind::Resize => (self.window.clone().into(), "resize"),
            ListenerKind::PointerMove => (self.container.clone().into(), "mousemove"),
            ListenerKind::PointerEnter => (self.container.clone().into(), "mouseenter"),
            ListenerKind::PointerLeave => (self.container.clone().into(), "mouseleave"),
            ListenerKind::DoubleClick => (self.container.clone().into(), "dblclick"),
        };
        let callback = self.listener_callback(kind);
        if let Err(e) = target.add_event_listener_with_callback(event_type, callback.as_ref().unchecked_ref()) {
            log::warn!("failed to add {} listener: {:?}", event_type, e);
        }
        self.listeners.insert(
            handle,
            Listener {
                target,
                event_type,
                callback,
            },
        );
        handle
    }

    fn remove_listener(&mut self, handle: ListenerHandle) {
        if let Some(listener) = self.listeners.remove(&handle) {
            let _ = listener
                .target
                .remove_event_listener_with_callback(listener.event_type, listener.callback.as_ref().unchecked_ref());
        }
    }

    fn start_interval(&mut self, period_ms: u32) -> IntervalHandle {
        let handle = IntervalHandle(self.next());
        let slot = self.slot.clone();
        let callback = Closure::<dyn FnMut()>::new(move || dispatch(&slot, HostEvent::IntervalTick));
        match self.window.set_interval_with_callback_and_timeout_and_arguments_0(
            callback.as_ref().unchecked_ref(),
            period_ms as i32,
        ) {
            Ok(id) => {
                self.intervals.insert(handle, (id, callback));
            }
            Err(e) => log::warn!("setInterval failed: {:?}", e),
        }
        handle
    }

    fn clear_interval(&mut self, handle: IntervalHandle) {
        if let Some((id, _callback)) = self.intervals.remove(&handle) {
            self.window.clear_interval_with_handle(id);
        }
    }

    fn set_container_scale(&mut self, scale: f32) {
        let _ = self
            .container
            .style()
            .set_property("transform", &format!("scale({})", scale));
    }

    fn present_debug(&mut self, lines: Option<Vec<String>>) {
        match lines {
            Some(lines) => {
                if let Some(overlay) = self.ensure_overlay() {
                    overlay.set_inner_text(&lines.join("\n"));
                }
            }
            None => {
                if let Some(overlay) = self.overlay.take() {
                    overlay.remove();
                }
            }
        }
    }

    fn set_style_class(&mut self, class: Option<&str>) {
        let classes = self.container.class_list();
        if let Some(previous) = self.class_added.take() {
            let _ = classes.remove_1(&previous);
        }
        if let Some(class) = class.filter(|c| !c.is_empty()) {
            if classes.add_1(class).is_ok() {
                self.class_added = Some(class.to_string());
            }
        }
    }
}

// ============================================================================
// Entry point
// ============================================================================

/// Handle returned to JavaScript. Call `unmount` when the container goes away.
#[wasm_bindgen]
pub struct DeskSceneHandle {
    slot: SessionSlot,
}

#[wasm_bindgen]
impl DeskSceneHandle {
    pub fn unmount(&self) {
        let session = match self.slot.try_borrow_mut() {
            Ok(mut slot) => slot.take(),
            Err(_) => {
                log::warn!("unmount called while the scene is busy");
                None
            }
        };
        if let Some(mut session) = session {
            session.unmount();
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.slot
            .try_borrow()
            .map(|slot| slot.as_ref().is_some_and(|s| s.is_loaded()))
            .unwrap_or(false)
    }

    /// `{"fps":..,"triangles":..}`
    pub fn debug_info(&self) -> String {
        self.slot
            .try_borrow()
            .ok()
            .and_then(|slot| slot.as_ref().map(|s| s.debug_info().to_json()))
            .unwrap_or_default()
    }
}

/// Mount the desk scene into `container`.
///
/// Resolves to a handle with nothing loaded when `container` is absent.
#[wasm_bindgen]
pub async fn mount_desk_scene(
    container: Option<HtmlElement>,
    class_name: Option<String>,
    config_json: Option<String>,
) -> Result<DeskSceneHandle, JsValue> {
    init_panic_hook();

    let slot: SessionSlot = Rc::new(RefCell::new(None));
    let Some(container) = container else {
        log::warn!("no container to mount the desk scene into");
        return Ok(DeskSceneHandle { slot });
    };

    let config = match config_json.as_deref() {
        Some(json) => SceneConfig::from_json(json).map_err(|e| JsValue::from_str(&e.to_string()))?,
        None => SceneConfig::default(),
    };

    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window.document().ok_or_else(|| JsValue::from_str("no document"))?;

    let device_pixel_ratio = config.device_pixel_ratio(window.device_pixel_ratio() as f32);
    let pixel_ratio = device_pixel_ratio.min(config.resize_pixel_ratio_ceiling);
    let rect = container.get_bounding_client_rect();
    let (width, height) = (rect.width().round() as u32, rect.height().round() as u32);

    let canvas: HtmlCanvasElement = document.create_element("canvas")?.dyn_into()?;
    let style = canvas.style();
    style.set_property("width", "100%")?;
    style.set_property("height", "100%")?;
    style.set_property("display", "block")?;
    container.append_child(&canvas)?;

    let instance = crate::gpu::create_instance();
    let backend = async {
        let surface = instance.create_surface(wgpu::SurfaceTarget::Canvas(canvas.clone()))?;
        SurfaceBackend::new(&instance, surface, width, height, pixel_ratio).await
    }
    .await;
    let backend = match backend {
        Ok(backend) => {
            let canvas = canvas.clone();
            backend.on_detach(move || canvas.remove())
        }
        Err(e) => {
            canvas.remove();
            return Err(JsValue::from_str(&e.to_string()));
        }
    };

    let options = MountOptions {
        class_name,
        config,
        seed_entropy: js_sys::Date::now() as u64,
    };
    let host = WebHost::new(window.clone(), container, Rc::downgrade(&slot));
    let time = PerformanceTime {
        performance: window.performance(),
    };

    let session = SceneSession::mount(host, options, move |_, _| Ok(backend), Rc::new(time)).map_err(|e| {
        canvas.remove();
        JsValue::from_str(&e.to_string())
    })?;
    *slot.borrow_mut() = session;

    Ok(DeskSceneHandle { slot })
}
