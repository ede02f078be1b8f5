//! Browser surface of the viewer.
//!
//! `WebViewer` wraps an [`App`] for JavaScript. Events are handed to JS
//! listeners as plain objects (the JSON form of [`Event`](crate::Event)).

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

use crate::app::App;
use crate::config::{AppConfig, LogLevel};
use crate::events::EventType;
use crate::keyboard::{Key, KeyEvent};
use crate::layers::{LayerId, Point};
use crate::loader::NamedBuffer;
use crate::tools::Interaction;
use crate::uri;

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(LogLevel::default().to_level()).is_err() {
        web_sys::console::warn_1(&"medview: logger already initialised".into());
    }
}

/// Viewer controller exported to JavaScript.
///
/// Listeners run synchronously while the viewer handles a call; calling back
/// into the viewer from a listener is refused and logged.
#[wasm_bindgen]
pub struct WebViewer {
    app: Rc<RefCell<App>>,
}

fn js_error(message: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&message.to_string())
}

/// Download a URL into memory.
async fn fetch_bytes(url: &str) -> Result<Vec<u8>, JsValue> {
    let window = web_sys::window().ok_or_else(|| js_error("no window"))?;
    let response = wasm_bindgen_futures::JsFuture::from(window.fetch_with_str(url)).await?;
    let response: web_sys::Response = response.dyn_into()?;
    if !response.ok() {
        return Err(js_error(format!("HTTP {} for {}", response.status(), url)));
    }
    let buffer = wasm_bindgen_futures::JsFuture::from(response.array_buffer()?).await?;
    Ok(js_sys::Uint8Array::new(&buffer).to_vec())
}

#[wasm_bindgen]
impl WebViewer {
    /// Create a viewer from a JSON configuration, or from the configuration
    /// saved in localStorage (falling back to defaults) when none is given.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<WebViewer, JsValue> {
        let config = match config_json {
            Some(json) => AppConfig::from_json(&json).map_err(js_error)?,
            None => AppConfig::load_from_local_storage().unwrap_or_default(),
        };
        log::set_max_level(config.log_level.to_level_filter());
        Ok(WebViewer {
            app: Rc::new(RefCell::new(App::new(config))),
        })
    }

    fn with_app<R>(&self, f: impl FnOnce(&mut App) -> R) -> Option<R> {
        match self.app.try_borrow_mut() {
            Ok(mut app) => Some(f(&mut app)),
            Err(_) => {
                log::error!("WebViewer: re-entrant call from an event listener ignored");
                None
            }
        }
    }

    /// Load one in-memory file.
    #[wasm_bindgen(js_name = loadBuffer)]
    pub fn load_buffer(&self, name: String, data: &[u8]) {
        self.with_app(|app| app.load_image_object(vec![NamedBuffer::new(name, data.to_vec())]));
    }

    /// Fetch URLs, then load everything that could be downloaded as one session.
    #[wasm_bindgen(js_name = loadUrls)]
    pub fn load_urls(&self, urls: Vec<String>) {
        let app = Rc::clone(&self.app);
        wasm_bindgen_futures::spawn_local(async move {
            let mut buffers = Vec::with_capacity(urls.len());
            for (ordinal, url) in urls.iter().enumerate() {
                match fetch_bytes(url).await {
                    Ok(bytes) => {
                        buffers.push(NamedBuffer::new(url.clone(), bytes).at_position(ordinal as f64))
                    }
                    Err(e) => log::error!("WebViewer: cannot fetch {}: {:?}", url, e),
                }
            }
            match app.try_borrow_mut() {
                Ok(mut app) => app.load_image_object(buffers),
                Err(_) => log::error!("WebViewer: viewer busy, fetched data dropped"),
            };
        });
    }

    /// Load the URLs named by the `input` query of a page URI.
    #[wasm_bindgen(js_name = loadFromUri)]
    pub fn load_from_uri(&self, page_uri: &str) -> bool {
        let urls = uri::input_urls(page_uri);
        if urls.is_empty() {
            return false;
        }
        self.load_urls(urls);
        true
    }

    pub fn abort(&self) {
        self.with_app(|app| app.abort_load());
    }

    #[wasm_bindgen(js_name = setTool)]
    pub fn set_tool(&self, name: &str) -> bool {
        self.with_app(|app| app.set_tool(name)).unwrap_or(false)
    }

    #[wasm_bindgen(js_name = setDrawShape)]
    pub fn set_draw_shape(&self, shape: &str) -> bool {
        self.with_app(|app| app.set_draw_shape(shape)).unwrap_or(false)
    }

    pub fn undo(&self) -> bool {
        self.with_app(|app| app.undo()).unwrap_or(false)
    }

    pub fn redo(&self) -> bool {
        self.with_app(|app| app.redo()).unwrap_or(false)
    }

    #[wasm_bindgen(js_name = resetLayout)]
    pub fn reset_layout(&self) {
        self.with_app(|app| app.reset_layout());
    }

    #[wasm_bindgen(js_name = setContainerSize)]
    pub fn set_container_size(&self, width: f64, height: f64) {
        self.with_app(|app| app.set_container_size(width, height));
    }

    /// Subscribe a JS function to an event type ("loadstart", "drawcreate", ...).
    #[wasm_bindgen(js_name = addEventListener)]
    pub fn add_event_listener(&self, event_type: &str, callback: js_sys::Function) {
        let Ok(app) = self.app.try_borrow() else {
            log::error!("WebViewer: cannot add a listener from inside a listener");
            return;
        };
        app.add_event_listener(EventType::from_name(event_type), move |event| {
            let value = match event.to_json().map(|json| js_sys::JSON::parse(&json)) {
                Ok(Ok(value)) => value,
                Ok(Err(e)) => {
                    log::error!("WebViewer: cannot convert event: {:?}", e);
                    return;
                }
                Err(e) => {
                    log::error!("WebViewer: cannot serialize event: {}", e);
                    return;
                }
            };
            if let Err(e) = callback.call1(&JsValue::NULL, &value) {
                log::error!("WebViewer: listener failed: {:?}", e);
            }
        });
    }

    /// Store the viewer configuration in localStorage for the next session.
    #[wasm_bindgen(js_name = saveConfig)]
    pub fn save_config(&self) -> Result<(), JsValue> {
        let app = self.app.try_borrow().map_err(js_error)?;
        app.config().save_to_local_storage().map_err(js_error)
    }

    /// Current viewing state as JSON.
    #[wasm_bindgen(js_name = getState)]
    pub fn get_state(&self) -> Result<String, JsValue> {
        let app = self.app.try_borrow().map_err(js_error)?;
        app.get_state().map_err(js_error)
    }

    /// Pointer input on the layer of the selected tool.
    /// `kind` is one of "mousedown", "mousemove", "mouseup", "mouseout", "dblclick".
    #[wasm_bindgen(js_name = onPointer)]
    pub fn on_pointer(&self, kind: &str, x: f64, y: f64) -> bool {
        let point = Point::new(x, y);
        let interaction = match kind {
            "mousedown" => Interaction::MouseDown(point),
            "mousemove" => Interaction::MouseMove(point),
            "mouseup" => Interaction::MouseUp(point),
            "mouseout" => Interaction::MouseOut,
            "dblclick" => Interaction::DoubleClick(point),
            other => {
                log::warn!("WebViewer: unknown pointer event '{}'", other);
                return false;
            }
        };
        self.dispatch(interaction)
    }

    #[wasm_bindgen(js_name = onWheel)]
    pub fn on_wheel(&self, delta_y: f64, x: f64, y: f64) -> bool {
        self.dispatch(Interaction::Wheel {
            delta_y,
            point: Point::new(x, y),
        })
    }

    /// Key press: offered to the selected tool, then the default shortcuts run.
    #[wasm_bindgen(js_name = onKeydown)]
    pub fn on_keydown(&self, key: &str, ctrl: bool, shift: bool, alt: bool) {
        let event = KeyEvent {
            key: Key::from_name(key),
            ctrl,
            shift,
            alt,
        };
        self.with_app(|app| {
            let used = match Self::selected_layer(app) {
                Some(layer) => app.on_layer_interaction(layer, &Interaction::KeyDown(event.clone())),
                None => false,
            };
            if !used {
                app.on_keydown(&event);
            }
            app.default_on_keydown(&event);
        });
    }

    /// Advance playback by one step; call from an animation frame or timer.
    pub fn tick(&self) {
        self.with_app(|app| app.tick());
    }

    fn selected_layer(app: &App) -> Option<LayerId> {
        let toolbox = app.toolbox()?;
        toolbox.attachment_of(toolbox.selected()?)
    }

    fn dispatch(&self, interaction: Interaction) -> bool {
        self.with_app(|app| match Self::selected_layer(app) {
            Some(layer) => app.on_layer_interaction(layer, &interaction),
            None => false,
        })
        .unwrap_or(false)
    }
}
