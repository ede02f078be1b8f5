//! Load lifecycle: turns loader events into data slots, layers and app events.

use std::path::PathBuf;

use web_time::Instant;

use super::App;
use crate::data::{MetaData, Volume};
use crate::events::{Event, ItemSummary};
use crate::loader::{ItemData, LoadEvent, LoadItem, LoadRequest, LoadType, NamedBuffer, Source, UrlOptions};
use crate::snapshot::AppState;
use crate::uri;

/// Where the application is in the load lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    /// `load` was received, `loadend` not yet.
    Completed,
    Errored,
    Aborted,
}

/// Bookkeeping of the running load, from `loadstart` to `loadend`.
#[derive(Debug, Clone)]
pub struct LoadSession {
    load_type: LoadType,
    sources: Vec<Source>,
    is_first_item: bool,
    simultaneous_limit: usize,
    started: Instant,
    items: usize,
}

impl LoadSession {
    fn new(load_type: LoadType, sources: Vec<Source>, simultaneous_limit: usize) -> Self {
        Self {
            load_type,
            sources,
            is_first_item: true,
            simultaneous_limit,
            started: Instant::now(),
            items: 0,
        }
    }

    pub fn load_type(&self) -> LoadType {
        self.load_type
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    /// True until the first item of the session has been processed.
    pub fn is_first_item(&self) -> bool {
        self.is_first_item
    }

    pub fn simultaneous_limit(&self) -> usize {
        self.simultaneous_limit
    }

    /// Items processed so far.
    pub fn items(&self) -> usize {
        self.items
    }
}

impl App {
    pub fn load_files(&mut self, paths: Vec<PathBuf>) {
        self.load(LoadRequest::Files(paths));
    }

    pub fn load_urls(&mut self, urls: Vec<String>, options: UrlOptions) {
        self.load(LoadRequest::Urls(urls, options));
    }

    /// Load in-memory buffers, e.g. files picked in a browser.
    pub fn load_image_object(&mut self, buffers: Vec<NamedBuffer>) {
        self.load(LoadRequest::Buffers(buffers));
    }

    /// Load the URLs named by the `input` query of a page URI.
    ///
    /// Returns false if the URI has nothing to load.
    pub fn load_from_uri(&mut self, page_uri: &str) -> bool {
        let urls = uri::input_urls(page_uri);
        if urls.is_empty() {
            log::debug!("App: no input in '{}'", page_uri);
            return false;
        }
        self.load_urls(urls, UrlOptions::default());
        true
    }

    /// Stop the running load. Already decoded items are still delivered.
    pub fn abort_load(&mut self) {
        self.loader.abort();
        self.process_pending();
    }

    fn load(&mut self, request: LoadRequest) {
        log::debug!("App: load {} source(s)", request.sources().len());
        self.loader.load(request);
        self.process_pending();
    }

    /// Drain the loader, handling each event to completion. Returns how many
    /// events were handled.
    pub fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Some(event) = self.loader.poll() {
            self.handle_load_event(event);
            handled += 1;
        }
        handled
    }

    pub fn is_loading(&self) -> bool {
        self.session.is_some() || self.loader.is_loading()
    }

    pub fn load_state(&self) -> LoadState {
        self.state
    }

    pub fn session(&self) -> Option<&LoadSession> {
        self.session.as_ref()
    }

    /// Handle one loader event. Events from loaders driven outside the app can
    /// be pushed in here directly.
    pub fn handle_load_event(&mut self, event: LoadEvent) {
        match event {
            LoadEvent::Start { load_type, sources } => self.on_load_start(load_type, sources),
            LoadEvent::Progress {
                load_type,
                source,
                loaded,
                total,
            } => self.bus.fire(&Event::LoadProgress {
                load_type,
                source,
                loaded,
                total,
            }),
            LoadEvent::Item(item) => self.on_load_item(item),
            LoadEvent::Load { load_type } => {
                self.state = LoadState::Completed;
                self.bus.fire(&Event::Load { load_type });
            }
            LoadEvent::End { load_type, sources } => self.on_load_end(load_type, sources),
            LoadEvent::Error {
                load_type,
                sources,
                error,
                target,
            } => {
                log::error!("App: load error: {}", error);
                self.state = LoadState::Errored;
                self.bus.fire(&Event::Error {
                    load_type,
                    sources,
                    error,
                    target,
                });
            }
            LoadEvent::Abort { load_type, sources } => {
                log::info!("App: load aborted");
                self.state = LoadState::Aborted;
                self.bus.fire(&Event::Abort { load_type, sources });
            }
        }
    }

    fn on_load_start(&mut self, load_type: LoadType, sources: Vec<Source>) {
        if let Some(previous) = &self.session {
            log::warn!(
                "App: loadstart while a {} load of {} source(s) is still open",
                previous.load_type,
                previous.sources.len()
            );
        }
        let limit = self.config.view.simultaneous_data;
        if load_type == LoadType::Image && self.data.len() >= limit {
            self.reset();
        }
        self.session = Some(LoadSession::new(load_type, sources.clone(), limit));
        self.state = LoadState::Loading;
        self.bus.fire(&Event::LoadStart { load_type, sources });
    }

    fn on_load_item(&mut self, item: LoadItem) {
        let LoadItem {
            source,
            load_type,
            data,
        } = item;
        match (load_type, data) {
            (Some(LoadType::Image), Some(ItemData::Image { image, meta })) => {
                self.on_image_item(source, image, meta)
            }
            (Some(LoadType::State), Some(ItemData::State(json))) => self.on_state_item(source, &json),
            (load_type, data) => {
                log::warn!(
                    "App: malformed item from {} (load type {:?}, data {})",
                    source,
                    load_type,
                    if data.is_some() { "mismatched" } else { "missing" }
                );
                self.bus.fire(&Event::LoadItem {
                    load_type,
                    source,
                    data: ItemSummary::Empty,
                });
            }
        }
    }

    fn on_image_item(&mut self, source: Source, image: Volume, meta: MetaData) {
        let is_first = match &self.session {
            Some(session) => session.is_first_item,
            None => {
                log::warn!("App: item from {} outside of a load session", source);
                self.data.is_empty()
            }
        };
        let summary = ItemSummary::Meta(meta.clone());

        let mut first_index = None;
        let mut inserted = None;
        if is_first {
            first_index = Some(self.data.add_new(image, meta));
        } else {
            match self.data.update_current(image, meta) {
                Ok(insertion) => inserted = Some(insertion),
                Err(err) => log::error!("App: cannot add {} to current data: {}", source, err),
            }
        }

        self.bus.fire(&Event::LoadItem {
            load_type: Some(LoadType::Image),
            source,
            data: summary,
        });

        if let Some(index) = first_index {
            self.bring_up_layers(index);
            if self.config.view.view_on_first_load_item {
                self.render();
            }
        } else if let Some(insertion) = inserted {
            self.notify_image_change();
            // Keep the viewed slice: every slice inserted at or before it pushes it down.
            if let Some(view) = self.layers.active_view_layer_mut() {
                let position = view.view().position();
                let k = insertion.shift(position.k);
                if k != position.k {
                    view.set_current_position(position.with_k(k), true);
                }
            }
        }

        self.item_done();
    }

    fn on_state_item(&mut self, source: Source, json: &str) {
        match AppState::from_json(json).and_then(|state| state.apply(self)) {
            Ok(()) => log::debug!("App: state from {} applied", source),
            Err(err) => log::error!("App: cannot apply state from {}: {}", source, err),
        }
        self.bus.fire(&Event::LoadItem {
            load_type: Some(LoadType::State),
            source,
            data: ItemSummary::State,
        });
        self.item_done();
    }

    fn item_done(&mut self) {
        if let Some(session) = &mut self.session {
            session.is_first_item = false;
            session.items += 1;
        }
    }

    fn on_load_end(&mut self, load_type: LoadType, sources: Vec<Source>) {
        match self.session.take() {
            Some(session) => log::info!(
                "App: {} load of {} source(s) ended after {:?}, {} item(s)",
                session.load_type,
                session.sources.len(),
                session.started.elapsed(),
                session.items
            ),
            None => log::warn!("App: loadend without loadstart"),
        }
        self.state = LoadState::Idle;
        self.bus.fire(&Event::LoadEnd { load_type, sources });
    }

    /// Tell every layer registered for the current slot that its image grew.
    fn notify_image_change(&mut self) {
        let Some(index) = self.data.current_index() else {
            return;
        };
        let Some(slot) = self.data.get(index) else {
            return;
        };
        for id in self.data.image_listeners(index) {
            self.layers.on_image_change(*id, &slot.image);
        }
    }

    /// Create the layers for a new data slot and wire them to the app.
    fn bring_up_layers(&mut self, index: usize) {
        let Some(slot) = self.data.get(index) else {
            return;
        };

        if self.layers.number_of_layers() == 0 {
            let view = self.layers.add_view_layer(index);
            if self.has_drawing_tool() {
                self.layers.add_draw_layer(index);
            }
            self.layers.initialise(&slot.image, &slot.meta, index);
            self.layers.bind_view_layer(view, &self.bus);
            self.layers.propagate_events(&self.bus);
            self.data.add_image_listener(index, view);
            self.initialise_toolbox();
        } else {
            if let Some(active) = self.layers.active_view_id() {
                self.layers.unbind_view_layer(active);
            }
            let view = self.layers.add_view_layer(index);
            self.layers.initialise_view_layer(view, &slot.image);
            self.layers.apply_group_transform(view);
            self.data.add_image_listener(index, view);
            self.layers.bind_view_layer(view, &self.bus);
            self.reattach_view_tool(view);
        }
    }
}
