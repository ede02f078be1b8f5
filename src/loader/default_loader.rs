//! Queue-driven loader reading files, URLs and in-memory buffers.

use std::collections::VecDeque;
use std::path::PathBuf;

use super::decoder::DecoderRegistry;
use super::error::LoadError;
use super::fetch::Fetch;
use super::{
    DEFAULT_BATCH_SIZE, ItemData, LoadEvent, LoadItem, LoadRequest, LoadType, Loader, Source,
};
use crate::data::{Slice, Volume};

/// Metadata key holding the slice position along the stacking axis.
const SLICE_LOCATION_KEY: &str = "SliceLocation";

/// A source waiting to be read and decoded.
enum Pending {
    File(PathBuf),
    Url {
        url: String,
        headers: Vec<(String, String)>,
    },
    Buffer {
        name: String,
        data: Vec<u8>,
        position: Option<f64>,
    },
}

impl Pending {
    fn source(&self) -> Source {
        match self {
            Pending::File(path) => Source::File(path.clone()),
            Pending::Url { url, .. } => Source::Url(url.clone()),
            Pending::Buffer { name, .. } => Source::Buffer { name: name.clone() },
        }
    }
}

struct Session {
    load_type: LoadType,
    sources: Vec<Source>,
    batch_size: usize,
    /// Ordinal of the next source to decode.
    next_ordinal: usize,
    had_error: bool,
}

/// Default [`Loader`]: decodes pending sources in batches on each `poll`.
///
/// A request with a single `.json` source is loaded as a state; anything else
/// is decoded as image data with the [`DecoderRegistry`]. A failing source
/// produces an `error` event and the session continues with the next one; a
/// session that saw an error or was aborted does not report `load`.
pub struct DefaultLoader {
    decoders: DecoderRegistry,
    fetcher: Option<Box<dyn Fetch>>,
    pending: VecDeque<Pending>,
    events: VecDeque<LoadEvent>,
    session: Option<Session>,
}

impl DefaultLoader {
    pub fn new() -> Self {
        #[cfg(not(target_arch = "wasm32"))]
        let fetcher: Option<Box<dyn Fetch>> = Some(Box::new(super::fetch::HttpFetcher));
        #[cfg(target_arch = "wasm32")]
        let fetcher: Option<Box<dyn Fetch>> = None;

        Self {
            decoders: DecoderRegistry::new(),
            fetcher,
            pending: VecDeque::new(),
            events: VecDeque::new(),
            session: None,
        }
    }

    pub fn with_fetcher(mut self, fetcher: Box<dyn Fetch>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn decoders(&self) -> &DecoderRegistry {
        &self.decoders
    }

    fn detect_load_type(sources: &[Source]) -> LoadType {
        match sources {
            [single] if single.name().to_lowercase().ends_with(".json") => LoadType::State,
            _ => LoadType::Image,
        }
    }

    fn read(&self, pending: Pending) -> Result<(Vec<u8>, Option<f64>), LoadError> {
        match pending {
            Pending::File(path) => std::fs::read(&path)
                .map(|data| (data, None))
                .map_err(|e| LoadError::io(path, e)),
            Pending::Url { url, headers } => {
                let fetcher = self
                    .fetcher
                    .as_ref()
                    .ok_or_else(|| LoadError::NoFetcher(url.clone()))?;
                fetcher.fetch(&url, &headers).map(|data| (data, None))
            }
            Pending::Buffer { data, position, .. } => Ok((data, position)),
        }
    }

    fn decode(
        &self,
        load_type: LoadType,
        source: &Source,
        data: Vec<u8>,
        position: f64,
    ) -> Result<ItemData, LoadError> {
        match load_type {
            LoadType::State => Ok(ItemData::State(String::from_utf8(data)?)),
            LoadType::Image => {
                let name = source.name();
                let decoded = self.decoders.decode(&data, Some(&name))?;
                let position = decoded.meta.get_f64(SLICE_LOCATION_KEY).unwrap_or(position);
                let image = Volume::from_slice(Slice::new(position, decoded.pixels));
                Ok(ItemData::Image {
                    image,
                    meta: decoded.meta,
                })
            }
        }
    }

    /// Read and decode up to one batch of pending sources.
    fn process_batch(&mut self) {
        let Some(session) = &self.session else {
            return;
        };
        let load_type = session.load_type;
        let sources = session.sources.clone();
        let batch_size = session.batch_size.max(1);

        for _ in 0..batch_size {
            let Some(pending) = self.pending.pop_front() else {
                break;
            };
            let source = pending.source();
            let ordinal = self.session.as_ref().map_or(0, |s| s.next_ordinal);
            if let Some(session) = &mut self.session {
                session.next_ordinal += 1;
            }

            let result = self.read(pending).and_then(|(data, position)| {
                self.decode(load_type, &source, data, position.unwrap_or(ordinal as f64))
            });
            match result {
                Ok(data) => {
                    self.events.push_back(LoadEvent::Progress {
                        load_type,
                        source: source.clone(),
                        loaded: 100,
                        total: 100,
                    });
                    self.events.push_back(LoadEvent::Item(LoadItem {
                        source,
                        load_type: Some(load_type),
                        data: Some(data),
                    }));
                }
                Err(err) => {
                    log::error!("DefaultLoader: {}", err);
                    if let Some(session) = &mut self.session {
                        session.had_error = true;
                    }
                    self.events.push_back(LoadEvent::Error {
                        load_type,
                        sources: sources.clone(),
                        error: err.to_string(),
                        target: Some(source),
                    });
                }
            }
        }
    }

    fn finish(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        if !session.had_error {
            self.events.push_back(LoadEvent::Load {
                load_type: session.load_type,
            });
        }
        self.events.push_back(LoadEvent::End {
            load_type: session.load_type,
            sources: session.sources,
        });
    }
}

impl Default for DefaultLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl Loader for DefaultLoader {
    fn load(&mut self, request: LoadRequest) {
        if self.session.is_some() {
            log::warn!("DefaultLoader: new load while loading, aborting the running one");
            self.abort();
        }

        let sources = request.sources();
        let load_type = Self::detect_load_type(&sources);
        let batch_size = match &request {
            LoadRequest::Urls(_, options) => options.batch_size,
            _ => DEFAULT_BATCH_SIZE,
        };
        log::debug!(
            "DefaultLoader: {} load of {} source(s)",
            load_type,
            sources.len()
        );

        self.events.push_back(LoadEvent::Start {
            load_type,
            sources: sources.clone(),
        });

        if request.is_empty() {
            self.events.push_back(LoadEvent::Error {
                load_type,
                sources: sources.clone(),
                error: LoadError::NoSources.to_string(),
                target: None,
            });
            self.events.push_back(LoadEvent::End { load_type, sources });
            return;
        }

        match request {
            LoadRequest::Files(paths) => self.pending.extend(paths.into_iter().map(Pending::File)),
            LoadRequest::Urls(urls, options) => {
                self.pending.extend(urls.into_iter().map(|url| Pending::Url {
                    url,
                    headers: options.request_headers.clone(),
                }))
            }
            LoadRequest::Buffers(buffers) => {
                self.pending
                    .extend(buffers.into_iter().map(|b| Pending::Buffer {
                        name: b.name,
                        data: b.data,
                        position: b.position,
                    }))
            }
        }

        self.session = Some(Session {
            load_type,
            sources,
            batch_size,
            next_ordinal: 0,
            had_error: false,
        });
    }

    fn abort(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        log::info!(
            "DefaultLoader: abort with {} source(s) left",
            self.pending.len()
        );
        self.pending.clear();
        self.events.push_back(LoadEvent::Abort {
            load_type: session.load_type,
            sources: session.sources.clone(),
        });
        self.events.push_back(LoadEvent::End {
            load_type: session.load_type,
            sources: session.sources,
        });
    }

    fn poll(&mut self) -> Option<LoadEvent> {
        if self.events.is_empty() && self.session.is_some() {
            if self.pending.is_empty() {
                self.finish();
            } else {
                self.process_batch();
            }
        }
        self.events.pop_front()
    }

    fn is_loading(&self) -> bool {
        self.session.is_some() || !self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::NamedBuffer;
    use ndarray::Array2;
    use ndarray_npy::WriteNpyExt;

    fn npy(rows: usize, columns: usize) -> Vec<u8> {
        let mut bytes = Vec::new();
        Array2::<f32>::zeros((rows, columns))
            .write_npy(&mut bytes)
            .unwrap();
        bytes
    }

    fn drain(loader: &mut DefaultLoader) -> Vec<LoadEvent> {
        std::iter::from_fn(|| loader.poll()).collect()
    }

    fn kinds(events: &[LoadEvent]) -> Vec<&'static str> {
        events
            .iter()
            .map(|e| match e {
                LoadEvent::Start { .. } => "start",
                LoadEvent::Progress { .. } => "progress",
                LoadEvent::Item(_) => "item",
                LoadEvent::Load { .. } => "load",
                LoadEvent::End { .. } => "end",
                LoadEvent::Error { .. } => "error",
                LoadEvent::Abort { .. } => "abort",
            })
            .collect()
    }

    /// Serves fixed bytes for every URL.
    struct StaticFetcher(Vec<u8>);

    impl Fetch for StaticFetcher {
        fn fetch(&self, _url: &str, _headers: &[(String, String)]) -> Result<Vec<u8>, LoadError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_buffers_produce_full_lifecycle() {
        let mut loader = DefaultLoader::new();
        loader.load(LoadRequest::Buffers(vec![
            NamedBuffer::new("a.npy", npy(2, 2)),
            NamedBuffer::new("b.npy", npy(2, 2)),
        ]));
        assert!(loader.is_loading());

        let events = drain(&mut loader);
        assert_eq!(
            kinds(&events),
            vec!["start", "progress", "item", "progress", "item", "load", "end"]
        );
        assert!(!loader.is_loading());
    }

    #[test]
    fn test_position_defaults_to_ordinal() {
        let mut loader = DefaultLoader::new();
        loader.load(LoadRequest::Buffers(vec![
            NamedBuffer::new("a.npy", npy(2, 2)),
            NamedBuffer::new("b.npy", npy(2, 2)).at_position(-4.0),
            NamedBuffer::new("c.npy", npy(2, 2)),
        ]));
        let positions: Vec<f64> = drain(&mut loader)
            .into_iter()
            .filter_map(|e| match e {
                LoadEvent::Item(LoadItem {
                    data: Some(ItemData::Image { image, .. }),
                    ..
                }) => Some(image.slices()[0].position),
                _ => None,
            })
            .collect();
        assert_eq!(positions, vec![0.0, -4.0, 2.0]);
    }

    #[test]
    fn test_decode_error_skips_load_event() {
        let mut loader = DefaultLoader::new();
        loader.load(LoadRequest::Buffers(vec![
            NamedBuffer::new("a.npy", npy(2, 2)),
            NamedBuffer::new("broken.npy", b"garbage".to_vec()),
        ]));
        let events = drain(&mut loader);
        assert_eq!(
            kinds(&events),
            vec!["start", "progress", "item", "error", "end"]
        );
        match &events[3] {
            LoadEvent::Error { target, .. } => assert_eq!(
                target,
                &Some(Source::Buffer {
                    name: "broken.npy".to_string()
                })
            ),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_abort_delivers_queued_items_first() {
        let mut loader = DefaultLoader::new();
        let buffers = (0..5)
            .map(|i| NamedBuffer::new(format!("{}.npy", i), npy(2, 2)))
            .collect();
        loader.load(LoadRequest::Buffers(buffers));
        // Start, then the first batch is decoded on the next poll.
        assert!(matches!(loader.poll(), Some(LoadEvent::Start { .. })));
        assert!(matches!(loader.poll(), Some(LoadEvent::Progress { .. })));
        loader.abort();

        let rest = drain(&mut loader);
        let kinds = kinds(&rest);
        assert_eq!(kinds.first(), Some(&"item"));
        assert_eq!(&kinds[kinds.len() - 2..], &["abort", "end"]);
        assert!(!kinds.contains(&"load"));
    }

    #[test]
    fn test_url_batches() {
        let mut loader = DefaultLoader::new().with_fetcher(Box::new(StaticFetcher(npy(3, 3))));
        let urls = (0..3).map(|i| format!("http://host/{}.npy", i)).collect();
        loader.load(LoadRequest::Urls(
            urls,
            crate::loader::UrlOptions {
                request_headers: vec![],
                batch_size: 1,
            },
        ));
        assert!(matches!(loader.poll(), Some(LoadEvent::Start { .. })));
        // One source per batch: progress + item.
        assert!(matches!(loader.poll(), Some(LoadEvent::Progress { .. })));
        assert!(matches!(loader.poll(), Some(LoadEvent::Item(_))));
        assert_eq!(loader.pending.len(), 2);
    }

    #[test]
    fn test_single_json_is_state_load() {
        let mut loader = DefaultLoader::new();
        loader.load(LoadRequest::Buffers(vec![NamedBuffer::new(
            "state.json",
            br#"{"version":"0.1"}"#.to_vec(),
        )]));
        let events = drain(&mut loader);
        assert!(matches!(
            &events[0],
            LoadEvent::Start {
                load_type: LoadType::State,
                ..
            }
        ));
        assert!(events.iter().any(|e| matches!(
            e,
            LoadEvent::Item(LoadItem {
                data: Some(ItemData::State(_)),
                ..
            })
        )));
    }

    #[test]
    fn test_empty_request_errors() {
        let mut loader = DefaultLoader::new();
        loader.load(LoadRequest::Files(vec![]));
        assert_eq!(kinds(&drain(&mut loader)), vec!["start", "error", "end"]);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let mut loader = DefaultLoader::new();
        loader.load(LoadRequest::Files(vec![PathBuf::from(
            "/definitely/not/here.png",
        )]));
        assert_eq!(kinds(&drain(&mut loader)), vec!["start", "error", "end"]);
    }
}
