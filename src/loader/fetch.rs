//! Transport for URL sources.

use super::error::LoadError;

/// Synchronous byte transport used by the default loader for URL sources.
pub trait Fetch {
    fn fetch(&self, url: &str, headers: &[(String, String)]) -> Result<Vec<u8>, LoadError>;
}

/// Blocking HTTP(S) transport. `file://` URLs are read from disk.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher;

#[cfg(not(target_arch = "wasm32"))]
impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str, headers: &[(String, String)]) -> Result<Vec<u8>, LoadError> {
        use std::io::Read;

        let parsed = url::Url::parse(url).map_err(|e| LoadError::fetch(url, e))?;
        if parsed.scheme() == "file" {
            let path = parsed
                .to_file_path()
                .map_err(|()| LoadError::fetch(url, "not a local path"))?;
            return std::fs::read(&path).map_err(|e| LoadError::io(path, e));
        }

        let mut request = ureq::get(url);
        for (name, value) in headers {
            request = request.set(name, value);
        }
        log::debug!("HttpFetcher: GET {}", url);
        let response = request.call().map_err(|e| LoadError::fetch(url, e))?;

        let mut bytes = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut bytes)
            .map_err(|e| LoadError::fetch(url, e))?;
        Ok(bytes)
    }
}
