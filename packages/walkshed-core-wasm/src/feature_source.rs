use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use js_sys::Uint8Array;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::Response;

use crate::error::DecodeError;
use crate::fgb_decoder::decode_fgb;
use crate::models::{BoundingBox, FeatureCollection};
use crate::{console_log, console_warn};

/// Where feature bytes come from. The browser build fetches over HTTP; tests
/// serve bytes from memory.
#[allow(async_fn_in_trait)]
pub trait ByteFetcher {
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, DecodeError>;
}

/// Fetches through the page's `window.fetch`.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsFetcher;

impl ByteFetcher for JsFetcher {
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, DecodeError> {
        let transport = |e: JsValue| DecodeError::Transport {
            url: url.to_string(),
            reason: format!("{:?}", e),
        };

        let window = web_sys::window().ok_or_else(|| DecodeError::Transport {
            url: url.to_string(),
            reason: "no global window".to_string(),
        })?;

        let response: Response = JsFuture::from(window.fetch_with_str(url))
            .await
            .map_err(transport)?
            .dyn_into()
            .map_err(transport)?;

        if !response.ok() {
            return Err(DecodeError::Status {
                url: url.to_string(),
                status: response.status(),
            });
        }

        let buffer = JsFuture::from(response.array_buffer().map_err(transport)?)
            .await
            .map_err(transport)?;
        Ok(Uint8Array::new(&buffer).to_vec())
    }
}

/// Response bodies kept per URL for the life of a map.
///
/// Viewport queries re-read the parcel source on every pan and zoom; with the
/// body kept, only the first query hits the network and the rest decode from
/// memory through the spatial index. Failed fetches are not kept, so a later
/// query retries.
#[derive(Debug, Default)]
pub struct SourceCache {
    bodies: RefCell<HashMap<String, Rc<Vec<u8>>>>,
}

impl SourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn bytes<F: ByteFetcher>(
        &self,
        fetcher: &F,
        url: &str,
    ) -> Result<Rc<Vec<u8>>, DecodeError> {
        let cached = self.bodies.borrow().get(url).cloned();
        if let Some(body) = cached {
            return Ok(body);
        }

        let body = Rc::new(fetcher.fetch_bytes(url).await?);
        // two overlapping misses both fetch; the first body stored wins
        let stored = self
            .bodies
            .borrow_mut()
            .entry(url.to_string())
            .or_insert_with(|| body.clone())
            .clone();
        Ok(stored)
    }

    pub fn contains(&self, url: &str) -> bool {
        self.bodies.borrow().contains_key(url)
    }
}

/// Fetch (or reuse) and decode one FlatGeobuf source, optionally restricted
/// to a box.
pub async fn fetch_features<F: ByteFetcher>(
    fetcher: &F,
    cache: &SourceCache,
    url: &str,
    bbox: Option<&BoundingBox>,
) -> Result<FeatureCollection, DecodeError> {
    let bytes = cache.bytes(fetcher, url).await?;
    decode_fgb(&bytes, bbox)
}

/// Like [`fetch_features`], but never fails: the viewport loop calls this on
/// every map movement, so any error is logged and becomes an empty collection.
pub async fn load_features<F: ByteFetcher>(
    fetcher: &F,
    cache: &SourceCache,
    url: &str,
    bbox: Option<&BoundingBox>,
) -> FeatureCollection {
    match fetch_features(fetcher, cache, url, bbox).await {
        Ok(collection) => {
            console_log!("Decoded {} features from {}", collection.len(), url);
            collection
        }
        Err(err) => {
            console_warn!("Feature source {} unavailable: {}", url, err);
            FeatureCollection::empty()
        }
    }
}
