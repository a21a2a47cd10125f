//! Resource resolution for embedded images.
//!
//! Every image node of a tree is turned into a [`ResolvedImage`] before any
//! emitter runs. Resolution never fails: data URIs pass through untouched,
//! everything else is fetched, decoded and normalized to PNG, and any failure
//! along the way degrades to a placeholder of the node's fitted size.

pub mod fetch;
pub mod placeholder;

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::ImageFormat;
use image::imageops::FilterType;
use tokio::task::JoinSet;
use url::Url;

use crate::arena::RenderArena;
use crate::model::ContentNode;
use crate::typesetter::Typesetter;
use crate::types::ExportOptions;
use crate::walker::{MAX_IMAGE_DIMENSION, fit_image};

pub use fetch::{ImageFetcher, ReqwestFetcher, ResolveError, parse_image_url};

/// An image ready to be embedded in any target format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImage {
    pub original_uri: String,
    /// Encoded image bytes: PNG, or the payload of a passed-through data URI.
    pub data: Vec<u8>,
    pub mime_type: String,
    /// Natural width in pixels.
    pub width: u32,
    /// Natural height in pixels.
    pub height: u32,
    pub is_placeholder: bool,
}

impl ResolvedImage {
    /// Inline form of the image. Passed-through data URIs are returned as given.
    pub fn data_uri(&self) -> String {
        if is_data_uri(&self.original_uri) && !self.is_placeholder {
            return self.original_uri.clone();
        }
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.data))
    }

    /// The image as PNG bytes. Placeholders and fetched images are already
    /// PNG; passed-through data is decoded first, whatever its declared type.
    pub fn png(&self) -> Result<Vec<u8>, ResolveError> {
        if self.mime_type == "image/png" && !is_data_uri(&self.original_uri) {
            return Ok(self.data.clone());
        }
        let (png, _, _) = encode_png(&self.data)?;
        Ok(png)
    }
}

/// Resolutions of a tree's image nodes, indexed by document-order ordinal.
#[derive(Debug, Clone, Default)]
pub struct ResolvedImages {
    images: Vec<Arc<ResolvedImage>>,
}

impl ResolvedImages {
    pub fn get(&self, ordinal: usize) -> Option<&Arc<ResolvedImage>> {
        self.images.get(ordinal)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ResolvedImage>> {
        self.images.iter()
    }

    /// Number of images that fell back to a placeholder.
    pub fn placeholders(&self) -> usize {
        self.images.iter().filter(|i| i.is_placeholder).count()
    }
}

pub(crate) fn is_data_uri(uri: &str) -> bool {
    uri.trim_start()
        .get(..5)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("data:"))
}

/// Split a data URI into MIME type and decoded payload.
pub fn parse_data_uri(uri: &str) -> Result<(String, Vec<u8>), ResolveError> {
    let rest = uri.trim().get(5..).ok_or(ResolveError::MalformedDataUri)?;
    let (header, payload) = rest.split_once(',').ok_or(ResolveError::MalformedDataUri)?;

    let mut parts = header.split(';');
    let mime_type = match parts.next() {
        Some(mime) if !mime.is_empty() => mime.to_ascii_lowercase(),
        _ => "text/plain".to_string(),
    };
    let is_base64 = parts.any(|p| p.eq_ignore_ascii_case("base64"));

    let data = if is_base64 {
        let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        STANDARD
            .decode(compact)
            .map_err(|_| ResolveError::MalformedDataUri)?
    } else {
        payload.as_bytes().to_vec()
    };

    Ok((mime_type, data))
}

/// Decode `bytes` in any supported format and re-encode them as PNG,
/// downscaling so neither side exceeds [`MAX_IMAGE_DIMENSION`].
pub fn encode_png(bytes: &[u8]) -> Result<(Vec<u8>, u32, u32), ResolveError> {
    let mut decoded = image::load_from_memory(bytes)?;
    if decoded.width() > MAX_IMAGE_DIMENSION || decoded.height() > MAX_IMAGE_DIMENSION {
        decoded = decoded.resize(MAX_IMAGE_DIMENSION, MAX_IMAGE_DIMENSION, FilterType::Triangle);
    }
    let mut png = Vec::new();
    decoded.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok((png, decoded.width(), decoded.height()))
}

fn probe_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}

struct Fetched {
    png: Vec<u8>,
    width: u32,
    height: u32,
}

/// Resolves the images of a content tree concurrently.
///
/// Holds only immutable shared resources, so one resolver serves any number
/// of jobs; per-job state lives in the [`RenderArena`].
#[derive(Clone)]
pub struct ResourceResolver {
    fetcher: Arc<dyn ImageFetcher>,
    typesetter: Arc<Typesetter>,
}

impl ResourceResolver {
    pub fn new(fetcher: Arc<dyn ImageFetcher>, typesetter: Arc<Typesetter>) -> Self {
        Self {
            fetcher,
            typesetter,
        }
    }

    /// Resolve every image node of `tree`, in document order.
    ///
    /// Distinct URIs are fetched at most once per arena and all fetches run
    /// concurrently. Results are attributed back by URI, never by completion
    /// order.
    pub async fn resolve_all(
        &self,
        tree: &ContentNode,
        arena: &mut RenderArena,
        options: &ExportOptions,
    ) -> ResolvedImages {
        let nodes = tree.images();
        if nodes.is_empty() {
            return ResolvedImages::default();
        }

        let base = options.base_url.as_deref().and_then(|b| Url::parse(b).ok());

        let mut pending: JoinSet<(String, Result<Fetched, ResolveError>)> = JoinSet::new();
        let mut failures: HashMap<String, ResolveError> = HashMap::new();
        let mut scheduled: Vec<&str> = Vec::new();

        for node in &nodes {
            let ContentNode::Image { source, .. } = node else {
                continue;
            };
            if is_data_uri(source) || arena.cached_image(source).is_some() {
                continue;
            }
            if scheduled.contains(&source.as_str()) {
                continue;
            }
            scheduled.push(source);

            let url = match parse_image_url(source.trim(), base.as_ref()) {
                Ok(url) => url,
                Err(e) => {
                    failures.insert(source.clone(), e);
                    continue;
                }
            };

            let fetcher = Arc::clone(&self.fetcher);
            let timeout = options.image_timeout();
            let uri = source.clone();
            pending.spawn(async move {
                let result = match tokio::time::timeout(timeout, fetch_and_normalize(fetcher, url)).await {
                    Ok(result) => result,
                    Err(_) => Err(ResolveError::Timeout(timeout)),
                };
                (uri, result)
            });
        }

        tracing::debug!(
            "Resolving {} image nodes, {} fetches in flight",
            nodes.len(),
            pending.len()
        );

        while let Some(joined) = pending.join_next().await {
            match joined {
                Ok((uri, Ok(fetched))) => {
                    let image = ResolvedImage {
                        original_uri: uri.clone(),
                        data: fetched.png,
                        mime_type: "image/png".to_string(),
                        width: fetched.width,
                        height: fetched.height,
                        is_placeholder: false,
                    };
                    arena.cache_image(uri, Arc::new(image));
                }
                Ok((uri, Err(e))) => {
                    failures.insert(uri, e);
                }
                Err(e) => tracing::warn!("Image resolution task failed: {}", e),
            }
        }

        let mut images = Vec::with_capacity(nodes.len());
        for node in nodes {
            let ContentNode::Image {
                source,
                width,
                height,
            } = node
            else {
                continue;
            };

            let resolved = if is_data_uri(source) {
                self.pass_through(source, *width, *height, options)
            } else if let Some(image) = arena.cached_image(source) {
                image
            } else {
                match failures.get(source) {
                    Some(e) => tracing::warn!("Image '{}' unavailable: {}", source, e),
                    None => tracing::warn!("Image '{}' unavailable", source),
                }
                self.placeholder(source, *width, *height, options).await
            };
            images.push(resolved);
        }

        ResolvedImages { images }
    }

    fn pass_through(
        &self,
        uri: &str,
        width: Option<u32>,
        height: Option<u32>,
        options: &ExportOptions,
    ) -> Arc<ResolvedImage> {
        let (mime_type, data) = match parse_data_uri(uri) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Inline image kept as-is: {}", e);
                ("application/octet-stream".to_string(), Vec::new())
            }
        };

        let (width, height) = probe_dimensions(&data).unwrap_or((
            width.unwrap_or(options.placeholder_width),
            height.unwrap_or(options.placeholder_height),
        ));

        Arc::new(ResolvedImage {
            original_uri: uri.to_string(),
            data,
            mime_type,
            width,
            height,
            is_placeholder: false,
        })
    }

    /// Paint a placeholder at the size the image would be laid out at.
    async fn placeholder(
        &self,
        uri: &str,
        width: Option<u32>,
        height: Option<u32>,
        options: &ExportOptions,
    ) -> Arc<ResolvedImage> {
        let declared = (
            width.unwrap_or(options.placeholder_width).max(1),
            height.unwrap_or(options.placeholder_height).max(1),
        );
        let (width, height) = fit_image(
            Some(declared.0),
            Some(declared.1),
            declared,
            options.max_image_width,
        );

        let typesetter = Arc::clone(&self.typesetter);
        let caption = options.placeholder_caption.clone();
        let png = match tokio::task::spawn_blocking(move || {
            placeholder::paint(&typesetter, width, height, &caption)
        })
        .await
        {
            Ok(png) => png,
            Err(e) => {
                tracing::warn!("Placeholder task failed, drawing plain frame: {}", e);
                placeholder::plain_frame(width, height)
            }
        };

        Arc::new(ResolvedImage {
            original_uri: uri.to_string(),
            data: png,
            mime_type: "image/png".to_string(),
            width,
            height,
            is_placeholder: true,
        })
    }
}

async fn fetch_and_normalize(
    fetcher: Arc<dyn ImageFetcher>,
    url: Url,
) -> Result<Fetched, ResolveError> {
    let bytes = fetcher.fetch(&url).await?;
    let (png, width, height) = tokio::task::spawn_blocking(move || encode_png(&bytes))
        .await
        .map_err(|e| ResolveError::Task(e.to_string()))??;
    Ok(Fetched { png, width, height })
}
