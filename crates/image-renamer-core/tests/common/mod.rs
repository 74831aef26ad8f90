#![allow(dead_code)]

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image_renamer_core::{Error, ModelEndpoint, Result};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Prefix making the echo endpoint fail for an image
pub const FAIL_PREFIX: &str = "FAIL:";

/// Endpoint whose reply is the image's own content.
///
/// Tests write the reply they want into each image file, so results do not
/// depend on processing order.
pub struct EchoEndpoint {
    models: Vec<String>,
    chats: AtomicUsize,
}

impl EchoEndpoint {
    pub fn new(models: &[&str]) -> Self {
        Self {
            models: models.iter().map(|s| s.to_string()).collect(),
            chats: AtomicUsize::new(0),
        }
    }

    pub fn chat_count(&self) -> usize {
        self.chats.load(Ordering::SeqCst)
    }
}

impl ModelEndpoint for EchoEndpoint {
    fn list_models(&self) -> Result<Vec<String>> {
        Ok(self.models.clone())
    }

    fn chat(&self, _model: &str, _prompt: &str, image_base64: Option<&str>) -> Result<String> {
        self.chats.fetch_add(1, Ordering::SeqCst);
        let Some(image) = image_base64 else {
            return Ok("pong".to_string());
        };
        let bytes = BASE64
            .decode(image)
            .map_err(|e| Error::Endpoint {
                status: 400,
                body: e.to_string(),
            })?;
        let text = String::from_utf8_lossy(&bytes).into_owned();
        match text.strip_prefix(FAIL_PREFIX) {
            Some(reason) => Err(Error::Endpoint {
                status: 500,
                body: reason.to_string(),
            }),
            None => Ok(text),
        }
    }
}

/// Write `reply` as the content of `dir/name`
pub fn image_with_reply(dir: &Path, name: &str, reply: &str) {
    std::fs::write(dir.join(name), reply).unwrap();
}

/// Sorted names of every file in `dir`
pub fn files_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
