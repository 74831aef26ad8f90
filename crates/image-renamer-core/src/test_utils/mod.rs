use crossbeam::channel::{bounded, Receiver, Sender};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::endpoint::ModelEndpoint;
use crate::error::{Error, Result};

/// Reply given once the scripted replies run out
pub const DEFAULT_REPLY: &str = "untitled";

/// Reply that makes the scripted endpoint panic
pub const PANIC_REPLY: &str = "!panic";

/// One recorded chat request
#[derive(Debug, Clone)]
pub struct ChatCall {
    pub model: String,
    pub prompt: String,
    pub had_image: bool,
}

/// In-memory model endpoint answering from a script
pub struct ScriptedEndpoint {
    catalog: std::result::Result<Vec<String>, String>,
    replies: Mutex<VecDeque<std::result::Result<String, String>>>,
    calls: Mutex<Vec<ChatCall>>,
    hold: Option<Receiver<()>>,
}

impl Default for ScriptedEndpoint {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedEndpoint {
    pub fn new() -> Self {
        Self {
            catalog: Ok(Vec::new()),
            replies: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            hold: None,
        }
    }

    pub fn with_models(mut self, models: &[&str]) -> Self {
        self.catalog = Ok(models.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn with_catalog_error(mut self) -> Self {
        self.catalog = Err("connection refused".to_string());
        self
    }

    /// Queue a successful reply
    pub fn reply(self, text: &str) -> Self {
        self.replies.lock().unwrap().push_back(Ok(text.to_string()));
        self
    }

    /// Queue a transport failure
    pub fn fail(self, message: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
        self
    }

    /// Block every chat call until a unit is sent on the returned channel
    pub fn held(mut self) -> (Self, Sender<()>) {
        let (tx, rx) = bounded(0);
        self.hold = Some(rx);
        (self, tx)
    }

    pub fn calls(&self) -> Vec<ChatCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl ModelEndpoint for ScriptedEndpoint {
    fn list_models(&self) -> Result<Vec<String>> {
        self.catalog.clone().map_err(Error::CatalogUnavailable)
    }

    fn chat(&self, model: &str, prompt: &str, image_base64: Option<&str>) -> Result<String> {
        if let Some(hold) = &self.hold {
            let _ = hold.recv();
        }

        self.calls.lock().unwrap().push(ChatCall {
            model: model.to_string(),
            prompt: prompt.to_string(),
            had_image: image_base64.is_some(),
        });

        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(Ok(text)) if text == PANIC_REPLY => panic!("scripted endpoint panic"),
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                message,
            ))),
            None => Ok(DEFAULT_REPLY.to_string()),
        }
    }
}

/// Create empty placeholder files named `names` in `dir`
pub fn create_files(dir: &Path, names: &[&str]) -> Vec<PathBuf> {
    names
        .iter()
        .map(|name| {
            let path = dir.join(name);
            std::fs::write(&path, b"DUMMY IMAGE DATA").unwrap();
            path
        })
        .collect()
}
