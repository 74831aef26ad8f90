use log::{info, warn};

use crate::endpoint::ModelEndpoint;
use crate::error::Error;

/// Label shown in place of a model list when nothing usable is installed
pub const NO_VISION_MODELS_LABEL: &str = "No vision models installed";

/// Hint shown alongside [`NO_VISION_MODELS_LABEL`]
pub const NO_VISION_MODELS_HINT: &str = "No vision models! Install: ollama pull llama3.2-vision";

/// Which model the front-end should offer after loading the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelChoice {
    /// Vision models are installed; `selected` is preselected
    Available {
        models: Vec<String>,
        selected: String,
    },
    /// Nothing usable installed; runs must not be started
    NoVisionModels,
}

impl ModelChoice {
    pub fn selected(&self) -> Option<&str> {
        match self {
            Self::Available { selected, .. } => Some(selected),
            Self::NoVisionModels => None,
        }
    }

    /// Values to populate the model selector with
    pub fn display_values(&self) -> Vec<String> {
        match self {
            Self::Available { models, .. } => models.clone(),
            Self::NoVisionModels => vec![NO_VISION_MODELS_LABEL.to_string()],
        }
    }

    /// Status line describing the catalog
    pub fn status_text(&self) -> String {
        match self {
            Self::Available { models, .. } => {
                format!("Found {} vision model(s)", models.len())
            }
            Self::NoVisionModels => format!("⚠ {}", NO_VISION_MODELS_HINT),
        }
    }
}

/// Resolves installed vision-capable models from a model endpoint
pub struct ModelCatalog<'a> {
    endpoint: &'a dyn ModelEndpoint,
    fragments: &'a [String],
}

impl<'a> ModelCatalog<'a> {
    pub fn new(endpoint: &'a dyn ModelEndpoint, fragments: &'a [String]) -> Self {
        Self {
            endpoint,
            fragments,
        }
    }

    /// Installed models whose name matches a vision fragment, in server order.
    ///
    /// Never fails: an unreachable server or a malformed reply yields an empty list.
    pub fn list_vision_models(&self) -> Vec<String> {
        let models = match self.endpoint.list_models() {
            Ok(models) => models,
            Err(e) => {
                let err = Error::CatalogUnavailable(e.to_string());
                warn!("{}", err);
                return Vec::new();
            }
        };

        let vision = filter_vision_models(models, self.fragments);
        if vision.is_empty() {
            warn!("{}", Error::CatalogUnavailable("no vision models installed".into()));
        } else {
            info!("Found {} vision model(s): {}", vision.len(), vision.join(", "));
        }
        vision
    }

    /// Load the catalog and pick the model to preselect
    pub fn resolve_choice(&self, preferred: &str) -> ModelChoice {
        choose_model(self.list_vision_models(), preferred)
    }
}

/// Keep non-empty names containing any fragment, preserving order
pub fn filter_vision_models<S: AsRef<str>>(models: Vec<String>, fragments: &[S]) -> Vec<String> {
    models
        .into_iter()
        .filter(|name| !name.trim().is_empty())
        .filter(|name| {
            let lower = name.to_lowercase();
            fragments
                .iter()
                .any(|fragment| lower.contains(&fragment.as_ref().to_lowercase()))
        })
        .collect()
}

/// Preselect `preferred` when installed, otherwise the first model
pub fn choose_model(models: Vec<String>, preferred: &str) -> ModelChoice {
    let selected = if models.iter().any(|m| m == preferred) {
        preferred.to_string()
    } else {
        match models.first() {
            Some(first) => first.clone(),
            None => return ModelChoice::NoVisionModels,
        }
    };
    ModelChoice::Available { models, selected }
}
