//! Title generation: ask a vision model for a short slug describing an image.
//!
//! The model reply is checked for refusal phrases before being sanitized into
//! a [`GeneratedTitle`]. The refusal check is a substring heuristic; it will
//! miss novel phrasings and may misfire on unusual titles.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use std::fs;
use std::path::Path;

use crate::endpoint::ModelEndpoint;
use crate::error::{Error, Result};
use crate::types::GeneratedTitle;

/// Lowercase substrings that mark a reply as a refusal rather than a title
pub const REFUSAL_INDICATORS: &[&str] = &[
    "sorry",
    "can't",
    "cannot",
    "unable",
    "don't have",
    "no image",
    "as an ai",
    "language model",
];

const QUOTES: &[char] = &['\'', '"'];

/// Models suggested when the selected one cannot see images
pub const SUGGESTED_VISION_MODELS: &[&str] = &["llava", "llama3.2-vision", "moondream"];

/// Produces titles for images using one model on one endpoint
pub struct TitleGenerator<'a> {
    endpoint: &'a dyn ModelEndpoint,
    model: &'a str,
    max_length: usize,
}

impl<'a> TitleGenerator<'a> {
    pub fn new(endpoint: &'a dyn ModelEndpoint, model: &'a str, max_length: usize) -> Self {
        Self {
            endpoint,
            model,
            max_length,
        }
    }

    /// Generate a sanitized title for the image at `image_path`
    pub fn generate_title(&self, image_path: &Path) -> Result<GeneratedTitle> {
        let bytes = fs::read(image_path).map_err(|e| Error::TitleGeneration {
            message: format!(
                "Failed to generate title: cannot read {}: {}",
                image_path.display(),
                e
            ),
            source: Some(Box::new(e)),
        })?;
        let encoded = BASE64.encode(bytes);

        let prompt = build_prompt(self.max_length);
        let reply = self
            .endpoint
            .chat(self.model, &prompt, Some(&encoded))
            .map_err(Error::title_generation)?;

        let reply = reply.trim();
        log::debug!("Model {} replied {:?} for {}", self.model, reply, image_path.display());

        if looks_like_refusal(reply) {
            return Err(Error::TitleGeneration {
                message: refusal_message(self.model),
                source: None,
            });
        }

        Ok(sanitize_title(reply, self.max_length))
    }

    /// Send a text-only request; true if the endpoint answered at all
    pub fn test_connection(&self) -> bool {
        match self.endpoint.chat(self.model, "test", None) {
            Ok(_) => true,
            Err(e) => {
                log::warn!("Connection test with {} failed: {}", self.model, e);
                false
            }
        }
    }
}

/// Instruction sent with every image
pub fn build_prompt(max_length: usize) -> String {
    format!(
        "Analyze this image and provide ONLY a very short descriptive title \
         (maximum {max_length} characters). \
         Be concise, use lowercase with underscores instead of spaces. \
         Examples: 'sunset_beach', 'red_car_highway', 'cat_sleeping'. \
         Do not include punctuation or file extensions. \
         Respond with ONLY the title, nothing else."
    )
}

/// Case-insensitive scan for [`REFUSAL_INDICATORS`]
pub fn looks_like_refusal(reply: &str) -> bool {
    let lower = reply.to_lowercase();
    REFUSAL_INDICATORS
        .iter()
        .any(|indicator| lower.contains(indicator))
}

fn refusal_message(model: &str) -> String {
    format!(
        "Model '{}' does not appear to support image analysis. \
         Try a vision model such as {}.",
        model,
        SUGGESTED_VISION_MODELS.join(", ")
    )
}

/// Turn a raw model reply into a filename-safe title of at most `max_length` characters
pub fn sanitize_title(raw: &str, max_length: usize) -> GeneratedTitle {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix(QUOTES).unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix(QUOTES).unwrap_or(trimmed);

    let slug: String = trimmed
        .to_lowercase()
        .replace(' ', "_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .take(max_length)
        .collect();

    GeneratedTitle::from_sanitized(slug)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ScriptedEndpoint;
    use crate::types::PLACEHOLDER_TITLE;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn is_slug(s: &str, max: usize) -> bool {
        s.len() <= max && s.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    }

    fn image_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"\x89PNG fake image").unwrap();
        file
    }

    #[test]
    fn test_sanitize_basic() {
        assert_eq!(sanitize_title("Red Car!!", 30).as_str(), "red_car");
        assert_eq!(sanitize_title("\"sunset_beach\"", 30).as_str(), "sunset_beach");
        assert_eq!(sanitize_title("  'Cat Sleeping'\n", 30).as_str(), "cat_sleeping");
    }

    #[test]
    fn test_sanitize_strips_only_one_quote_each_side() {
        // Inner quotes are removed by the character filter anyway
        assert_eq!(sanitize_title("''dog''", 30).as_str(), "dog");
    }

    #[test]
    fn test_sanitize_truncates_hard() {
        let title = sanitize_title("a very long title describing a mountain lake", 10);
        assert_eq!(title.as_str(), "a_very_lon");
    }

    #[test]
    fn test_sanitize_empty_becomes_placeholder() {
        assert_eq!(sanitize_title("", 30).as_str(), PLACEHOLDER_TITLE);
        assert_eq!(sanitize_title("!!! ???", 30).as_str(), "_");
        assert_eq!(sanitize_title("\"\"", 30).as_str(), PLACEHOLDER_TITLE);
        assert_eq!(sanitize_title("日本", 30).as_str(), PLACEHOLDER_TITLE);
    }

    #[test]
    fn test_sanitize_output_is_always_a_slug() {
        let inputs = [
            "Hello World",
            "ÄÖÜ straße 42",
            "tab\tseparated\nlines",
            "emoji 🐱 cat",
            "already_fine_123",
            "\"quoted with 'inner' quotes\"",
            "UPPER-case.with.dots",
        ];
        for input in inputs {
            for max in [1, 5, 30] {
                let out = sanitize_title(input, max);
                assert!(!out.as_str().is_empty());
                assert!(
                    is_slug(out.as_str(), max) || out.as_str() == PLACEHOLDER_TITLE,
                    "{input:?} -> {out}"
                );
            }
        }
    }

    #[test]
    fn test_refusal_detection() {
        for reply in [
            "I'm sorry, I can't see images",
            "I CANNOT view attachments",
            "As an AI language model I am unable to do that",
            "There is no image attached",
            "I don't have the ability",
        ] {
            assert!(looks_like_refusal(reply), "{reply}");
        }
        for reply in ["sunset_beach", "red_car_highway", "cat_sleeping", "snowy_mountain"] {
            assert!(!looks_like_refusal(reply), "{reply}");
        }
    }

    #[test]
    fn test_generate_title_sanitizes_reply() {
        let endpoint = ScriptedEndpoint::new().reply("  \"Golden Retriever Puppy!\"  ");
        let generator = TitleGenerator::new(&endpoint, "llava", 30);
        let image = image_file();

        let title = generator.generate_title(image.path()).unwrap();
        assert_eq!(title.as_str(), "golden_retriever_puppy");

        let calls = endpoint.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].model, "llava");
        assert!(calls[0].prompt.contains("maximum 30 characters"));
        assert!(calls[0].had_image);
    }

    #[test]
    fn test_generate_title_rejects_refusal() {
        let endpoint = ScriptedEndpoint::new().reply("Sorry, I cannot see any image.");
        let generator = TitleGenerator::new(&endpoint, "mistral:latest", 30);
        let image = image_file();

        let err = generator.generate_title(image.path()).unwrap_err();
        assert!(err.is_title_generation());
        let message = err.to_string();
        assert!(message.contains("mistral:latest"));
        assert!(message.contains("llava"));
    }

    #[test]
    fn test_generate_title_wraps_endpoint_error() {
        let endpoint = ScriptedEndpoint::new().fail("connection refused");
        let generator = TitleGenerator::new(&endpoint, "llava", 30);
        let image = image_file();

        let err = generator.generate_title(image.path()).unwrap_err();
        assert!(err.is_title_generation());
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_generate_title_missing_file() {
        let endpoint = ScriptedEndpoint::new().reply("cat");
        let generator = TitleGenerator::new(&endpoint, "llava", 30);

        let err = generator
            .generate_title(Path::new("/no/such/image.png"))
            .unwrap_err();
        assert!(err.is_title_generation());
        assert!(endpoint.calls().is_empty());
    }

    #[test]
    fn test_connection_probe() {
        let endpoint = ScriptedEndpoint::new().reply("hello");
        assert!(TitleGenerator::new(&endpoint, "llava", 30).test_connection());
        assert!(!endpoint.calls()[0].had_image);

        let endpoint = ScriptedEndpoint::new().fail("down");
        assert!(!TitleGenerator::new(&endpoint, "llava", 30).test_connection());
    }
}
