//! Generated-payload classifier
//!
//! Generated assets land in the bucket as JSON documents whose shape
//! varies by producer. The classifier decides which shape a payload
//! has and extracts one normalized record from it. Rules are checked
//! in order, first match wins:
//!
//! 1. `complete_data` present → complete bundle
//! 2. `story` present → traditional story-wrapped format
//! 3. `title` + `synopsis` present → bare story file
//! 4. `type` present → pipeline metadata, skipped (but archived)
//! 5. anything else → unrecognized, reported for manual inspection

use chrono::Utc;
use serde_json::Value;
use thiserror::Error;

/// Default genre when a payload carries none (or an unusable value)
const DEFAULT_GENRE: &str = "fantasy";

/// Default description when no synopsis/description/content exists
const DEFAULT_DESCRIPTION: &str = "An AI-generated manhwa story";

/// Description fallback takes at most this many characters of the
/// full story text
const DESCRIPTION_EXCERPT_CHARS: usize = 500;

/// Payload shape, recorded on the catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    /// Full bundle with `complete_data`
    Complete,
    /// Story wrapped in a `story` object
    Traditional,
    /// Bare story document with `title` + `synopsis`
    Story,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Complete => "complete",
            FileType::Traditional => "traditional",
            FileType::Story => "story",
        }
    }
}

/// Normalized record extracted from one payload
#[derive(Debug, Clone)]
pub struct ClassifiedRecord {
    pub title: String,
    pub author: String,
    pub genre: Vec<String>,
    pub description: String,
    pub file_type: FileType,
    /// Object key the payload came from
    pub source_object_key: String,
    /// Embedded cover art, still base64-encoded
    pub cover_image_b64: Option<String>,
    /// Embedded character art, still base64-encoded
    pub character_image_b64: Option<String>,
}

/// Classification outcome for one payload
#[derive(Debug, Clone)]
pub enum Classification {
    /// Content record, candidate for catalog import
    Record(ClassifiedRecord),
    /// Pipeline metadata: archived without import
    Metadata,
}

#[derive(Debug, Error)]
pub enum ClassifyError {
    /// Payload matches none of the recognized shapes. Usually means an
    /// upstream producer changed its output format.
    #[error("Unrecognized payload shape (keys: {keys:?})")]
    UnrecognizedShape { keys: Vec<String> },

    /// Payload is valid JSON but not an object
    #[error("Payload is not a JSON object")]
    NotAnObject,
}

/// Classify one parsed payload.
pub fn classify(payload: &Value, source_key: &str) -> Result<Classification, ClassifyError> {
    let obj = payload.as_object().ok_or(ClassifyError::NotAnObject)?;

    let (file_type, primary, secondary) = if obj.contains_key("complete_data") {
        // Fields from the top level, nested story as fallback
        (FileType::Complete, payload, payload.get("story"))
    } else if let Some(story) = obj.get("story") {
        (FileType::Traditional, story, Some(payload))
    } else if obj.contains_key("title") && obj.contains_key("synopsis") {
        (FileType::Story, payload, None)
    } else if obj.contains_key("type") {
        return Ok(Classification::Metadata);
    } else {
        return Err(ClassifyError::UnrecognizedShape {
            keys: obj.keys().cloned().collect(),
        });
    };

    let title = field_str(primary, "title")
        .or_else(|| secondary.and_then(|s| field_str(s, "title")))
        .or_else(|| field_str(payload, "title"))
        .map(str::to_string)
        .unwrap_or_else(|| {
            format!("Generated Manhwa {}", Utc::now().format("%Y%m%d_%H%M%S"))
        });

    let genre_value = primary
        .get("genre")
        .filter(|v| is_usable(v))
        .or_else(|| secondary.and_then(|s| s.get("genre")).filter(|v| is_usable(v)))
        .or_else(|| payload.get("genre").filter(|v| is_usable(v)));
    let genre = parse_genre(genre_value);

    let description = field_str(primary, "synopsis")
        .or_else(|| field_str(primary, "description"))
        .map(str::to_string)
        .or_else(|| {
            field_str(primary, "full_content")
                .map(|full| full.chars().take(DESCRIPTION_EXCERPT_CHARS).collect())
        })
        .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string());

    let author = field_str(primary, "author")
        .unwrap_or("AI Generated")
        .to_string();

    Ok(Classification::Record(ClassifiedRecord {
        title,
        author,
        genre,
        description,
        file_type,
        source_object_key: source_key.to_string(),
        cover_image_b64: embedded_image(payload, "cover_art"),
        character_image_b64: embedded_image(payload, "character_art"),
    }))
}

/// Parse a genre value into a normalized lowercase list.
///
/// Strings split on commas; lists are stringified per element; any
/// other type (or nothing) falls back to the default genre.
pub fn parse_genre(value: Option<&Value>) -> Vec<String> {
    let genres = match value {
        Some(Value::String(s)) => s
            .split(',')
            .map(|g| g.trim().to_lowercase())
            .filter(|g| !g.is_empty())
            .collect(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.trim().to_lowercase(),
                other => other.to_string().trim().to_lowercase(),
            })
            .filter(|g| !g.is_empty())
            .collect(),
        _ => Vec::new(),
    };

    if genres.is_empty() {
        vec![DEFAULT_GENRE.to_string()]
    } else {
        genres
    }
}

/// Non-empty string field lookup
fn field_str<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

/// Whether a genre candidate is worth parsing (non-null, and not an
/// empty/blank string)
fn is_usable(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    }
}

/// Extract `<field>.image_base64` when present
fn embedded_image(payload: &Value, field: &str) -> Option<String> {
    payload
        .get(field)
        .and_then(|art| art.get("image_base64"))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
