use crate::PreviewResult;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;
use url::Url;

/// Envelope returned by the metadata service: `{ "data": { ... } }`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetadataResponse {
    #[serde(default)]
    pub data: Option<MetadataPayload>,
}

impl MetadataResponse {
    pub fn into_payload(self) -> MetadataPayload {
        self.data.unwrap_or_default()
    }
}

/// The fields of a metadata response the card cares about.
///
/// Services are loose about value types, so string fields accept a bare
/// string or an array of strings (first one wins) and ignore anything else.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataPayload {
    #[serde(
        rename = "og:title",
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub og_title: Option<String>,

    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub title: Option<String>,

    #[serde(
        rename = "og:description",
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub og_description: Option<String>,

    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<String>,

    #[serde(
        rename = "og:image",
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub og_image: Option<String>,

    #[serde(rename = "ld+json", default, skip_serializing_if = "Option::is_none")]
    pub ld_json: Option<Value>,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::String(s) => Some(s),
        Value::Array(items) => items.into_iter().find_map(|item| match item {
            Value::String(s) => Some(s),
            _ => None,
        }),
        _ => None,
    }))
}

impl MetadataPayload {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Applies the fixed fallback chain to every field.
    ///
    /// `link` is only used to absolutize image references written as paths
    /// (`/a.png`, `//cdn/a.png`, `./a.png`, `../a.png`); other values pass through.
    pub fn resolve(&self, link: Option<&Url>) -> PreviewResult {
        let title = present(&self.og_title).or_else(|| present(&self.title));
        let description = present(&self.og_description).or_else(|| present(&self.description));
        let image_url = present(&self.og_image)
            .or_else(|| self.ld_json.as_ref().and_then(structured_logo))
            .map(|image| absolutize(image, link));

        debug!(
            title = ?title,
            description = ?description,
            image = ?image_url,
            "Resolved metadata fields"
        );

        PreviewResult {
            title,
            description,
            image_url,
        }
    }
}

fn present(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// `logo`, then `publisher.logo`, on the first structured-data block that has one.
fn structured_logo(ld: &Value) -> Option<String> {
    match ld {
        Value::Array(blocks) => blocks.iter().find_map(structured_logo),
        Value::Object(block) => block
            .get("logo")
            .and_then(image_ref)
            .or_else(|| {
                block
                    .get("publisher")
                    .and_then(|publisher| publisher.get("logo"))
                    .and_then(image_ref)
            })
            .or_else(|| block.get("@graph").and_then(structured_logo)),
        _ => None,
    }
}

// A logo is either a plain URL or an ImageObject.
fn image_ref(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim())
            .filter(|s| !s.is_empty())
            .map(String::from),
        Value::Object(object) => ["url", "contentUrl", "@id"]
            .iter()
            .find_map(|key| object.get(*key).and_then(image_ref)),
        Value::Array(items) => items.iter().find_map(image_ref),
        _ => None,
    }
}

fn absolutize(image: String, link: Option<&Url>) -> String {
    let is_path = ["/", "./", "../"]
        .iter()
        .any(|prefix| image.starts_with(prefix));

    match link {
        Some(base) if is_path => base.join(&image).map(String::from).unwrap_or(image),
        _ => image,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> MetadataPayload {
        serde_json::from_value::<MetadataResponse>(value)
            .unwrap()
            .into_payload()
    }

    #[test]
    fn test_open_graph_fields_win() {
        let result = payload(json!({
            "data": {
                "og:title": "A",
                "title": "ignored",
                "og:description": "B",
                "description": "ignored",
                "og:image": "C",
                "ld+json": { "logo": "ignored" }
            }
        }))
        .resolve(None);

        assert_eq!(result.title.as_deref(), Some("A"));
        assert_eq!(result.description.as_deref(), Some("B"));
        assert_eq!(result.image_url.as_deref(), Some("C"));
    }

    #[test]
    fn test_generic_fields_fallback() {
        let result = payload(json!({ "data": { "title": "A", "description": "B" } })).resolve(None);

        assert_eq!(result.title.as_deref(), Some("A"));
        assert_eq!(result.description.as_deref(), Some("B"));
        assert_eq!(result.image_url, None);
    }

    #[test]
    fn test_empty_strings_are_absent() {
        let result = payload(json!({
            "data": { "og:title": "  ", "title": "Real", "og:image": "" }
        }))
        .resolve(None);

        assert_eq!(result.title.as_deref(), Some("Real"));
        assert_eq!(result.image_url, None);
    }

    #[test]
    fn test_missing_data_is_empty_payload() {
        assert!(payload(json!({})).is_empty());
        assert!(payload(json!({ "data": null })).is_empty());
        assert_eq!(payload(json!({})).resolve(None), PreviewResult::empty());
    }

    #[test]
    fn test_structured_logo_without_og_title() {
        let result = payload(json!({
            "data": { "ld+json": { "publisher": { "logo": { "url": "https://cdn.example.com/p.png" } } } }
        }))
        .resolve(None);

        assert_eq!(result.title, None);
        assert_eq!(
            result.image_url.as_deref(),
            Some("https://cdn.example.com/p.png")
        );
    }

    #[test]
    fn test_structured_logo_precedes_publisher_logo() {
        let result = payload(json!({
            "data": {
                "ld+json": [
                    { "@type": "BreadcrumbList" },
                    { "logo": "https://example.com/own.png", "publisher": { "logo": "https://example.com/pub.png" } }
                ]
            }
        }))
        .resolve(None);

        assert_eq!(result.image_url.as_deref(), Some("https://example.com/own.png"));
    }

    #[test]
    fn test_relative_image_is_joined_with_link() {
        let link = Url::parse("https://example.com/blog/post").unwrap();
        let result = payload(json!({ "data": { "og:image": "/img/cover.jpg" } })).resolve(Some(&link));

        assert_eq!(
            result.image_url.as_deref(),
            Some("https://example.com/img/cover.jpg")
        );
    }

    #[test]
    fn test_bare_image_value_is_kept_verbatim() {
        let link = Url::parse("https://example.com/blog/post").unwrap();
        let result = payload(json!({
            "data": { "og:title": "A", "og:description": "B", "og:image": "C" }
        }))
        .resolve(Some(&link));

        assert_eq!(result.image_url.as_deref(), Some("C"));

        let logo = payload(json!({ "data": { "ld+json": { "logo": "logo.png" } } })).resolve(Some(&link));
        assert_eq!(logo.image_url.as_deref(), Some("logo.png"));
    }

    #[test]
    fn test_path_like_images_are_joined() {
        let link = Url::parse("https://example.com/blog/post").unwrap();
        let resolve = |image: &str| {
            payload(json!({ "data": { "og:image": image } }))
                .resolve(Some(&link))
                .image_url
        };

        assert_eq!(resolve("./a.png").as_deref(), Some("https://example.com/blog/a.png"));
        assert_eq!(resolve("../a.png").as_deref(), Some("https://example.com/a.png"));
        assert_eq!(resolve("//cdn.example.net/a.png").as_deref(), Some("https://cdn.example.net/a.png"));
        assert_eq!(resolve("https://other.example.org/a.png").as_deref(), Some("https://other.example.org/a.png"));
    }

    #[test]
    fn test_lenient_value_types() {
        let result = payload(json!({
            "data": { "og:title": 42, "title": ["First", "Second"], "og:image": { "weird": true } }
        }))
        .resolve(None);

        assert_eq!(result.title.as_deref(), Some("First"));
        assert_eq!(result.image_url, None);
    }
}
