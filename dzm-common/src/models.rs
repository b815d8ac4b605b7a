//! Catalog wire models
//!
//! Listing records as served by the catalog's shorts endpoints, plus the
//! response envelope every endpoint wraps its payload in.
//!
//! Field names follow the server's camelCase JSON. Everything the engine
//! does not strictly need is optional with a default so older servers that
//! omit a field still decode.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

/// Seller shown on a listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerRef {
    pub id: String,
    /// Display name
    pub name: String,
    /// Avatar URL, absent for sellers without a picture
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub is_premium: bool,
}

/// A marketplace listing presented as one entry of the shorts feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedItem {
    /// Opaque listing identifier
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Whole-unit price (no minor units in the marketplace currency)
    pub price: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub category: String,
    #[serde(default)]
    pub location: String,
    /// Image URLs in display order
    #[serde(default)]
    pub images: Vec<String>,
    /// Video URLs in display order; empty for image-only listings
    #[serde(default)]
    pub videos: Vec<String>,
    pub seller: SellerRef,
    /// Server-authoritative like counter
    #[serde(rename = "likes", alias = "likeCount", default)]
    pub like_count: u64,
    #[serde(rename = "comments", alias = "commentCount", default)]
    pub comment_count: u64,
    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub video_views: u64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
    /// Whether the viewer had already liked this listing when it was served
    ///
    /// Current servers never send this; it defaults to `false`.
    #[serde(default)]
    pub viewer_has_liked: bool,
}

fn default_currency() -> String {
    "DZD".to_string()
}

/// Accept both RFC 3339 timestamps and naive ISO timestamps (read as UTC)
///
/// The catalog serialises `datetime.utcnow()` without an offset.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(serde::de::Error::custom)
}

impl FeedItem {
    /// True when the listing has at least one video to autoplay
    pub fn has_video(&self) -> bool {
        !self.videos.is_empty()
    }

    /// The video a media surface should load for this listing
    pub fn primary_video(&self) -> Option<&str> {
        self.videos.first().map(String::as_str)
    }

    /// The still image shown for image-only listings
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    /// A listing is displayable only if it carries some media
    pub fn is_displayable(&self) -> bool {
        !self.images.is_empty() || !self.videos.is_empty()
    }
}

/// Category with shorts content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    /// Slug identifier (e.g. "home-garden")
    pub id: String,
    /// Display name; the feed endpoint filters on this value
    pub name: String,
    /// Number of listings with videos, informational only
    #[serde(rename = "videoCount", alias = "itemCount", default)]
    pub item_count: u64,
    #[serde(default)]
    pub total_views: u64,
}

/// Dwell time for one activation of a listing
///
/// Created when the viewer leaves a listing and sent immediately; never kept
/// after the flush.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewEvent {
    pub item_id: String,
    /// Whole seconds the listing stayed active
    pub duration_secs: u64,
    pub flushed_at: DateTime<Utc>,
}

impl ViewEvent {
    /// Request body for `POST /shorts/track-view`
    pub fn to_request(&self) -> TrackViewRequest {
        TrackViewRequest {
            product_id: self.item_id.clone(),
            duration: self.duration_secs,
        }
    }
}

/// Wire body of a view report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackViewRequest {
    pub product_id: String,
    pub duration: u64,
}

/// Error detail carried by a failed envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

/// Standard response envelope
///
/// `{ "success": bool, "message"?: str, "data"?: T, "error"?: {code, message} }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    pub data: Option<T>,
    #[serde(default)]
    pub error: Option<ApiErrorBody>,
}

/// Payload of `GET /shorts/feed`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPayload {
    /// Listings that decoded; malformed entries are skipped
    #[serde(default, deserialize_with = "deserialize_listings")]
    pub products: Vec<FeedItem>,
    /// Absent on servers without paging support
    #[serde(default)]
    pub has_more: Option<bool>,
}

/// Decode each listing on its own so one bad record does not sink the page
fn deserialize_listings<'de, D>(deserializer: D) -> Result<Vec<FeedItem>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<serde_json::Value>::deserialize(deserializer)?;
    let total = raw.len();
    let items: Vec<FeedItem> = raw
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<FeedItem>(value) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!(error = %e, "Skipping malformed listing");
                None
            }
        })
        .collect();

    if items.len() < total {
        warn!(skipped = total - items.len(), total, "Feed page had malformed listings");
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn product_json() -> serde_json::Value {
        json!({
            "id": "p-1",
            "title": "Samsung Galaxy S24 Ultra",
            "description": "Excellent condition",
            "price": 180000.0,
            "currency": "DZD",
            "category": "Electronics",
            "images": ["https://cdn.example/p-1.jpg"],
            "videos": ["https://cdn.example/p-1.mp4"],
            "location": "Algiers, Algeria",
            "likes": 12,
            "views": 340,
            "videoViews": 51,
            "status": "available",
            "createdAt": "2024-03-01T10:15:30.123456",
            "seller": {
                "id": "s-1",
                "name": "Karim",
                "avatar": null,
                "verified": true,
                "isPremium": false
            }
        })
    }

    #[test]
    fn test_feed_item_decodes_server_shape() {
        let item: FeedItem = serde_json::from_value(product_json()).unwrap();

        assert_eq!(item.id, "p-1");
        assert_eq!(item.like_count, 12);
        assert_eq!(item.comment_count, 0);
        assert_eq!(item.video_views, 51);
        assert!(item.seller.verified);
        assert!(item.seller.avatar.is_none());
        assert!(!item.viewer_has_liked);
        assert_eq!(item.created_at.timestamp(), 1_709_288_130);
        assert!(item.has_video());
    }

    #[test]
    fn test_feed_item_accepts_rfc3339_timestamp() {
        let mut value = product_json();
        value["createdAt"] = json!("2024-03-01T10:15:30Z");
        let item: FeedItem = serde_json::from_value(value).unwrap();
        assert_eq!(item.created_at.timestamp(), 1_709_288_130);
    }

    #[test]
    fn test_feed_item_rejects_garbage_timestamp() {
        let mut value = product_json();
        value["createdAt"] = json!("yesterday");
        assert!(serde_json::from_value::<FeedItem>(value).is_err());
    }

    #[test]
    fn test_image_only_item_is_displayable() {
        let mut value = product_json();
        value["videos"] = json!([]);
        let item: FeedItem = serde_json::from_value(value).unwrap();

        assert!(!item.has_video());
        assert!(item.primary_video().is_none());
        assert_eq!(item.primary_image(), Some("https://cdn.example/p-1.jpg"));
        assert!(item.is_displayable());
    }

    #[test]
    fn test_item_without_media_is_not_displayable() {
        let mut value = product_json();
        value["videos"] = json!([]);
        value["images"] = json!([]);
        let item: FeedItem = serde_json::from_value(value).unwrap();
        assert!(!item.is_displayable());
    }

    #[test]
    fn test_category_decodes_video_count() {
        let category: Category = serde_json::from_value(json!({
            "id": "home-garden",
            "name": "Home & Garden",
            "videoCount": 7,
            "totalViews": 120
        }))
        .unwrap();

        assert_eq!(category.item_count, 7);
        assert_eq!(category.total_views, 120);
    }

    #[test]
    fn test_malformed_listing_is_skipped() {
        let mut missing_seller = product_json();
        missing_seller["id"] = json!("p-2");
        missing_seller.as_object_mut().unwrap().remove("seller");
        let mut bad_timestamp = product_json();
        bad_timestamp["id"] = json!("p-3");
        bad_timestamp["createdAt"] = json!("yesterday");

        let payload: FeedPayload = serde_json::from_value(json!({
            "products": [product_json(), missing_seller, bad_timestamp],
            "hasMore": true
        }))
        .unwrap();

        let ids: Vec<&str> = payload.products.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p-1"]);
        assert_eq!(payload.has_more, Some(true));
    }

    #[test]
    fn test_missing_products_decodes_empty() {
        let payload: FeedPayload = serde_json::from_value(json!({})).unwrap();
        assert!(payload.products.is_empty());
        assert_eq!(payload.has_more, None);
    }

    #[test]
    fn test_failed_envelope_carries_error() {
        let response: ApiResponse<FeedPayload> = serde_json::from_value(json!({
            "success": false,
            "error": {"code": "UNAUTHORIZED", "message": "Invalid token"}
        }))
        .unwrap();

        assert!(!response.success);
        assert!(response.data.is_none());
        assert_eq!(response.error.unwrap().code, "UNAUTHORIZED");
    }

    #[test]
    fn test_view_event_request_body() {
        let event = ViewEvent {
            item_id: "p-9".to_string(),
            duration_secs: 14,
            flushed_at: Utc::now(),
        };
        let body = serde_json::to_value(event.to_request()).unwrap();
        assert_eq!(body, json!({"product_id": "p-9", "duration": 14}));
    }
}
