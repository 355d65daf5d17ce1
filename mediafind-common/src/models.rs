use serde::{Deserialize, Serialize};

/// A single ranked hit returned by the media index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaResult {
    pub media_id: String,
    /// Relevance in `[0, 1]`, higher is better. Computed remotely.
    pub score: f32,
    pub media_type: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    /// Caller-defined JSON, kept as an opaque string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
}

/// Response shape shared by text and content search.
///
/// `results` stays in backend ranking order. `truncated` is authoritative
/// and is never recomputed client-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<MediaResult>,
    pub total_results: u64,
    #[serde(default)]
    pub truncated: bool,
}

impl SearchResponse {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumInfo {
    pub id: String,
    pub name: String,
    #[serde(rename = "mediaCount", default)]
    pub media_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub version: String,
    #[serde(rename = "totalMediaCount", default)]
    pub total_media_count: u64,
    #[serde(default)]
    pub albums: Vec<AlbumInfo>,
    #[serde(rename = "supportedTypes", default)]
    pub supported_types: Vec<String>,
}

/// Body of `POST /search`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextSearchRequest {
    pub query: String,
    pub max_results: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album_id: Option<String>,
}

/// Body of `POST /albums`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateAlbumRequest {
    pub name: String,
}

/// Body returned by a successful upload. Extra fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    #[serde(rename = "mediaId")]
    pub media_id: String,
}

/// `{ "error": "..." }` body sent with non-2xx responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_search_response() {
        let json = r#"{
            "results": [{
                "mediaId": "mock-0",
                "score": 1.0,
                "mediaType": "video/mp4",
                "url": "https://picsum.photos/id/0/800/600",
                "thumbnailUrl": "https://picsum.photos/id/0/400/300",
                "metadata": "{\"tags\":[\"sample\"]}"
            }, {
                "mediaId": "mock-1",
                "score": 0.95,
                "mediaType": "image/jpeg",
                "url": "https://picsum.photos/id/17/800/600"
            }],
            "totalResults": 40,
            "truncated": true
        }"#;
        let resp: SearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.len(), 2);
        assert_eq!(resp.results[0].media_id, "mock-0");
        assert_eq!(
            resp.results[0].thumbnail_url.as_deref(),
            Some("https://picsum.photos/id/0/400/300")
        );
        assert!(resp.results[1].thumbnail_url.is_none());
        assert!(resp.results[1].metadata.is_none());
        assert_eq!(resp.total_results, 40);
        assert!(resp.truncated);
    }

    #[test]
    fn parse_server_info() {
        let json = r#"{
            "version": "0.3.0",
            "totalMediaCount": 42,
            "albums": [{"id": "album-1", "name": "Vacation Photos", "mediaCount": 24}],
            "supportedTypes": ["image/jpeg", "video/mp4"]
        }"#;
        let info: ServerInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.total_media_count, 42);
        assert_eq!(info.albums.len(), 1);
        assert_eq!(info.albums[0].media_count, 24);
        assert_eq!(info.supported_types, vec!["image/jpeg", "video/mp4"]);
    }

    #[test]
    fn upload_response_ignores_extra_fields() {
        let json = r#"{"mediaId": "mock-1700000000000", "success": true}"#;
        let resp: UploadResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.media_id, "mock-1700000000000");
    }

    #[test]
    fn text_search_request_skips_missing_album() {
        let req = TextSearchRequest {
            query: "beach".to_string(),
            max_results: 20,
            album_id: None,
        };
        assert_eq!(
            serde_json::to_string(&req).unwrap(),
            r#"{"query":"beach","maxResults":20}"#
        );

        let req = TextSearchRequest {
            album_id: Some("album-2".to_string()),
            ..req
        };
        assert_eq!(
            serde_json::to_string(&req).unwrap(),
            r#"{"query":"beach","maxResults":20,"albumId":"album-2"}"#
        );
    }

    #[test]
    fn media_result_omits_absent_optionals() {
        let result = MediaResult {
            media_id: "m1".to_string(),
            score: 0.5,
            media_type: "image/png".to_string(),
            url: "/media/m1".to_string(),
            thumbnail_url: None,
            metadata: None,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["mediaId"], "m1");
        assert!(json.get("thumbnailUrl").is_none());
        assert!(json.get("metadata").is_none());
    }
}
