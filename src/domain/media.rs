use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Photo,
    Video,
    Document,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MediaKind::Photo => "photo",
            MediaKind::Video => "video",
            MediaKind::Document => "document",
        };
        f.write_str(name)
    }
}

/// Opaque handle to a file held by the transport side: a payment receipt,
/// a broadcast attachment, the guide video. The core never sees the bytes;
/// it stores the handle and passes it back when sending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    pub kind: MediaKind,
    pub file_id: String,
}

impl MediaRef {
    pub fn new(kind: MediaKind, file_id: impl Into<String>) -> Self {
        Self {
            kind,
            file_id: file_id.into(),
        }
    }

    /// Payment receipts are accepted as photos or documents, never video.
    pub fn is_receipt(&self) -> bool {
        matches!(self.kind, MediaKind::Photo | MediaKind::Document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receipt_kinds() {
        assert!(MediaRef::new(MediaKind::Photo, "f1").is_receipt());
        assert!(MediaRef::new(MediaKind::Document, "f2").is_receipt());
        assert!(!MediaRef::new(MediaKind::Video, "f3").is_receipt());
    }

    #[test]
    fn test_serde_layout() {
        let media = MediaRef::new(MediaKind::Photo, "abc123");
        let json = serde_json::to_value(&media).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "photo", "file_id": "abc123"}));
    }
}
