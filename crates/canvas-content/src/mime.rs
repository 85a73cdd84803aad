//! MIME classification of attached files

/// How an attached file enters a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileClass {
    /// `image/*`, sent as an image part
    Image,
    /// `application/pdf`, sent as a file part
    Pdf,
    /// `text/*` or `application/json`, decoded and inlined as text
    Text,
    /// Audio and office documents, sent as a file part
    Binary,
    /// Anything else, replaced by a placeholder
    Unsupported,
}

/// Classify a MIME type
#[must_use]
pub fn classify(mime: &str) -> FileClass {
    let mime = mime.trim().to_ascii_lowercase();
    if mime.starts_with("image/") {
        FileClass::Image
    } else if mime == "application/pdf" {
        FileClass::Pdf
    } else if mime.starts_with("text/") || mime == "application/json" {
        FileClass::Text
    } else if mime.starts_with("audio/")
        || ["word", "excel", "spreadsheet"].iter().any(|family| mime.contains(family))
    {
        FileClass::Binary
    } else {
        FileClass::Unsupported
    }
}
