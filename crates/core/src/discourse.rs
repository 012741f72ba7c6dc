//! Contract of the document-server (Discourse) client.
//!
//! The HTTP client itself lives outside this crate; the engine only needs the
//! capabilities below. Every call is blocking and fails with a single
//! [`DiscourseError`] kind.

use crate::errors::DiscourseError;

/// Capabilities the engine needs from the document server.
pub trait DiscourseApi {
    /// Hostname of the server, used to classify links as external.
    fn host(&self) -> &str;

    /// Raw Markdown content of the first post of a topic.
    fn retrieve_topic(&self, url: &str) -> Result<String, DiscourseError>;

    /// Create a topic and return its absolute URL.
    fn create_topic(&self, title: &str, content: &str) -> Result<String, DiscourseError>;

    /// Replace the content of the first post of a topic.
    fn update_topic(&self, url: &str, content: &str) -> Result<(), DiscourseError>;

    fn delete_topic(&self, url: &str) -> Result<(), DiscourseError>;

    /// Whether the configured credentials may edit the topic.
    fn check_topic_write_permission(&self, url: &str) -> Result<bool, DiscourseError>;

    /// Absolute form of a possibly path-only topic link.
    fn absolute_url(&self, url: &str) -> String;
}
