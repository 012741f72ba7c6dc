//! In-memory collaborators for unit tests.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::discourse::DiscourseApi;
use crate::errors::{DiscourseError, RepositoryError};
use crate::models::{is_absolute_url, path_only};
use crate::repository::RepositoryApi;

/// Discourse server double keyed by topic path.
pub(crate) struct FakeDiscourse {
    host: String,
    topics: RefCell<BTreeMap<String, String>>,
    denied: RefCell<HashSet<String>>,
    failing: RefCell<HashSet<String>>,
    fail_create: Cell<bool>,
    next_id: Cell<u32>,
    permission_checks: RefCell<Vec<String>>,
    created: RefCell<Vec<(String, String)>>,
    updated: RefCell<Vec<String>>,
    deleted: RefCell<Vec<String>>,
}

impl FakeDiscourse {
    pub(crate) fn new(host: &str) -> Self {
        Self {
            host: host.to_string(),
            topics: RefCell::default(),
            denied: RefCell::default(),
            failing: RefCell::default(),
            fail_create: Cell::new(false),
            next_id: Cell::new(100),
            permission_checks: RefCell::default(),
            created: RefCell::default(),
            updated: RefCell::default(),
            deleted: RefCell::default(),
        }
    }

    pub(crate) fn with_topic(self, url: &str, content: &str) -> Self {
        self.topics
            .borrow_mut()
            .insert(path_only(url).to_string(), content.to_string());
        self
    }

    pub(crate) fn deny_write(&self, url: &str) {
        self.denied.borrow_mut().insert(path_only(url).to_string());
    }

    /// Every call touching `url` fails.
    pub(crate) fn fail_on(&self, url: &str) {
        self.failing.borrow_mut().insert(path_only(url).to_string());
    }

    pub(crate) fn fail_create(&self) {
        self.fail_create.set(true);
    }

    pub(crate) fn topic(&self, url: &str) -> Option<String> {
        self.topics.borrow().get(path_only(url)).cloned()
    }

    pub(crate) fn permission_checks(&self) -> Vec<String> {
        self.permission_checks.borrow().clone()
    }

    /// `(title, url)` of every created topic.
    pub(crate) fn created(&self) -> Vec<(String, String)> {
        self.created.borrow().clone()
    }

    pub(crate) fn updated(&self) -> Vec<String> {
        self.updated.borrow().clone()
    }

    pub(crate) fn deleted(&self) -> Vec<String> {
        self.deleted.borrow().clone()
    }

    fn check_failing(&self, key: &str) -> Result<(), DiscourseError> {
        if self.failing.borrow().contains(key) {
            return Err(DiscourseError(format!("simulated failure for {key}")));
        }
        Ok(())
    }
}

impl DiscourseApi for FakeDiscourse {
    fn host(&self) -> &str {
        &self.host
    }

    fn retrieve_topic(&self, url: &str) -> Result<String, DiscourseError> {
        let key = path_only(url);
        self.check_failing(key)?;
        self.topics
            .borrow()
            .get(key)
            .cloned()
            .ok_or_else(|| DiscourseError(format!("topic not found: {url}")))
    }

    fn create_topic(&self, title: &str, content: &str) -> Result<String, DiscourseError> {
        if self.fail_create.get() {
            return Err(DiscourseError("simulated create failure".into()));
        }
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let slug: String = title
            .to_lowercase()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
            .collect();
        let url = format!("https://{}/t/{slug}/{id}", self.host);
        self.topics
            .borrow_mut()
            .insert(path_only(&url).to_string(), content.to_string());
        self.created
            .borrow_mut()
            .push((title.to_string(), url.clone()));
        Ok(url)
    }

    fn update_topic(&self, url: &str, content: &str) -> Result<(), DiscourseError> {
        let key = path_only(url);
        self.check_failing(key)?;
        let mut topics = self.topics.borrow_mut();
        let topic = topics
            .get_mut(key)
            .ok_or_else(|| DiscourseError(format!("topic not found: {url}")))?;
        *topic = content.to_string();
        self.updated.borrow_mut().push(url.to_string());
        Ok(())
    }

    fn delete_topic(&self, url: &str) -> Result<(), DiscourseError> {
        let key = path_only(url);
        self.check_failing(key)?;
        self.topics.borrow_mut().remove(key);
        self.deleted.borrow_mut().push(url.to_string());
        Ok(())
    }

    fn check_topic_write_permission(&self, url: &str) -> Result<bool, DiscourseError> {
        let key = path_only(url);
        self.check_failing(key)?;
        self.permission_checks.borrow_mut().push(url.to_string());
        Ok(!self.denied.borrow().contains(key))
    }

    fn absolute_url(&self, url: &str) -> String {
        if is_absolute_url(url) {
            url.to_string()
        } else {
            format!("https://{}{}", self.host, url)
        }
    }
}

/// Repository double serving base content for a single tag.
#[derive(Default)]
pub(crate) struct FakeRepository {
    files: HashMap<String, String>,
    tag_missing: bool,
    error: Option<String>,
}

impl FakeRepository {
    pub(crate) fn with_file(mut self, path: &str, content: &str) -> Self {
        self.files.insert(path.to_string(), content.to_string());
        self
    }

    pub(crate) fn without_tag(mut self) -> Self {
        self.tag_missing = true;
        self
    }

    pub(crate) fn failing(mut self, message: &str) -> Self {
        self.error = Some(message.to_string());
        self
    }
}

impl RepositoryApi for FakeRepository {
    fn get_file_content_from_tag(&self, path: &str, tag: &str) -> Result<String, RepositoryError> {
        if self.tag_missing {
            return Err(RepositoryError::TagNotFound(tag.to_string()));
        }
        if let Some(message) = &self.error {
            return Err(RepositoryError::Client(message.clone()));
        }
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| RepositoryError::FileNotFound {
                path: path.to_string(),
                tag: tag.to_string(),
            })
    }
}
