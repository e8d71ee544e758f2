//! The remote side: dashboard pagination and concurrent level fetches.
//!
//! Transport and markup live behind two seams, [`RemoteClient`] and
//! [`LevelParser`]. [`RemoteRepository`] drives them: it walks the dashboard
//! with a [`DashboardCursor`] and fetches every level page of a course on a
//! bounded task group.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use lexisync_core::{
    config::{DEFAULT_MAX_CONCURRENT_FETCHES, DEFAULT_PAGE_LIMIT},
    types::{join_url, DIFFICULT_ITEMS_PATH},
    CourseEntity, CourseId, LevelEntity, LevelId, WordEntity, WordId,
};

use crate::error::SyncError;
use crate::repository::Repository;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Offset/limit window over the dashboard.
///
/// The endpoint treats `limit` as inclusive, so a page holds up to `limit + 1`
/// courses and the next page starts `limit + 1` further on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardCursor {
    pub offset: u32,
    pub limit: u32,
}

impl DashboardCursor {
    pub fn first(limit: u32) -> Self {
        Self { offset: 0, limit }
    }

    pub fn next(self) -> Self {
        Self {
            offset: self.offset + self.limit + 1,
            limit: self.limit,
        }
    }
}

impl Default for DashboardCursor {
    fn default() -> Self {
        Self::first(DEFAULT_PAGE_LIMIT)
    }
}

/// A course as the dashboard reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCourse {
    pub id: u64,
    pub name: String,
    pub url: String,
    /// Total words in the course.
    pub num_things: u32,
    pub num_levels: u32,
    #[serde(default)]
    pub difficult: u32,
}

impl RawCourse {
    pub fn into_entity(self) -> CourseEntity {
        let difficult_url = join_url(&self.url, DIFFICULT_ITEMS_PATH);
        CourseEntity {
            id: CourseId(self.id),
            name: self.name,
            url: self.url,
            difficult: self.difficult,
            num_words: self.num_things,
            num_levels: self.num_levels,
            difficult_url,
            levels_urls: vec![],
            levels: vec![],
            is_disabled: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardPage {
    pub courses: Vec<RawCourse>,
    pub has_more: bool,
}

// ---------------------------------------------------------------------------
// Seams
// ---------------------------------------------------------------------------

/// Transport to the learning platform.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    async fn fetch_dashboard_page(&self, cursor: DashboardCursor)
        -> Result<DashboardPage, SyncError>;

    /// Raw body of one level page.
    async fn fetch_level_page(&self, url: &str) -> Result<String, SyncError>;
}

/// Turns a raw level page into a [`LevelEntity`].
pub trait LevelParser: Send + Sync {
    fn parse_level(&self, raw: &str, number: u32) -> Result<LevelEntity, SyncError>;
}

#[derive(Debug, Deserialize)]
struct RawLevel {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    course_id: Option<u64>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    words: Vec<RawWord>,
}

#[derive(Debug, Deserialize)]
struct RawWord {
    id: u64,
    word_a: String,
    word_b: String,
    #[serde(default)]
    is_learned: bool,
}

/// Parser for level pages delivered as JSON:
///
/// ```json
/// { "id": 42, "course_id": 5, "name": "Basics",
///   "words": [{ "id": 7, "word_a": "cat", "word_b": "кот", "is_learned": false }] }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonLevelParser;

impl LevelParser for JsonLevelParser {
    fn parse_level(&self, raw: &str, number: u32) -> Result<LevelEntity, SyncError> {
        let parsed: RawLevel = serde_json::from_str(raw)
            .map_err(|e| SyncError::parse(format!("level {number}"), e))?;
        // 0 until the repository (or the update manager) knows the real id
        let level_id = LevelId(parsed.id.unwrap_or(0));
        Ok(LevelEntity {
            id: parsed.id.map(LevelId),
            number,
            course_id: CourseId(parsed.course_id.unwrap_or(0)),
            name: parsed.name,
            words: parsed
                .words
                .into_iter()
                .map(|w| WordEntity {
                    id: WordId(w.id),
                    level_id,
                    word_a: w.word_a,
                    word_b: w.word_b,
                    is_learned: w.is_learned,
                })
                .collect(),
        })
    }
}

/// Level number encoded as the last path segment of a level URL.
pub fn level_number(url: &str) -> Option<u32> {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .and_then(|seg| seg.parse().ok())
}

// ---------------------------------------------------------------------------
// RemoteRepository
// ---------------------------------------------------------------------------

/// Fresh-data [`Repository`] over a [`RemoteClient`] and a [`LevelParser`].
#[derive(Clone)]
pub struct RemoteRepository {
    client: Arc<dyn RemoteClient>,
    parser: Arc<dyn LevelParser>,
    page_limit: u32,
    max_concurrent_fetches: usize,
}

impl RemoteRepository {
    pub fn new(client: Arc<dyn RemoteClient>, parser: Arc<dyn LevelParser>) -> Self {
        Self {
            client,
            parser,
            page_limit: DEFAULT_PAGE_LIMIT,
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
        }
    }

    pub fn with_page_limit(mut self, limit: u32) -> Self {
        self.page_limit = limit;
        self
    }

    pub fn with_max_concurrent_fetches(mut self, n: usize) -> Self {
        self.max_concurrent_fetches = n.max(1);
        self
    }
}

async fn gather(
    set: &mut JoinSet<Result<LevelEntity, SyncError>>,
) -> Result<Vec<LevelEntity>, SyncError> {
    let mut levels = Vec::with_capacity(set.len());
    let mut first_error = None;
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(Ok(level)) => levels.push(level),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "level fetch failed");
                first_error.get_or_insert(e);
            }
            Err(e) => {
                first_error.get_or_insert(SyncError::Task(e.to_string()));
            }
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(levels),
    }
}

#[async_trait]
impl Repository for RemoteRepository {
    /// Walk the dashboard until `has_more` goes false.
    async fn get_courses(&self) -> Result<Vec<CourseEntity>, SyncError> {
        let mut cursor = DashboardCursor::first(self.page_limit);
        let mut courses = Vec::new();
        loop {
            let page = self.client.fetch_dashboard_page(cursor).await?;
            tracing::debug!(
                offset = cursor.offset,
                count = page.courses.len(),
                has_more = page.has_more,
                "dashboard page"
            );
            let empty = page.courses.is_empty();
            courses.extend(page.courses.into_iter().map(RawCourse::into_entity));
            if !page.has_more {
                break;
            }
            if empty {
                tracing::warn!(offset = cursor.offset, "empty dashboard page claims more; stopping");
                break;
            }
            cursor = cursor.next();
        }
        courses.sort_by_key(|c| c.id);
        Ok(courses)
    }

    /// Fetch every level page of `course` concurrently and gather them.
    ///
    /// Any failed page fails the whole course. Dropping the returned future
    /// aborts the fetches still in flight.
    async fn get_levels(&self, course: &CourseEntity) -> Result<Vec<LevelEntity>, SyncError> {
        let mut course = course.clone();
        course.make_level_urls();

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_fetches));
        let mut set = JoinSet::new();
        for (idx, url) in course.levels_urls.iter().enumerate() {
            let client = Arc::clone(&self.client);
            let parser = Arc::clone(&self.parser);
            let semaphore = Arc::clone(&semaphore);
            let url = url.clone();
            let number = level_number(&url).unwrap_or(idx as u32 + 1);
            set.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| SyncError::Task(e.to_string()))?;
                let raw = client.fetch_level_page(&url).await?;
                parser.parse_level(&raw, number).map_err(|e| match e {
                    SyncError::Parse { reason, .. } => SyncError::parse(url.as_str(), reason),
                    other => other,
                })
            });
        }

        let mut levels = gather(&mut set).await?;
        for level in &mut levels {
            level.course_id = course.id;
            if let Some(id) = level.id {
                for word in &mut level.words {
                    word.level_id = id;
                }
            }
        }
        levels.sort_by_key(|l| l.number);
        tracing::debug!(course_id = %course.id, count = levels.len(), "levels fetched");
        Ok(levels)
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct PagedClient {
        pages: Vec<DashboardPage>,
        levels: HashMap<String, String>,
        seen: Mutex<Vec<DashboardCursor>>,
    }

    #[async_trait]
    impl RemoteClient for PagedClient {
        async fn fetch_dashboard_page(
            &self,
            cursor: DashboardCursor,
        ) -> Result<DashboardPage, SyncError> {
            let idx = self.seen.lock().unwrap().len();
            self.seen.lock().unwrap().push(cursor);
            self.pages
                .get(idx)
                .cloned()
                .ok_or_else(|| SyncError::fetch("dashboard", "no such page"))
        }

        async fn fetch_level_page(&self, url: &str) -> Result<String, SyncError> {
            self.levels
                .get(url)
                .cloned()
                .ok_or_else(|| SyncError::fetch(url, "404"))
        }
    }

    fn raw(id: u64) -> RawCourse {
        RawCourse {
            id,
            name: format!("course {id}"),
            url: format!("/course/{id}/x/"),
            num_things: 3,
            num_levels: 2,
            difficult: 1,
        }
    }

    fn client(pages: Vec<DashboardPage>, levels: &[(&str, &str)]) -> Arc<PagedClient> {
        Arc::new(PagedClient {
            pages,
            levels: levels
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            seen: Mutex::default(),
        })
    }

    fn repo(client: Arc<PagedClient>) -> RemoteRepository {
        RemoteRepository::new(client, Arc::new(JsonLevelParser))
    }

    #[test]
    fn cursor_steps_past_inclusive_limit() {
        let c = DashboardCursor::default();
        assert_eq!(c, DashboardCursor { offset: 0, limit: 4 });
        assert_eq!(c.next().offset, 5);
        assert_eq!(c.next().next().offset, 10);
    }

    #[test]
    fn raw_course_maps_to_entity() {
        let course = raw(5).into_entity();
        assert_eq!(course.num_words, 3);
        assert_eq!(course.difficult_url, "/course/5/x/difficult-items/");
        assert!(!course.is_disabled);
    }

    #[test]
    fn level_number_from_url() {
        assert_eq!(level_number("/course/5/x/3"), Some(3));
        assert_eq!(level_number("/course/5/x/3/"), Some(3));
        assert_eq!(level_number("/course/5/x/"), None);
    }

    #[test]
    fn parser_rejects_garbage() {
        let err = JsonLevelParser.parse_level("<html>", 2).unwrap_err();
        assert!(matches!(err, SyncError::Parse { .. }));
    }

    #[tokio::test]
    async fn pages_are_merged_until_has_more_is_false() {
        let c = client(
            vec![
                DashboardPage {
                    courses: vec![raw(3), raw(1)],
                    has_more: true,
                },
                DashboardPage {
                    courses: vec![raw(2)],
                    has_more: false,
                },
            ],
            &[],
        );
        let courses = repo(Arc::clone(&c)).get_courses().await.unwrap();
        let ids: Vec<u64> = courses.iter().map(|c| c.id.0).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        let seen = c.seen.lock().unwrap().clone();
        assert_eq!(seen.iter().map(|c| c.offset).collect::<Vec<_>>(), vec![0, 5]);
    }

    #[tokio::test]
    async fn empty_page_claiming_more_stops_the_walk() {
        let c = client(
            vec![DashboardPage {
                courses: vec![],
                has_more: true,
            }],
            &[],
        );
        let courses = repo(c).get_courses().await.unwrap();
        assert!(courses.is_empty());
    }

    #[tokio::test]
    async fn levels_get_parent_ids_and_order() {
        let c = client(
            vec![],
            &[
                (
                    "/course/5/x/2",
                    r#"{"id": 43, "name": "Two", "words": [{"id": 8, "word_a": "dog", "word_b": "пёс"}]}"#,
                ),
                (
                    "/course/5/x/1",
                    r#"{"id": 42, "course_id": 999, "name": "One", "words": []}"#,
                ),
            ],
        );
        let course = raw(5).into_entity();
        let levels = repo(c)
            .with_max_concurrent_fetches(1)
            .get_levels(&course)
            .await
            .unwrap();

        assert_eq!(levels.len(), 2);
        assert_eq!(levels[0].number, 1);
        assert_eq!(levels[0].course_id, CourseId(5));
        assert_eq!(levels[1].words[0].level_id, LevelId(43));
    }

    #[tokio::test]
    async fn one_missing_page_fails_the_course() {
        let c = client(vec![], &[("/course/5/x/1", r#"{"id": 42}"#)]);
        let err = repo(c).get_levels(&raw(5).into_entity()).await.unwrap_err();
        assert!(matches!(err, SyncError::Fetch { .. }));
        assert!(err.is_recoverable());
    }
}
