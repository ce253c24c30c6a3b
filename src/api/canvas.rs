use crate::error::FetchError;
use crate::fetcher::RecordFetcher;
use crate::models::{Assignment, Student, Submission, SubmissionsByAssignment};
use async_trait::async_trait;
use indexmap::IndexMap;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, LINK, USER_AGENT};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, warn};

const PER_PAGE: u32 = 100;
const MAX_ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(2);

#[derive(Clone)]
pub struct CanvasClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl CanvasClient {
    /// `base_url` is the API root, e.g. `https://canvas.instructure.com/api`
    pub fn new(base_url: &str, token: String) -> Result<Self, FetchError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        if !(base_url.starts_with("https://") || base_url.starts_with("http://")) {
            return Err(FetchError::InvalidUrl(base_url));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120)) // 2 minute timeout
            .connect_timeout(Duration::from_secs(30))
            .default_headers(Self::build_headers())
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    fn build_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static("canvas-lateness"));
        headers
    }

    /// Fetch one page, returning its items and the URL of the next page
    async fn get_page<T: DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<(Vec<T>, Option<String>), FetchError> {
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        let next = response
            .headers()
            .get(LINK)
            .and_then(|value| value.to_str().ok())
            .and_then(next_page_url);

        let response_text = response.text().await.map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })?;

        if !status.is_success() {
            return Err(FetchError::Status {
                status,
                url: url.to_string(),
                body: response_text.chars().take(500).collect(),
            });
        }

        let items = serde_json::from_str(&response_text).map_err(|source| FetchError::Decode {
            url: url.to_string(),
            source,
        })?;

        Ok((items, next))
    }

    /// Follow `rel="next"` links until the listing is exhausted
    async fn get_all<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, FetchError> {
        let separator = if path.contains('?') { '&' } else { '?' };
        let mut next = Some(format!(
            "{}{}{}per_page={}",
            self.base_url, path, separator, PER_PAGE
        ));
        let mut all_items = Vec::new();

        while let Some(url) = next.take() {
            // Retry network failures and 5xx responses only
            let mut attempt = 1;
            let (items, next_url) = loop {
                match self.get_page::<T>(&url).await {
                    Ok(page) => break page,
                    Err(e) if e.is_transient() && attempt < MAX_ATTEMPTS => {
                        warn!(%url, attempt, error = %e, "Request failed, retrying");
                        attempt += 1;
                        tokio::time::sleep(RETRY_DELAY).await;
                    }
                    Err(e) => return Err(e),
                }
            };

            debug!(%url, count = items.len(), "Fetched page");
            all_items.extend(items);
            next = next_url;
        }

        Ok(all_items)
    }
}

#[async_trait]
impl RecordFetcher for CanvasClient {
    async fn fetch_students(&self, course_id: &str) -> Result<Vec<Student>, FetchError> {
        info!("API fetching students for course: {}", course_id);
        let path = format!(
            "/v1/courses/{}/users?enrollment_type[]=student&include[]=email",
            course_id
        );
        let students: Vec<Student> = self.get_all(&path).await?;
        debug!("Students in course: {:?}", students);
        Ok(students)
    }

    async fn fetch_assignments(&self, course_id: &str) -> Result<Vec<Assignment>, FetchError> {
        info!("API fetching assignments for course: {}", course_id);
        let path = format!("/v1/courses/{}/assignments", course_id);
        let assignments: Vec<Assignment> = self.get_all(&path).await?;
        debug!(
            "Assignments list: {:?}",
            assignments.iter().map(|a| a.id).collect::<Vec<_>>()
        );
        Ok(assignments)
    }

    async fn fetch_submissions(
        &self,
        course_id: &str,
        assignment_ids: &[u64],
    ) -> Result<SubmissionsByAssignment, FetchError> {
        info!(
            "API fetching submissions for course {} and {} assignments",
            course_id,
            assignment_ids.len()
        );

        let mut results = IndexMap::with_capacity(assignment_ids.len());
        for (position, assignment_id) in assignment_ids.iter().enumerate() {
            info!(
                "[{} of {}] Fetching submissions for assignment_id: {}...",
                position + 1,
                assignment_ids.len(),
                assignment_id
            );
            let path = format!(
                "/v1/courses/{}/assignments/{}/submissions?include[]=assignment",
                course_id, assignment_id
            );
            let submissions: Vec<Submission> = self.get_all(&path).await?;
            debug!(
                assignment_id,
                count = submissions.len(),
                "Fetched submissions"
            );
            results.insert(*assignment_id, submissions);
        }

        Ok(results)
    }
}

/// Extract the `rel="next"` target from a `Link` header
pub fn next_page_url(link: &str) -> Option<String> {
    link.split(',').find_map(|part| {
        let mut pieces = part.split(';');
        let target = pieces.next()?.trim();
        let is_next = pieces.any(|param| {
            let param = param.trim();
            param == "rel=\"next\"" || param == "rel=next"
        });

        if is_next {
            target
                .strip_prefix('<')
                .and_then(|t| t.strip_suffix('>'))
                .map(str::to_string)
        } else {
            None
        }
    })
}
