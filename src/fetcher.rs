use crate::cache::{self, CacheStore};
use crate::error::FetchError;
use crate::models::{Assignment, CourseData, Student, SubmissionsByAssignment};
use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::info;

/// Source of the three raw course collections
#[async_trait]
pub trait RecordFetcher: Send + Sync {
    async fn fetch_students(&self, course_id: &str) -> Result<Vec<Student>, FetchError>;

    async fn fetch_assignments(&self, course_id: &str) -> Result<Vec<Assignment>, FetchError>;

    async fn fetch_submissions(
        &self,
        course_id: &str,
        assignment_ids: &[u64],
    ) -> Result<SubmissionsByAssignment, FetchError>;
}

/// Everything the lateness calculation needs for one course
#[derive(Debug, Clone, PartialEq)]
pub struct Course {
    pub students: Vec<Student>,
    pub assignments: Vec<Assignment>,
    pub submissions: SubmissionsByAssignment,
}

/// Load course data from the cache and/or the API.
///
/// With `use_cache`, collections already in the cache are reused and only the
/// missing ones are fetched. The cache is rewritten after every fetch so a
/// failed run can resume. `connect` is only called when something has to be
/// fetched.
pub async fn load_course_data<F, C>(
    course_id: &str,
    cache: &dyn CacheStore,
    use_cache: bool,
    connect: C,
) -> Result<Course>
where
    F: RecordFetcher,
    C: FnOnce() -> Result<F>,
{
    let mut data = if use_cache {
        cache::load_snapshot(cache, course_id)
            .context("Failed to read cached course data")?
            .unwrap_or_default()
    } else {
        CourseData::default()
    };

    if !data.is_complete() {
        let fetcher = connect()?;

        if data.students.is_none() {
            let students = fetcher
                .fetch_students(course_id)
                .await
                .context("Failed to fetch students")?;
            data.students = Some(students);
            save(cache, course_id, &data)?;
        }

        if data.assignments.is_none() {
            let assignments = fetcher
                .fetch_assignments(course_id)
                .await
                .context("Failed to fetch assignments")?;
            data.assignments = Some(assignments);
            save(cache, course_id, &data)?;
        }

        if data.submissions.is_none() {
            let assignment_ids: Vec<u64> = data
                .assignments
                .iter()
                .flatten()
                .map(|a| a.id)
                .collect();
            let submissions = fetcher
                .fetch_submissions(course_id, &assignment_ids)
                .await
                .context("Failed to fetch submissions")?;
            data.submissions = Some(submissions);
            save(cache, course_id, &data)?;
        }
    } else {
        info!("Using cached data for course {}", course_id);
    }

    Ok(Course {
        students: data.students.unwrap_or_default(),
        assignments: data.assignments.unwrap_or_default(),
        submissions: data.submissions.unwrap_or_default(),
    })
}

fn save(cache: &dyn CacheStore, course_id: &str, data: &CourseData) -> Result<()> {
    cache::save_snapshot(cache, course_id, data).context("Failed to write course data cache")
}
