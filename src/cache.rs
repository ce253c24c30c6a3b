use crate::error::CacheError;
use crate::models::CourseData;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Key-value blob store for raw course snapshots
pub trait CacheStore: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>, CacheError>;
    fn write(&self, key: &str, blob: &str) -> Result<(), CacheError>;
}

/// Stores one `<key>-cache.json` file per course in a directory
#[derive(Debug, Clone)]
pub struct JsonFileCache {
    dir: PathBuf,
}

impl JsonFileCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}-cache.json", key))
    }
}

impl CacheStore for JsonFileCache {
    fn read(&self, key: &str) -> Result<Option<String>, CacheError> {
        let path = self.path_for(key);
        if !path.exists() {
            info!("File does not exist: {}", path.display());
            return Ok(None);
        }

        info!("Reading data from: {}", path.display());
        Ok(Some(fs::read_to_string(&path)?))
    }

    fn write(&self, key: &str, blob: &str) -> Result<(), CacheError> {
        let path = self.path_for(key);
        info!("Writing data to: {}", path.display());
        write_file(&path, blob)
    }
}

fn write_file(path: &Path, contents: &str) -> Result<(), CacheError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, contents)?;
    Ok(())
}

/// Read and decode the snapshot for a course, if one was cached
pub fn load_snapshot(
    store: &dyn CacheStore,
    course_id: &str,
) -> Result<Option<CourseData>, CacheError> {
    let Some(blob) = store.read(course_id)? else {
        return Ok(None);
    };

    let data: CourseData = serde_json::from_str(&blob)?;
    debug!(
        students = data.students.is_some(),
        assignments = data.assignments.is_some(),
        submissions = data.submissions.is_some(),
        "Cache contains collections"
    );
    Ok(Some(data))
}

pub fn save_snapshot(
    store: &dyn CacheStore,
    course_id: &str,
    data: &CourseData,
) -> Result<(), CacheError> {
    let blob = serde_json::to_string_pretty(data)?;
    store.write(course_id, &blob)
}
