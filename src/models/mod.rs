use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

// ============================================================================
// Canvas API Models
// ============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Student {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub sortable_name: Option<String>,
    /// Institutional id (HUID) from the student information system
    #[serde(default)]
    pub sis_user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Assignment {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub assignment_group_id: Option<u64>,
    #[serde(default)]
    pub position: Option<i64>,
    #[serde(default)]
    pub due_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Submission {
    pub user_id: u64,
    pub assignment_id: u64,
    #[serde(default)]
    pub submitted_at: Option<String>,
}

/// Submissions keyed by assignment id, in fetch order
pub type SubmissionsByAssignment = IndexMap<u64, Vec<Submission>>;

// ============================================================================
// Cached Course Snapshot
// ============================================================================

/// Raw collections for one course. A collection is `None` until it has been
/// fetched, which lets a partially filled cache resume where it stopped.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct CourseData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub students: Option<Vec<Student>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignments: Option<Vec<Assignment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submissions: Option<SubmissionsByAssignment>,
}

impl CourseData {
    pub fn is_complete(&self) -> bool {
        self.students.is_some() && self.assignments.is_some() && self.submissions.is_some()
    }
}

// ============================================================================
// Identifier Policy
// ============================================================================

/// Which student field labels and orders the report rows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StudentIdentifier {
    #[default]
    Huid,
    Name,
}

impl StudentIdentifier {
    /// Lenient parse: anything other than `huid` or `name` falls back to `huid`.
    pub fn from_arg(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "huid" => StudentIdentifier::Huid,
            "name" => StudentIdentifier::Name,
            other => {
                warn!(value = other, "Unrecognized student identifier, using huid");
                StudentIdentifier::Huid
            }
        }
    }

    pub fn field<'a>(&self, student: &'a Student) -> Option<&'a str> {
        match self {
            StudentIdentifier::Huid => student.sis_user_id.as_deref(),
            StudentIdentifier::Name => student.sortable_name.as_deref(),
        }
    }
}

// ============================================================================
// Internal Models for Processing
// ============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AssignmentResult {
    pub assignment_id: u64,
    pub assignment_name: String,
    pub due_date_iso: String,
    pub due_date_display: String,
    pub submission_date_iso: String,
    pub submission_date_display: String,
    pub time_delta_seconds: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StudentReport {
    pub student_id: u64,
    pub student_name: Option<String>,
    pub assignments: Vec<AssignmentResult>,
    pub total_lateness_seconds: i64,
    pub total_lateness_hours: i64,
}

impl StudentReport {
    pub fn display_name(&self) -> &str {
        self.student_name.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LatenessStats {
    pub total_students: usize,
    pub total_assignments: usize,
    pub late_students: usize,
    pub average_hours: f64,
    pub median_hours: f64,
}

impl LatenessStats {
    pub fn calculate(results: &[StudentReport]) -> Self {
        let total_students = results.len();
        let total_assignments = results
            .first()
            .map(|r| r.assignments.len())
            .unwrap_or(0);
        let late_students = results
            .iter()
            .filter(|r| r.total_lateness_seconds > 0)
            .count();

        let mut hours: Vec<f64> = results
            .iter()
            .map(|r| r.total_lateness_seconds as f64 / 3600.0)
            .collect();
        hours.sort_by(|a, b| a.total_cmp(b));

        let average_hours = if total_students > 0 {
            hours.iter().sum::<f64>() / total_students as f64
        } else {
            0.0
        };

        let median_hours = if !hours.is_empty() {
            let mid = hours.len() / 2;
            if hours.len() % 2 == 0 {
                (hours[mid - 1] + hours[mid]) / 2.0
            } else {
                hours[mid]
            }
        } else {
            0.0
        };

        Self {
            total_students,
            total_assignments,
            late_students,
            average_hours,
            median_hours,
        }
    }
}
