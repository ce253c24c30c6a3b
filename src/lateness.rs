use crate::error::ProcessError;
use crate::models::{
    Assignment, AssignmentResult, Student, StudentIdentifier, StudentReport,
    SubmissionsByAssignment,
};
use crate::parser::{display_eastern, parse_timestamp};
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// One submission attempt, with its timestamp already parsed
#[derive(Debug)]
struct Attempt<'a> {
    submitted_at: Option<DateTime<Utc>>,
    raw: &'a str,
}

/// An assignment that gets a column in the report
#[derive(Debug)]
struct Column<'a> {
    assignment: &'a Assignment,
    due_at: DateTime<Utc>,
    due_display: String,
}

/// Compute each student's lateness on every assignment that has a due date
/// and at least one submission.
///
/// Students come back ordered by the field `identifier` selects and the
/// assignments inside each report follow (group, position). Only positive
/// deltas count toward the totals.
pub fn process(
    students: &[Student],
    assignments: &[Assignment],
    submissions: &SubmissionsByAssignment,
    identifier: StudentIdentifier,
) -> Result<Vec<StudentReport>, ProcessError> {
    let (attempts, submission_counts) = index_submissions(assignments, submissions)?;

    let mut ordered_students: Vec<&Student> = students.iter().collect();
    ordered_students.sort_by(|a, b| identifier.field(a).cmp(&identifier.field(b)));

    let columns = report_columns(assignments, &submission_counts)?;
    debug!(
        students = ordered_students.len(),
        assignments = assignments.len(),
        columns = columns.len(),
        "Reconciling course data"
    );

    let mut results = Vec::with_capacity(ordered_students.len());

    for student in ordered_students {
        let mut total_lateness = Duration::zero();
        let mut assignment_results = Vec::with_capacity(columns.len());

        for column in &columns {
            let assignment_id = column.assignment.id;

            // Most recent attempt is last after indexing
            let counted = attempts
                .get(&(student.id, assignment_id))
                .and_then(|list| list.last());

            let (submission_date_iso, submitted_at) = match counted {
                Some(attempt) => (attempt.raw.to_string(), attempt.submitted_at),
                None => (String::new(), None),
            };
            let submission_date_display = submitted_at
                .as_ref()
                .map(display_eastern)
                .unwrap_or_default();

            let time_delta = submitted_at.map(|at| at - column.due_at);
            if let Some(delta) = time_delta {
                if delta > Duration::zero() {
                    total_lateness += delta;
                }
            }

            assignment_results.push(AssignmentResult {
                assignment_id,
                assignment_name: column.assignment.name.clone(),
                due_date_iso: column.assignment.due_at.clone().unwrap_or_default(),
                due_date_display: column.due_display.clone(),
                submission_date_iso,
                submission_date_display,
                time_delta_seconds: time_delta.map(|d| d.num_seconds()),
            });
        }

        let total_lateness_seconds = total_lateness.num_seconds();
        results.push(StudentReport {
            student_id: student.id,
            student_name: identifier.field(student).map(str::to_string),
            assignments: assignment_results,
            total_lateness_seconds,
            // round down to be nice
            total_lateness_hours: total_lateness_seconds / 3600,
        });
    }

    Ok(results)
}

type AttemptIndex<'a> = HashMap<(u64, u64), Vec<Attempt<'a>>>;

/// Group submissions by (student, assignment), oldest first, and count the
/// submissions each known assignment received across the whole course.
fn index_submissions<'a>(
    assignments: &[Assignment],
    submissions: &'a SubmissionsByAssignment,
) -> Result<(AttemptIndex<'a>, HashMap<u64, usize>), ProcessError> {
    let known: HashSet<u64> = assignments.iter().map(|a| a.id).collect();
    let mut attempts: AttemptIndex<'a> = HashMap::new();
    let mut counts = HashMap::new();

    for (assignment_id, assignment_subs) in submissions {
        if !known.contains(assignment_id) {
            debug!(assignment_id, "Ignoring submissions for unknown assignment");
            continue;
        }

        let mut parsed = Vec::with_capacity(assignment_subs.len());
        for sub in assignment_subs {
            let submitted_at = parse_timestamp("submitted_at", sub.submitted_at.as_deref())?;
            parsed.push((sub.user_id, submitted_at, sub.submitted_at.as_deref().unwrap_or("")));
        }
        // Stable: equal timestamps keep fetch order
        parsed.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

        counts.insert(*assignment_id, parsed.len());
        for (user_id, submitted_at, raw) in parsed {
            attempts
                .entry((user_id, *assignment_id))
                .or_default()
                .push(Attempt { submitted_at, raw });
        }
    }

    Ok((attempts, counts))
}

/// Order assignments by (group, position) and keep the ones that can be
/// scored: a due date and at least one submission from anyone.
fn report_columns<'a>(
    assignments: &'a [Assignment],
    submission_counts: &HashMap<u64, usize>,
) -> Result<Vec<Column<'a>>, ProcessError> {
    let mut ordered = Vec::with_capacity(assignments.len());
    for assignment in assignments {
        let position = assignment.position.ok_or(ProcessError::MissingField {
            assignment_id: assignment.id,
            field: "position",
        })?;
        ordered.push((assignment.assignment_group_id.unwrap_or(0), position, assignment));
    }
    ordered.sort_by_key(|(group, position, _)| (*group, *position));

    let mut columns = Vec::new();
    for (_, _, assignment) in ordered {
        let submitted = submission_counts.get(&assignment.id).copied().unwrap_or(0);
        let due_at = parse_timestamp("due_at", assignment.due_at.as_deref())?;

        match due_at {
            Some(due_at) if submitted > 0 => columns.push(Column {
                assignment,
                due_display: display_eastern(&due_at),
                due_at,
            }),
            _ => debug!(
                assignment_id = assignment.id,
                submitted,
                has_due_date = due_at.is_some(),
                "Skipping assignment with nothing to compare"
            ),
        }
    }

    Ok(columns)
}
