use crate::models::StudentReport;
use crate::parser::{parse_timestamp, sheet_eastern};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const DELTA_COLUMNS: [&str; 3] = ["Due", "Submitted", "Delta (seconds)"];

/// Files written for one run
#[derive(Debug, Clone)]
pub struct ReportPaths {
    pub results_json: PathBuf,
    pub delta_csv: PathBuf,
    pub lateness_csv: PathBuf,
}

impl ReportPaths {
    /// `<course>-results-<YYYYMMDD>` plus a suffix per artifact
    pub fn new(dir: &Path, course_id: &str, date: NaiveDate) -> Self {
        let stem = format!("{}-results-{}", course_id, date.format("%Y%m%d"));
        Self {
            results_json: dir.join(format!("{}.json", stem)),
            delta_csv: dir.join(format!("{}-deltas.csv", stem)),
            lateness_csv: dir.join(format!("{}-lateness.csv", stem)),
        }
    }
}

/// Write the results JSON and both CSV sheets
pub fn write_reports(
    dir: &Path,
    course_id: &str,
    date: NaiveDate,
    results: &[StudentReport],
) -> Result<ReportPaths> {
    let paths = ReportPaths::new(dir, course_id, date);
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    export_results_json(&paths.results_json, results)?;
    export_delta_csv(&paths.delta_csv, results)?;
    export_lateness_csv(&paths.lateness_csv, results)?;

    Ok(paths)
}

pub fn export_results_json(path: &Path, results: &[StudentReport]) -> Result<()> {
    info!("Writing data to: {}", path.display());
    let json = serde_json::to_string_pretty(results).context("Failed to serialize results")?;
    fs::write(path, json).context("Failed to write results JSON")
}

/// One row per student, one (due, submitted, delta) triplet per assignment
pub fn export_delta_csv(path: &Path, results: &[StudentReport]) -> Result<()> {
    info!("Writing delta sheet to: {}", path.display());

    // Every report carries the same assignments, so the first one sets the columns
    let columns: Vec<String> = results
        .first()
        .map(|r| {
            r.assignments
                .iter()
                .map(|a| format!("{} ({})", a.assignment_name, a.assignment_id))
                .collect()
        })
        .unwrap_or_default();

    let mut title_row = vec!["Assignment \u{2192}".to_string()];
    let mut header_row = vec!["Students \u{2193}".to_string()];
    for column in &columns {
        for header in DELTA_COLUMNS {
            title_row.push(column.clone());
            header_row.push(header.to_string());
        }
    }

    let mut wtr = csv::Writer::from_path(path).context("Failed to create CSV file")?;
    wtr.write_record(&title_row)
        .context("Failed to write CSV headers")?;
    wtr.write_record(&header_row)
        .context("Failed to write CSV headers")?;

    for student in results {
        let mut record = vec![student.display_name().to_string()];

        for assignment in &student.assignments {
            record.push(sheet_date(&assignment.due_date_iso)?);
            record.push(sheet_date(&assignment.submission_date_iso)?);
            record.push(
                assignment
                    .time_delta_seconds
                    .map(|d| d.to_string())
                    .unwrap_or_default(),
            );
        }

        wtr.write_record(&record)
            .context("Failed to write CSV record")?;
    }

    wtr.flush().context("Failed to flush CSV writer")?;
    Ok(())
}

/// One row per student with the lateness totals
pub fn export_lateness_csv(path: &Path, results: &[StudentReport]) -> Result<()> {
    info!("Writing lateness sheet to: {}", path.display());

    let mut wtr = csv::Writer::from_path(path).context("Failed to create CSV file")?;
    wtr.write_record(["Students", "Total in hours", "Total in seconds"])
        .context("Failed to write CSV headers")?;

    for student in results {
        wtr.write_record([
            student.display_name().to_string(),
            student.total_lateness_hours.to_string(),
            student.total_lateness_seconds.to_string(),
        ])
        .context("Failed to write CSV record")?;
    }

    wtr.flush().context("Failed to flush CSV writer")?;
    Ok(())
}

fn sheet_date(iso: &str) -> Result<String> {
    let parsed = parse_timestamp("sheet date", Some(iso))?;
    Ok(parsed.as_ref().map(sheet_eastern).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AssignmentResult;

    fn output_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("canvas_lateness_export_{}_{}", name, std::process::id()))
    }

    fn sample_results() -> Vec<StudentReport> {
        vec![
            StudentReport {
                student_id: 1,
                student_name: Some("Curie, Marie".to_string()),
                assignments: vec![AssignmentResult {
                    assignment_id: 10,
                    assignment_name: "Lab 1".to_string(),
                    due_date_iso: "2023-01-10T17:00:00Z".to_string(),
                    due_date_display: "Tue, Jan 10 at 12:00PM".to_string(),
                    submission_date_iso: "2023-01-10T19:30:00Z".to_string(),
                    submission_date_display: "Tue, Jan 10 at 02:30PM".to_string(),
                    time_delta_seconds: Some(9000),
                }],
                total_lateness_seconds: 9000,
                total_lateness_hours: 2,
            },
            StudentReport {
                student_id: 2,
                student_name: None,
                assignments: vec![AssignmentResult {
                    assignment_id: 10,
                    assignment_name: "Lab 1".to_string(),
                    due_date_iso: "2023-01-10T17:00:00Z".to_string(),
                    due_date_display: "Tue, Jan 10 at 12:00PM".to_string(),
                    submission_date_iso: String::new(),
                    submission_date_display: String::new(),
                    time_delta_seconds: None,
                }],
                total_lateness_seconds: 0,
                total_lateness_hours: 0,
            },
        ]
    }

    #[test]
    fn test_report_paths() {
        let date = NaiveDate::from_ymd_opt(2023, 1, 31).unwrap();
        let paths = ReportPaths::new(Path::new("out"), "1234", date);
        assert_eq!(paths.results_json, PathBuf::from("out/1234-results-20230131.json"));
        assert_eq!(paths.delta_csv, PathBuf::from("out/1234-results-20230131-deltas.csv"));
        assert_eq!(
            paths.lateness_csv,
            PathBuf::from("out/1234-results-20230131-lateness.csv")
        );
    }

    #[test]
    fn test_write_reports() {
        let dir = output_dir("all");
        let date = NaiveDate::from_ymd_opt(2023, 1, 31).unwrap();
        let results = sample_results();

        let paths = write_reports(&dir, "1234", date, &results).unwrap();

        let json = fs::read_to_string(&paths.results_json).unwrap();
        let parsed: Vec<StudentReport> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, results);
        assert!(json.contains("\"time_delta_seconds\": null"));

        let deltas = fs::read_to_string(&paths.delta_csv).unwrap();
        let lines: Vec<&str> = deltas.lines().collect();
        assert_eq!(
            lines[0],
            "Assignment \u{2192},Lab 1 (10),Lab 1 (10),Lab 1 (10)"
        );
        assert_eq!(lines[1], "Students \u{2193},Due,Submitted,Delta (seconds)");
        assert_eq!(
            lines[2],
            "\"Curie, Marie\",10-Jan-23 12:00:00 PM,10-Jan-23 02:30:00 PM,9000"
        );
        assert_eq!(lines[3], ",10-Jan-23 12:00:00 PM,,");

        let lateness = fs::read_to_string(&paths.lateness_csv).unwrap();
        let lines: Vec<&str> = lateness.lines().collect();
        assert_eq!(lines[0], "Students,Total in hours,Total in seconds");
        assert_eq!(lines[1], "\"Curie, Marie\",2,9000");
        assert_eq!(lines[2], ",0,0");

        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_delta_csv_without_assignments() {
        let dir = output_dir("empty");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("deltas.csv");
        let mut results = sample_results();
        for r in &mut results {
            r.assignments.clear();
        }

        export_delta_csv(&path, &results).unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 4);

        fs::remove_dir_all(dir).ok();
    }
}
