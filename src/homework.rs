use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use tracing::error;

use crate::submissions::{load_all_submissions, Submission, SubmissionStatus};

#[derive(Debug, Clone, PartialEq)]
pub enum GridCell {
    Missing,
    Draft,
    Pending,
    Graded { score: i32, max_score: i32 },
}

impl GridCell {
    fn render(&self) -> String {
        match self {
            GridCell::Missing => "-".to_string(),
            GridCell::Draft => "draft".to_string(),
            GridCell::Pending => "…".to_string(),
            GridCell::Graded { score, max_score } => format!("{score}/{max_score}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultsRow {
    pub student_id: String,
    pub student_name: String,
    pub cells: Vec<GridCell>,
    /// Mean percentage over graded cells only.
    pub average_percent: Option<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultsGrid {
    pub assignments: Vec<String>,
    pub rows: Vec<ResultsRow>,
}

pub fn results_grid(items: &[Submission]) -> ResultsGrid {
    let assignments: Vec<String> = items
        .iter()
        .map(|s| s.assignment_id.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    // Latest name per student id; a renamed student stays one row.
    let mut latest: BTreeMap<&str, (&str, &str)> = BTreeMap::new();
    for s in items {
        let entry = latest
            .entry(s.student_id.as_str())
            .or_insert((s.updated_at.as_str(), s.student_name.as_str()));
        if s.updated_at.as_str() > entry.0 {
            *entry = (s.updated_at.as_str(), s.student_name.as_str());
        }
    }
    let mut students: Vec<(String, String)> = latest
        .into_iter()
        .map(|(id, (_, name))| (name.to_string(), id.to_string()))
        .collect();
    students.sort();

    let rows = students
        .into_iter()
        .map(|(student_name, student_id)| {
            let cells: Vec<GridCell> = assignments
                .iter()
                .map(|a| {
                    items
                        .iter()
                        .find(|s| s.student_id == student_id && &s.assignment_id == a)
                        .map(cell_for)
                        .unwrap_or(GridCell::Missing)
                })
                .collect();
            let percents: Vec<f32> = cells
                .iter()
                .filter_map(|c| match c {
                    GridCell::Graded { score, max_score } if *max_score > 0 => {
                        Some(*score as f32 / *max_score as f32 * 100.0)
                    }
                    _ => None,
                })
                .collect();
            let average_percent = if percents.is_empty() {
                None
            } else {
                Some(percents.iter().sum::<f32>() / percents.len() as f32)
            };
            ResultsRow {
                student_id,
                student_name,
                cells,
                average_percent,
            }
        })
        .collect();

    ResultsGrid { assignments, rows }
}

fn cell_for(sub: &Submission) -> GridCell {
    match (sub.status, sub.score, sub.max_score) {
        (SubmissionStatus::Graded, Some(score), Some(max_score)) => {
            GridCell::Graded { score, max_score }
        }
        (SubmissionStatus::Draft, _, _) => GridCell::Draft,
        _ => GridCell::Pending,
    }
}

pub fn print_submission_table(items: &[Submission]) {
    if items.is_empty() {
        println!("\nNo submissions found yet.\n");
        return;
    }

    println!();
    println!(
        "{:<14} | {:<12} | {:<10} | {:<7} | {:<5} | {}",
        "Student", "Assignment", "Status", "Score", "Flags", "Max AI"
    );
    println!("{}", "-".repeat(72));

    for s in items {
        let score = match (s.score, s.max_score) {
            (Some(score), Some(max)) => format!("{score}/{max}"),
            _ => "-".to_string(),
        };
        let highest = s
            .highest_flag_confidence()
            .map(|c| format!("{:.0}%", c * 100.0))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<14} | {:<12} | {:<10} | {:<7} | {:<5} | {}",
            truncate_for_table(&s.student_name, 14),
            truncate_for_table(&s.assignment_id, 12),
            s.status.to_string(),
            score,
            s.flags.len(),
            highest,
        );
    }

    println!();
}

pub fn print_flag_list(sub: &Submission) {
    println!(
        "\nFlags for {} ({}) on {}:",
        sub.student_name, sub.student_id, sub.assignment_id
    );
    if sub.flags.is_empty() {
        println!("  none\n");
        return;
    }
    for (i, f) in sub.flags.iter().enumerate() {
        println!(
            "  {}. [{} {:.0}%] {}",
            i + 1,
            f.kind.label(),
            f.confidence * 100.0,
            f.detected_at
        );
        println!("     \"{}\"", truncate_for_table(&f.text_snippet.replace('\n', " "), 70));
        if !f.details.is_empty() {
            println!("     {}", f.details);
        }
    }
    println!();
}

pub fn print_results_grid(grid: &ResultsGrid) {
    if grid.rows.is_empty() {
        println!("\nNo results yet.\n");
        return;
    }

    println!();
    print!("{:<16}", "Student");
    for a in &grid.assignments {
        print!(" | {:<9}", truncate_for_table(a, 9));
    }
    println!(" | Avg");
    println!("{}", "-".repeat(16 + grid.assignments.len() * 12 + 8));

    for row in &grid.rows {
        print!("{:<16}", truncate_for_table(&row.student_name, 16));
        for cell in &row.cells {
            print!(" | {:<9}", cell.render());
        }
        match row.average_percent {
            Some(p) => println!(" | {p:.0}%"),
            None => println!(" | -"),
        }
    }

    println!();
}

fn truncate_for_table(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max_len.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

/// Teacher overview, optionally narrowed to one assignment.
pub fn show_review_dashboard(base_path: &Path, assignment: Option<&str>) {
    match load_all_submissions(base_path) {
        Ok(list) => {
            let list: Vec<Submission> = list
                .into_iter()
                .filter(|s| assignment.map_or(true, |a| s.assignment_id == a))
                .collect();
            println!("\nSubmissions overview:");
            print_submission_table(&list);
        }
        Err(e) => error!(error = %e, "could not load submissions"),
    }
}

pub fn show_results(base_path: &Path) {
    match load_all_submissions(base_path) {
        Ok(list) => print_results_grid(&results_grid(&list)),
        Err(e) => error!(error = %e, "could not load submissions"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{PasteGuardConfig, Settings, StudentProfile};

    fn sub(student: &str, assignment: &str, status: SubmissionStatus, score: Option<i32>) -> Submission {
        let settings = Settings {
            version: "test".into(),
            base_path: String::new(),
            student: StudentProfile {
                student_id: student.to_lowercase(),
                student_name: student.into(),
                class_id: "7A".into(),
            },
            paste_guard: PasteGuardConfig::default(),
        };
        let mut s = Submission::new_draft(&settings, assignment);
        s.status = status;
        s.score = score;
        s.max_score = score.map(|_| 10);
        s
    }

    #[test]
    fn grid_has_one_row_per_student_and_sorted_columns() {
        let items = vec![
            sub("Petr", "hw-2", SubmissionStatus::Graded, Some(5)),
            sub("Anna", "hw-1", SubmissionStatus::Graded, Some(10)),
            sub("Anna", "hw-2", SubmissionStatus::Submitted, None),
            sub("Petr", "hw-1", SubmissionStatus::Draft, None),
        ];
        let grid = results_grid(&items);
        assert_eq!(grid.assignments, vec!["hw-1", "hw-2"]);
        assert_eq!(grid.rows.len(), 2);

        let anna = &grid.rows[0];
        assert_eq!(anna.student_name, "Anna");
        assert_eq!(
            anna.cells,
            vec![GridCell::Graded { score: 10, max_score: 10 }, GridCell::Pending]
        );
        assert_eq!(anna.average_percent, Some(100.0));

        let petr = &grid.rows[1];
        assert_eq!(petr.cells[0], GridCell::Draft);
        assert_eq!(petr.average_percent, Some(50.0));
    }

    #[test]
    fn renamed_student_keeps_one_row_with_latest_name() {
        let mut old = sub("Anna", "hw-1", SubmissionStatus::Graded, Some(8));
        old.updated_at = "2026-01-01T08:00:00+00:00".into();
        let mut new = sub("Anna", "hw-2", SubmissionStatus::Graded, Some(6));
        new.student_name = "Anna Nováková".into();
        new.updated_at = "2026-02-01T08:00:00+00:00".into();

        let grid = results_grid(&[new, old]);
        assert_eq!(grid.rows.len(), 1);
        assert_eq!(grid.rows[0].student_id, "anna");
        assert_eq!(grid.rows[0].student_name, "Anna Nováková");
        assert_eq!(
            grid.rows[0].cells,
            vec![
                GridCell::Graded { score: 8, max_score: 10 },
                GridCell::Graded { score: 6, max_score: 10 },
            ]
        );
    }

    #[test]
    fn missing_work_shows_as_dash() {
        let items = vec![
            sub("Anna", "hw-1", SubmissionStatus::Submitted, None),
            sub("Petr", "hw-2", SubmissionStatus::Submitted, None),
        ];
        let grid = results_grid(&items);
        assert_eq!(grid.rows[0].cells[1], GridCell::Missing);
        assert_eq!(grid.rows[0].cells[1].render(), "-");
        assert_eq!(grid.rows[0].average_percent, None);
    }

    #[test]
    fn truncation_is_char_aware() {
        assert_eq!(truncate_for_table("Žofie", 10), "Žofie");
        assert_eq!(truncate_for_table("Přemyslovci", 5), "Přem…");
    }
}
