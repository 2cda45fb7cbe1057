//! Operator-facing text dumps.
//!
//! Delimiter-separated tables for troubleshooting a semester's tag
//! computation: the per-tag detail (every contributing module score and
//! weight next to the final average and rank), the tag catalog, and a flat
//! per-student CSV. None of this is user-facing output; the rendering
//! layers own that.

use crate::capitalization::{resolve_score, standard_coefficient_sum};
use crate::config::EngineConfig;
use crate::core::StudentId;
use crate::ranking::Rank;
use crate::semester::SemesterTagTable;
use crate::snapshot::{NotesSnapshot, SnapshotStore};

pub const DEFAULT_DELIMITER: &str = ";";

/// Detail dump of one tag: per student, every contributing module's
/// resolved score, normalized weight and raw weight, then the stored
/// average, rank and weight sums.
///
/// `students` restricts the rows to the listed students; `None` dumps every
/// active student. Unknown tags produce the name/id columns only.
pub fn tag_detail(
    table: &SemesterTagTable,
    snapshot: &dyn NotesSnapshot,
    store: &dyn SnapshotStore,
    config: &EngineConfig,
    tag: &str,
    students: Option<&[StudentId]>,
    delimiter: &str,
) -> String {
    let known = table
        .tag_dictionary()
        .is_some_and(|tags| tags.contains(tag));

    let mut out = String::new();
    out.push_str(&format!("{:>15}{delimiter}etudid{delimiter}", "name"));
    if known {
        if let Some(modules) = table.tag_dictionary().and_then(|tags| tags.modules_for(tag)) {
            for tagged in modules.values() {
                out.push_str(&format!(
                    "{}{delimiter}{:.1}{delimiter}coeff{delimiter}",
                    tagged.module_code, tagged.tag_weight
                ));
            }
        }
        out.push_str(
            &["average", "rank", "enrolled", "total_weight", "raw_total"].join(delimiter),
        );
    }
    out.push('\n');

    let total = standard_coefficient_sum(snapshot);
    let depth = config.capitalization_depth();
    for student in table.students() {
        if let Some(filter) = students {
            if !filter.contains(student) {
                continue;
            }
        }
        let name = table
            .identity(student)
            .map(|identity| identity.display_name())
            .unwrap_or_else(|| student.to_string());
        let name: String = name.chars().take(15).collect();
        out.push_str(&format!("{name:>15}{delimiter}{student}{delimiter}"));

        if known {
            if let Some(modules) = table.tag_dictionary().and_then(|tags| tags.modules_for(tag))
            {
                for modimpl_id in modules.keys() {
                    let resolved =
                        resolve_score(snapshot, store, student, modimpl_id, depth, config.ue_scan);
                    let note = resolved
                        .score
                        .map(|score| score.to_string())
                        .unwrap_or_else(|| "-".to_string());
                    let weight = resolved
                        .weight
                        .map(|w| format!("{w:.5}"))
                        .unwrap_or_else(|| "-".to_string());
                    let raw = resolved
                        .weight
                        .map(|w| format!("{:.2}", w * total))
                        .unwrap_or_else(|| "???".to_string());
                    out.push_str(&format!(
                        "{note}{delimiter}{weight}{delimiter}{raw}{delimiter}"
                    ));
                }
            }
            out.push_str(&average_cell(
                table.average_of(tag, student),
                table.rank_of(tag, student),
                table.enrolled_count(),
                delimiter,
            ));
            let weight_sum = table.total_weight_of(tag, student);
            let weight_cell = weight_sum
                .map(|w| format!("{w:.5}"))
                .unwrap_or_else(|| "-".to_string());
            let raw_cell = weight_sum
                .map(|w| format!("{:.2}", w * total))
                .unwrap_or_else(|| "???".to_string());
            out.push_str(&format!("{delimiter}{weight_cell}{delimiter}{raw_cell}"));
        }
        out.push('\n');
    }
    out
}

/// Catalog of the semester's tags: each tag with its modules, raw
/// coefficients and tag weights.
pub fn tag_catalog(table: &SemesterTagTable, snapshot: &dyn NotesSnapshot) -> String {
    let mut out = format!("Semester {} [{}]\n", table.name(), table.semester_id());
    out.push_str(&format!(
        " -> coefficient sum: {}\n",
        standard_coefficient_sum(snapshot)
    ));
    if let Some(tags) = table.tag_dictionary() {
        for tag in tags.tag_names() {
            let entries: Vec<String> = tags
                .modules_for(tag)
                .into_iter()
                .flatten()
                .map(|(modimpl_id, tagged)| {
                    format!(
                        "{} ({}*{}) {}",
                        tagged.module_code, tagged.coefficient, tagged.tag_weight, modimpl_id
                    )
                })
                .collect();
            // The catalog line ends with a trailing separator after the
            // last module, matching the per-tag dump consumed by operators.
            out.push_str(&format!(" > {tag}: {},\n", entries.join(", ")));
        }
    }
    out
}

/// Flat CSV of every computed tag: average, rank and enrollment count per
/// student.
///
/// A non-`.` decimal separator is substituted over the whole document, so
/// make sure ids do not contain dots when exporting with `","`.
pub fn table_csv(table: &SemesterTagTable, delimiter: &str, decimal_separator: &str) -> String {
    let mut header: Vec<String> = vec![
        "etudid".to_string(),
        "last_name".to_string(),
        "first_name".to_string(),
    ];
    for tag in table.tag_names() {
        for column in ["average", "rank", "enrolled"] {
            header.push(format!("{column}_{tag}"));
        }
    }
    let mut out = header.join(delimiter);
    out.push('\n');

    for student in table.students() {
        let identity = table.identity(student);
        let last = identity.map(|i| i.last_name.as_str()).unwrap_or("");
        let first = identity.map(|i| i.first_name.as_str()).unwrap_or("");
        let mut row = vec![student.to_string(), last.to_string(), first.to_string()];
        for tag in table.tag_names() {
            row.push(average_cell(
                table.average_of(tag, student),
                table.rank_of(tag, student),
                table.enrolled_count(),
                delimiter,
            ));
        }
        out.push_str(&row.join(delimiter));
        out.push('\n');
    }

    if decimal_separator != "." {
        out.replace('.', decimal_separator)
    } else {
        out
    }
}

/// `average(delim)rank(delim)count` triple shared by the detail and CSV dumps
fn average_cell(
    average: Option<f64>,
    rank: Option<Rank>,
    enrolled: usize,
    delimiter: &str,
) -> String {
    let average = average
        .map(|value| format!("{value:.2}"))
        .unwrap_or_else(|| "-".to_string());
    let rank = rank
        .map(|rank| rank.to_string())
        .unwrap_or_else(|| "-".to_string());
    format!("{average}{delimiter}{rank}{delimiter}{enrolled}")
}
