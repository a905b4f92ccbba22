use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use survey_cli::pipeline::{PreparedRun, RunResult};
use survey_model::{
    DerivedField, IssueSeverity, RunIssue, RunReport, TableOutcome, TabulationResult,
};

pub fn print_run_summary(result: &RunResult) {
    println!("Data: {}", result.data_dir.display());
    match &result.outputs {
        Some(_) => println!("Output: {}", result.output_dir.display()),
        None => println!("Output: (dry run, nothing written)"),
    }
    println!("Subjects: {}", result.subjects);

    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Table"),
        header_cell("Stratum"),
        header_cell("Status"),
        header_cell("Records"),
        header_cell("Weight"),
        header_cell("Chi-square"),
        header_cell("df"),
        header_cell("p"),
    ]);
    apply_summary_table_style(&mut table);
    for index in 3..8 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    for outcome in &result.outcomes {
        let stratum = outcome
            .stratum()
            .map_or_else(|| dim_cell("-"), |s| Cell::new(s.level.label()));
        match outcome {
            TableOutcome::Computed(computed) => {
                let (statistic, df, p) = match &computed.test {
                    Some(test) => (
                        Cell::new(format!("{:.3}", test.statistic)),
                        Cell::new(test.degrees_of_freedom),
                        p_value_cell(test.p_value, test.low_expected_warning),
                    ),
                    None => (dim_cell("-"), dim_cell("-"), dim_cell("-")),
                };
                table.add_row(vec![
                    name_cell(&computed.name),
                    stratum,
                    Cell::new("OK").fg(Color::Green),
                    Cell::new(computed.included_records),
                    Cell::new(format_weight(computed.total_weight)),
                    statistic,
                    df,
                    p,
                ]);
            }
            TableOutcome::Skipped { name, .. } => {
                table.add_row(vec![
                    name_cell(name),
                    stratum,
                    Cell::new("SKIPPED").fg(Color::Yellow),
                    dim_cell("-"),
                    dim_cell("-"),
                    dim_cell("-"),
                    dim_cell("-"),
                    dim_cell("-"),
                ]);
            }
        }
    }
    println!("{table}");

    for computed in result.outcomes.iter().filter_map(TableOutcome::result) {
        print_result(computed);
    }
    print_issue_table(&result.report);
}

/// Weighted percentages of one computed table.
fn print_result(result: &TabulationResult) {
    let mut title = result.name.clone();
    if let Some(stratum) = &result.stratum {
        title.push_str(&format!(" [{} = {}]", stratum.field, stratum.level.label()));
    }
    println!();
    println!("{title}");

    let mut table = Table::new();
    apply_table_style(&mut table);
    match &result.columns {
        Some(columns) => {
            let mut header = vec![header_cell(&result.rows.field)];
            header.extend(columns.levels.iter().map(|level| header_cell(level.label())));
            header.push(header_cell("Total"));
            table.set_header(header);
            for (i, level) in result.rows.levels.iter().enumerate() {
                let mut row = vec![Cell::new(level.label())];
                row.extend(
                    result.cells[i]
                        .iter()
                        .map(|count| Cell::new(format_percent(count.row_percent))),
                );
                row.push(Cell::new(format_weight(result.row_totals[i])).fg(Color::DarkGrey));
                table.add_row(row);
            }
            for index in 1..=columns.levels.len() + 1 {
                align_column(&mut table, index, CellAlignment::Right);
            }
        }
        None => {
            table.set_header(vec![
                header_cell(&result.rows.field),
                header_cell("Weighted"),
                header_cell("Percent"),
                header_cell("Records"),
            ]);
            for (i, level) in result.rows.levels.iter().enumerate() {
                let count = result.cells[i][0];
                table.add_row(vec![
                    Cell::new(level.label()),
                    Cell::new(format_weight(count.weight)),
                    Cell::new(format_percent(count.total_percent)),
                    Cell::new(count.records),
                ]);
            }
            for index in 1..4 {
                align_column(&mut table, index, CellAlignment::Right);
            }
        }
    }
    println!("{table}");
    if result.excluded.total() > 0 {
        println!(
            "Excluded: {} missing weight, {} negative weight, {} missing category",
            result.excluded.missing_weight,
            result.excluded.negative_weight,
            result.excluded.missing_category
        );
    }
}

pub fn print_issue_table(report: &RunReport) {
    if report.issues.is_empty() {
        return;
    }
    let mut issues: Vec<&RunIssue> = report.issues.iter().collect();
    issues.sort_by_key(|issue| issue.severity);

    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Severity"),
        header_cell("Module"),
        header_cell("Table"),
        header_cell("Count"),
        header_cell("Message"),
    ]);
    apply_issue_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Center);
    align_column(&mut table, 3, CellAlignment::Right);
    for issue in issues {
        table.add_row(vec![
            severity_cell(issue.severity),
            optional_cell(issue.module.as_deref()),
            optional_cell(issue.table.as_deref()),
            issue
                .count
                .map_or_else(|| dim_cell("-"), Cell::new),
            Cell::new(&issue.message),
        ]);
    }
    println!();
    println!("Issues:");
    println!("{table}");
}

pub fn print_inspection(run: &PreparedRun) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Module"),
        header_cell("Rows"),
        header_cell("Columns"),
        header_cell("Missing cells"),
        header_cell("Sentinels"),
        header_cell("SHA-256"),
    ]);
    apply_summary_table_style(&mut table);
    for index in 1..5 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    for loaded in &run.loaded.modules {
        let quality = &loaded.quality;
        table.add_row(vec![
            name_cell(&quality.module),
            Cell::new(quality.rows),
            Cell::new(quality.columns),
            Cell::new(quality.total_missing()),
            Cell::new(quality.total_replacements()),
            dim_cell(short_hash(&loaded.fingerprint.sha256)),
        ]);
    }
    println!("{table}");

    let merge = &run.prepared.merge;
    println!();
    println!("Subjects after merge: {}", merge.subjects);
    let mut coverage = Table::new();
    coverage.set_header(vec![
        header_cell("Module"),
        header_cell("Present"),
        header_cell("Absent"),
        header_cell("Blank IDs"),
    ]);
    apply_table_style(&mut coverage);
    for index in 1..4 {
        align_column(&mut coverage, index, CellAlignment::Right);
    }
    for (module, present) in &merge.rows_by_module {
        coverage.add_row(vec![
            name_cell(module),
            Cell::new(present),
            Cell::new(merge.missing_by_module.get(module).copied().unwrap_or(0)),
            Cell::new(merge.blank_ids_by_module.get(module).copied().unwrap_or(0)),
        ]);
    }
    println!("{coverage}");

    let derivation = &run.prepared.derivation;
    println!();
    println!(
        "Hypertension indeterminate: {} of {}",
        derivation.indeterminate_hypertension, derivation.records
    );
    for (field, missing) in &derivation.missing_by_field {
        println!("  {field}: {missing} missing");
    }
    print_issue_table(&run.report);
}

pub fn print_fields() {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Field"),
        header_cell("Description"),
        header_cell("Levels"),
    ]);
    apply_table_style(&mut table);
    for field in DerivedField::ALL {
        let levels: Vec<String> = field
            .levels()
            .iter()
            .map(|level| level.label().to_string())
            .collect();
        table.add_row(vec![
            name_cell(field.name()),
            Cell::new(field.description()),
            Cell::new(levels.join(", ")),
        ]);
    }
    println!("{table}");
    println!("Any other name is read as a raw column of the merged dataset.");
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(140);
}

fn apply_issue_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(160);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn name_cell(name: &str) -> Cell {
    Cell::new(name)
        .fg(Color::Blue)
        .add_attribute(Attribute::Bold)
}

fn optional_cell(value: Option<&str>) -> Cell {
    value.map_or_else(|| dim_cell("-"), Cell::new)
}

fn severity_cell(severity: IssueSeverity) -> Cell {
    match severity {
        IssueSeverity::Error => Cell::new("ERROR").fg(Color::Red),
        IssueSeverity::Warning => Cell::new("WARN").fg(Color::Yellow),
    }
}

/// Low expected counts make the p-value unreliable; show it dimmed with a marker.
fn p_value_cell(p: f64, low_expected: bool) -> Cell {
    let text = format_p_value(p);
    if low_expected {
        Cell::new(format!("{text} *")).fg(Color::DarkGrey)
    } else if p < 0.05 {
        Cell::new(text).add_attribute(Attribute::Bold)
    } else {
        Cell::new(text)
    }
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}

fn format_p_value(p: f64) -> String {
    if p < 0.001 {
        "<0.001".to_string()
    } else {
        format!("{p:.3}")
    }
}

fn format_percent(value: f64) -> String {
    format!("{value:.1}%")
}

fn format_weight(value: f64) -> String {
    let rounded = format!("{value:.0}");
    let (sign, digits) = match rounded.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", rounded.as_str()),
    };
    let mut grouped = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{sign}{grouped}")
}

fn short_hash(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_are_grouped() {
        assert_eq!(format_weight(0.0), "0");
        assert_eq!(format_weight(999.4), "999");
        assert_eq!(format_weight(1234567.8), "1,234,568");
        assert_eq!(format_weight(-4200.0), "-4,200");
    }

    #[test]
    fn small_p_values_are_floored() {
        assert_eq!(format_p_value(0.0004), "<0.001");
        assert_eq!(format_p_value(0.0455), "0.046");
        assert_eq!(format_p_value(1.0), "1.000");
    }

    #[test]
    fn hashes_are_shortened() {
        assert_eq!(short_hash("abcdef0123456789"), "abcdef012345");
        assert_eq!(short_hash("abc"), "abc");
    }
}
