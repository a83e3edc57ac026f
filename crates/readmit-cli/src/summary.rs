use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use readmit_core::{MODEL_TYPE, ModelBundle, ScheduleConfig, ServiceResponse, TrainingOutcome};
use readmit_ingest::{DataProvenance, UploadReport};
use readmit_model::format_percent;
use readmit_normalize::DatasetStats;

pub fn print_training_summary(outcome: &TrainingOutcome) {
    let bundle = &outcome.bundle;
    let metrics = bundle.metrics();
    println!("Trained {MODEL_TYPE}");
    println!(
        "Data source: {} ({} records, {} dropped while cleaning)",
        bundle.data_source(),
        bundle.training_records(),
        outcome.cleaning.dropped()
    );

    let mut table = Table::new();
    table.set_header(vec![header_cell("Metric"), header_cell("Value")]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    table.add_row(vec![Cell::new("Accuracy"), metric_cell(format_percent(metrics.accuracy, 2))]);
    table.add_row(vec![Cell::new("ROC AUC"), Cell::new(format!("{:.4}", metrics.auc))]);
    table.add_row(vec![Cell::new("F1"), Cell::new(format!("{:.4}", metrics.f1))]);
    table.add_row(vec![
        Cell::new("CV accuracy"),
        Cell::new(format!("{:.4} ± {:.4}", metrics.cv_mean, metrics.cv_std)),
    ]);
    table.add_row(vec![
        Cell::new("Train / test rows"),
        Cell::new(format!("{} / {}", metrics.train_rows, metrics.test_rows)),
    ]);
    table.add_row(vec![
        Cell::new("Duration"),
        Cell::new(format!("{:.2}s", outcome.elapsed.as_secs_f64())),
    ]);
    table.add_row(vec![Cell::new("Saved"), flag_cell(outcome.persisted)]);
    println!("{table}");
}

pub fn print_model_info(bundle: &ModelBundle, schedule: &ScheduleConfig) {
    let pipeline = bundle.pipeline();
    let metrics = bundle.metrics();
    println!("Model: {MODEL_TYPE}");
    println!("Algorithms: {}", bundle.algorithm_names().join(", "));
    println!(
        "Trained: {} on {} data ({} records)",
        bundle.trained_at().to_rfc3339(),
        bundle.data_source(),
        bundle.training_records()
    );
    println!(
        "Accuracy {}  AUC {:.4}  F1 {:.4}  CV {:.4} ± {:.4}",
        format_percent(metrics.accuracy, 2),
        metrics.auc,
        metrics.f1,
        metrics.cv_mean,
        metrics.cv_std
    );
    if schedule.enabled {
        println!("Auto-retrain: every {}", schedule.cadence());
    } else {
        println!("Auto-retrain: disabled");
    }

    let selected = pipeline.selected_columns();
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Feature"),
        header_cell("Kind"),
        header_cell("Selected"),
    ]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Center);
    for name in pipeline.feature_columns() {
        let kind = pipeline
            .kind_of(name)
            .map_or_else(|| "-".to_string(), |kind| format!("{kind:?}").to_lowercase());
        table.add_row(vec![
            Cell::new(name),
            dim_cell(kind),
            flag_cell(selected.contains(&name.as_str())),
        ]);
    }
    println!("{table}");
}

pub fn print_data_stats(stats: &DatasetStats, source: DataProvenance) {
    println!("Data source: {source}");
    println!("Records: {}", stats.total_records);
    println!(
        "Readmission rate: {}",
        format_percent(stats.readmission_rate, 2)
    );
    println!(
        "Age: mean {:.1}, median {:.1}",
        stats.age_mean, stats.age_median
    );
    println!(
        "Missing values: {}  Complete records: {}",
        stats.missing_values, stats.complete_records
    );

    let mut diagnoses: Vec<(&String, &usize)> = stats.diagnosis_distribution.iter().collect();
    diagnoses.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Diagnosis"),
        header_cell("Records"),
        header_cell("Share"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    align_column(&mut table, 2, CellAlignment::Right);
    let total = stats.total_records.max(1) as f64;
    for (diagnosis, count) in diagnoses {
        table.add_row(vec![
            Cell::new(diagnosis),
            Cell::new(count),
            dim_cell(format_percent(*count as f64 / total, 1)),
        ]);
    }
    println!("{table}");
}

pub fn print_upload_report(report: &UploadReport) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Total"),
        header_cell("Uploaded"),
        header_cell("Failed"),
    ]);
    apply_table_style(&mut table);
    for index in 0..3 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    table.add_row(vec![
        Cell::new(report.total),
        Cell::new(report.uploaded).fg(Color::Green),
        count_cell(report.failed, Color::Red),
    ]);
    println!("{table}");
    if !report.failed_batches.is_empty() {
        let batches: Vec<String> = report
            .failed_batches
            .iter()
            .map(ToString::to_string)
            .collect();
        eprintln!("Failed batches: {}", batches.join(", "));
    }
}

/// Print a service response as indented JSON.
pub fn print_response(response: &ServiceResponse) {
    match serde_json::to_string_pretty(response) {
        Ok(text) => println!("{text}"),
        Err(error) => eprintln!("error: could not encode response: {error}"),
    }
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(100);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(100);
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

fn metric_cell(value: String) -> Cell {
    Cell::new(value)
        .fg(Color::Green)
        .add_attribute(Attribute::Bold)
}

fn flag_cell(value: bool) -> Cell {
    if value {
        Cell::new("✓")
            .fg(Color::Green)
            .add_attribute(Attribute::Bold)
    } else {
        dim_cell("-")
    }
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
