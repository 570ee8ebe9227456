//! CSV progress report, one row per module.

use crate::gating::{completed_lessons_in_module, module_progress_percent, module_status};
use crate::{Catalog, Result, UserProgress};
use std::io::Write;
use std::path::Path;

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct ReportRow<'a> {
    module_id: &'a str,
    order: u32,
    title: &'a str,
    status: &'static str,
    lessons_completed: usize,
    lessons_total: usize,
    percent: u8,
    quiz_percent: Option<u8>,
}

/// Write the per-module report to any writer
///
/// Returns the number of rows written.
pub fn write_module_report<W: Write>(
    catalog: &Catalog,
    progress: &UserProgress,
    out: W,
) -> Result<usize> {
    let mut writer = csv::Writer::from_writer(out);

    for module in catalog.modules() {
        let quiz_percent = catalog
            .quiz_by_module_id(&module.id)
            .and_then(|q| progress.quiz_results.get(&q.id))
            .map(|r| r.percent);

        writer.serialize(ReportRow {
            module_id: &module.id,
            order: module.order,
            title: &module.title,
            status: module_status(catalog, progress, &module.id).as_str(),
            lessons_completed: completed_lessons_in_module(catalog, progress, &module.id),
            lessons_total: module.lessons.len(),
            percent: module_progress_percent(catalog, progress, &module.id),
            quiz_percent,
        })?;
    }

    writer.flush()?;
    Ok(catalog.total_module_count())
}

/// Write the report to a file, replacing it if present
pub fn export_module_report(catalog: &Catalog, progress: &UserProgress, path: &Path) -> Result<usize> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = std::fs::File::create(path)?;
    let rows = write_module_report(catalog, progress, &file)?;
    file.sync_all()?;

    tracing::info!("Wrote {} module rows to {:?}", rows, path);
    Ok(rows)
}
