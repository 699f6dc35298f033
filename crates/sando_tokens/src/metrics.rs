//! Human-readable build metrics

use crate::layer::BuildLayerResult;

const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];

/// `512` -> `512 B`, `1536` -> `1.5 KB`
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut size = bytes as f64 / 1024.0;
    let mut unit = UNITS[0];
    for next in &UNITS[1..] {
        if size < 1024.0 {
            break;
        }
        size /= 1024.0;
        unit = next;
    }
    format!("{size:.1} {unit}")
}

/// `850` -> `850 ms`, `1250` -> `1.25 s`
pub fn format_duration(ms: u64) -> String {
    if ms < 1000 {
        format!("{ms} ms")
    } else {
        format!("{:.2} s", ms as f64 / 1000.0)
    }
}

fn status(result: &BuildLayerResult) -> &'static str {
    match (result.success, result.skipped) {
        (true, true) => "up to date",
        (true, false) => "built",
        (false, _) => "FAILED",
    }
}

/// Plain-text table of per-layer results followed by a totals row and any
/// error messages
pub fn summary_table(results: &[BuildLayerResult], total_duration_ms: u64) -> String {
    let rows: Vec<[String; 5]> = results
        .iter()
        .map(|r| {
            [
                r.layer_name.clone(),
                status(r).to_string(),
                r.file_count.to_string(),
                format_bytes(r.total_size_bytes),
                format_duration(r.duration_ms),
            ]
        })
        .collect();

    let total_files: usize = results.iter().map(|r| r.file_count).sum();
    let total_bytes: u64 = results.iter().map(|r| r.total_size_bytes).sum();
    let totals = [
        "total".to_string(),
        if results.iter().all(|r| r.success) { "ok" } else { "FAILED" }.to_string(),
        total_files.to_string(),
        format_bytes(total_bytes),
        format_duration(total_duration_ms),
    ];
    let header = ["Layer", "Status", "Files", "Size", "Duration"].map(str::to_string);

    let mut widths = [0usize; 5];
    for row in std::iter::once(&header).chain(&rows).chain(std::iter::once(&totals)) {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let render = |row: &[String; 5]| -> String {
        let line = format!(
            "{:<w0$}  {:<w1$}  {:>w2$}  {:>w3$}  {:>w4$}",
            row[0],
            row[1],
            row[2],
            row[3],
            row[4],
            w0 = widths[0],
            w1 = widths[1],
            w2 = widths[2],
            w3 = widths[3],
            w4 = widths[4],
        );
        format!("{}\n", line.trim_end())
    };

    let mut out = render(&header);
    out.push_str(&format!("{}\n", "-".repeat(widths.iter().sum::<usize>() + 8)));
    for row in &rows {
        out.push_str(&render(row));
    }
    out.push_str(&render(&totals));

    for result in results {
        if let Some(message) = &result.error_message {
            out.push_str(&format!("\n{}: {}\n", result.layer_name, message));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn result(name: &str, success: bool, files: usize, bytes: u64) -> BuildLayerResult {
        BuildLayerResult {
            layer_name: name.to_string(),
            success,
            skipped: false,
            file_count: files,
            files: Vec::new(),
            total_size_bytes: bytes,
            duration_ms: 12,
            error_message: (!success).then(|| "boom".to_string()),
        }
    }

    #[test]
    fn bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn durations() {
        assert_eq!(format_duration(850), "850 ms");
        assert_eq!(format_duration(1250), "1.25 s");
    }

    #[test]
    fn table_lists_layers_and_totals() {
        let results = vec![
            result("ingredients", true, 3, 2048),
            BuildLayerResult::up_to_date("flavors"),
            result("recipes", false, 0, 0),
        ];
        let table = summary_table(&results, 40);
        assert_eq!(
            table,
            "\
Layer        Status      Files    Size  Duration
------------------------------------------------
ingredients  built           3  2.0 KB     12 ms
flavors      up to date      0     0 B      0 ms
recipes      FAILED          0     0 B     12 ms
total        FAILED          3  2.0 KB     40 ms

recipes: boom
"
        );
    }
}
