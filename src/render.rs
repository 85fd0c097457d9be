use crate::models::TableSummary;
use crate::services::chart::ChartSpec;
use chrono::Utc;
use uuid::Uuid;

const CHART_KINDS: [(&str, &str); 8] = [
    ("bar", "Bar Chart"),
    ("pie", "Pie Chart"),
    ("line", "Line Chart"),
    ("histogram", "Histogram"),
    ("scatter", "Scatter Plot"),
    ("box", "Box Plot"),
    ("area", "Area Chart"),
    ("heatmap", "Heatmap"),
];

pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn page(analysis: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>Anomaly Detection &amp; Insights Dashboard</title>
    <link rel="stylesheet" href="https://cdnjs.cloudflare.com/ajax/libs/bootstrap/5.3.0/css/bootstrap.min.css">
</head>
<body>
<div class="container text-center" style="max-width: 960px; margin-top: 40px;">
    <h3 class="mt-3">Anomaly Detection &amp; Insights Dashboard</h3>
    <form action="/upload" method="post" enctype="multipart/form-data" class="mb-4">
        <input type="file" name="file" class="form-control mb-2" required>
        <button type="submit" class="btn btn-primary">Upload &amp; Analyze</button>
    </form>
    {analysis}
    <footer class="text-muted mt-4">Generated {timestamp} UTC</footer>
</div>
</body>
</html>"#,
        analysis = analysis,
        timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S"),
    )
}

pub fn index_page() -> String {
    page("")
}

pub fn error_page(message: &str) -> String {
    page(&format!(
        "<h4 class=\"text-danger\">{}</h4><br><a href=\"/\">Go Back</a>",
        escape(message)
    ))
}

pub fn report_page(dataset: Uuid, summary: &TableSummary) -> String {
    let mut body = String::new();
    body.push_str(&format!(
        "<h5>Summary ({} rows, {} columns)</h5>",
        summary.row_count, summary.column_count
    ));

    body.push_str("<h5>Missing Values:</h5>");
    if summary.missing_values.columns.is_empty() {
        body.push_str("<p>No Missing Values</p>");
    } else {
        body.push_str("<table class=\"table table-bordered\"><tr><th>Column</th><th>Missing Values</th></tr>");
        for entry in &summary.missing_values.columns {
            body.push_str(&format!(
                "<tr><td>{}</td><td>{}</td></tr>",
                escape(&entry.column),
                entry.missing
            ));
        }
        body.push_str("</table>");
    }

    body.push_str("<h5>Error Patterns:</h5>");
    if summary.error_patterns.records.is_empty() {
        body.push_str("<p>No Error Patterns Detected.</p>");
    } else {
        body.push_str("<table class=\"table table-bordered\"><tr><th>Error Type</th><th>Column</th><th>Count</th></tr>");
        for record in &summary.error_patterns.records {
            body.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape(&record.token),
                escape(&record.column),
                record.count
            ));
        }
        body.push_str("</table>");
    }

    body.push_str("<h5>Category Insights:</h5>");
    for insight in &summary.category_insights {
        body.push_str(&format!(
            "<h6>{} (Total: {})</h6>",
            escape(&insight.column),
            insight.non_missing
        ));
        body.push_str("<table class=\"table table-bordered table-sm\"><tr><th>Value</th><th>Count</th></tr>");
        for entry in &insight.top_values {
            body.push_str(&format!(
                "<tr><td>{}</td><td>{}</td></tr>",
                escape(&entry.value),
                entry.count
            ));
        }
        body.push_str("</table>");
    }

    body.push_str(&chart_form(dataset, &summary.columns));
    page(&body)
}

fn chart_form(dataset: Uuid, columns: &[String]) -> String {
    let column_options: String = columns
        .iter()
        .map(|col| format!("<option value=\"{0}\">{0}</option>", escape(col)))
        .collect();
    let axis_options = format!("<option value=\"\"></option>{}", column_options);
    let kind_options: String = CHART_KINDS
        .iter()
        .map(|(value, label)| format!("<option value=\"{}\">{}</option>", value, label))
        .collect();

    format!(
        r#"<form method="post" action="/visualize">
    <input type="hidden" name="dataset" value="{dataset}">
    <select name="column" multiple class="form-control mt-2">{column_options}</select>
    <select name="chart_type" class="form-control mt-2">{kind_options}</select>
    <label class="mt-2">X axis</label>
    <select name="x_axis" class="form-control">{axis_options}</select>
    <label class="mt-2">Y axis</label>
    <select name="y_axis" class="form-control">{axis_options}</select>
    <button type="submit" class="btn btn-primary mt-3">Generate Charts</button>
</form>"#,
    )
}

pub fn charts_page(specs: &[ChartSpec]) -> String {
    let mut body = String::from("<h5>Selected Charts:</h5>");
    for spec in specs {
        let json = serde_json::to_string(spec).unwrap_or_else(|_| "{}".to_string());
        body.push_str(&format!(
            "<div class=\"chart\" data-spec=\"{}\"></div>",
            escape(&json)
        ));
    }
    body.push_str("<br><a href=\"/\">Go Back</a>");
    page(&body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::*;

    #[test]
    fn escapes_html_metacharacters() {
        assert_eq!(escape("<b>&\"'"), "&lt;b&gt;&amp;&quot;&#39;");
    }

    #[test]
    fn report_page_marks_clean_tables() {
        let summary = TableSummary {
            row_count: 2,
            column_count: 1,
            columns: vec!["a".to_string()],
            missing_values: MissingValueReport { columns: vec![] },
            error_patterns: ErrorPatternReport { records: vec![] },
            category_insights: vec![],
        };
        let html = report_page(Uuid::new_v4(), &summary);
        assert!(html.contains("No Missing Values"));
        assert!(html.contains("No Error Patterns Detected."));
        assert!(html.contains("name=\"dataset\""));
    }

    #[test]
    fn chart_page_embeds_spec_json() {
        let spec = ChartSpec::Bar {
            title: "c".to_string(),
            categories: vec!["x".to_string()],
            counts: vec![1],
        };
        let html = charts_page(&[spec]);
        assert!(html.contains("data-spec="));
        assert!(html.contains("&quot;kind&quot;:&quot;bar&quot;"));
    }
}
