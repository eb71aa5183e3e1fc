//! Server-rendered page: the URL form, an error banner, the analysis
//! summary line and a grid of design cards.

use std::fmt::Write;

use crate::flow::FlowState;
use crate::models::{FabricAnalysisResult, SuitDesign};
use crate::schema::FABRIC_IMAGE_URL_FIELD;

pub const GRID_COLUMNS: usize = 3;

/// What the form shows besides the flow state.
#[derive(Debug, Clone, Default)]
pub struct FormView {
    pub fabric_image_url: String,
    pub field_error: Option<String>,
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
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

pub fn summary_line(analysis: &FabricAnalysisResult) -> String {
    format!(
        "Material Composition: {} (Confidence: {})",
        analysis.material_composition,
        analysis.confidence_percent()
    )
}

pub fn render_page(state: &FlowState, form: &FormView) -> String {
    let mut body = String::new();
    render_form(&mut body, state, form);

    if let Some(message) = state.error() {
        let _ = write!(
            body,
            r#"<div class="alert alert-destructive" role="alert"><p class="alert-title">Error</p><p class="alert-description">{}</p></div>"#,
            escape_html(message)
        );
    }

    if let Some(analysis) = state.analysis() {
        let _ = write!(body, r#"<div class="summary"><p>{}</p></div>"#, escape_html(&summary_line(analysis)));
    }

    if let FlowState::Success(report) = state {
        body.push_str(r#"<div class="results"><h2>AI-Generated Suit Design Concepts</h2>"#);
        let _ = write!(body, r#"<div class="grid grid-cols-{GRID_COLUMNS}">"#);
        for design in &report.designs {
            render_card(&mut body, design);
        }
        body.push_str("</div></div>");
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Tailored AI Designs</title>
<link rel="stylesheet" href="/static/styles.css">
</head>
<body>
<div class="container">
<div class="card main-card">
<div class="card-header">
<h1 class="card-title">Tailored AI Designs</h1>
<p class="card-description">Enter a fabric image URL to generate unique women's suit designs.</p>
</div>
<div class="card-content">
{body}
</div>
</div>
</div>
</body>
</html>
"#
    )
}

fn render_form(out: &mut String, state: &FlowState, form: &FormView) {
    let loading = state.is_loading();
    let invalid = form.field_error.is_some();
    let _ = write!(
        out,
        r#"<form method="post" action="/" class="form" onsubmit="var b=this.querySelector('button');b.disabled=true;b.textContent='Generating...';">
<div class="form-item">
<label for="{field}">Fabric Image URL</label>
<input id="{field}" name="{field}" type="url" required placeholder="Enter URL" value="{value}"{aria}>
<p class="form-description">Please enter a valid URL of the fabric image.</p>
"#,
        field = FABRIC_IMAGE_URL_FIELD,
        value = escape_html(&form.fabric_image_url),
        aria = if invalid { r#" aria-invalid="true""# } else { "" },
    );
    if let Some(message) = &form.field_error {
        let _ = writeln!(out, r#"<p class="form-message">{}</p>"#, escape_html(message));
    }
    let _ = write!(
        out,
        "</div>\n<button type=\"submit\"{}>{}</button>\n</form>\n",
        if loading { " disabled" } else { "" },
        if loading { "Generating..." } else { "Generate Designs" },
    );
}

fn render_card(out: &mut String, design: &SuitDesign) {
    let _ = write!(
        out,
        r#"<div class="card design-card"><div class="card-header"><h3 class="card-title">{}</h3><p class="card-description">{}</p></div><div class="card-content"><p class="font-semibold">Key Properties:</p><ul>"#,
        escape_html(&design.design_name),
        escape_html(&design.description)
    );
    for property in &design.key_properties {
        let _ = write!(out, "<li>{}</li>", escape_html(property));
    }
    out.push_str("</ul></div></div>");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DesignReport;
    use chrono::Utc;
    use uuid::Uuid;

    fn analysis(score: f64) -> FabricAnalysisResult {
        FabricAnalysisResult { material_composition: "Silk Blend".into(), confidence_score: score }
    }

    fn design(name: &str) -> SuitDesign {
        SuitDesign {
            design_name: name.into(),
            description: format!("{name} description"),
            key_properties: vec!["Peak lapels".into(), "Slim fit".into(), "Lined".into()],
        }
    }

    fn success(designs: Vec<SuitDesign>) -> FlowState {
        FlowState::Loading.succeed(DesignReport {
            submission_id: Uuid::new_v4(),
            fabric_image_url: "https://example.com/silk.jpg".parse().unwrap(),
            analysis: analysis(0.85),
            fabric_description: analysis(0.85).describe(),
            designs,
            generated_at: Utc::now(),
        })
    }

    #[test]
    fn summary_uses_two_decimal_percentage() {
        assert_eq!(summary_line(&analysis(0.85)), "Material Composition: Silk Blend (Confidence: 85.00%)");
        assert_eq!(summary_line(&analysis(0.0)), "Material Composition: Silk Blend (Confidence: 0.00%)");
        assert_eq!(summary_line(&analysis(0.333)), "Material Composition: Silk Blend (Confidence: 33.30%)");
    }

    #[test]
    fn success_page_renders_one_card_per_design_in_order() {
        let html = render_page(&success(vec![design("Alpha"), design("Beta"), design("Gamma")]), &FormView::default());

        assert!(html.contains("Material Composition: Silk Blend (Confidence: 85.00%)"));
        assert!(html.contains(r#"<div class="grid grid-cols-3">"#));
        assert_eq!(html.matches(r#"class="card design-card""#).count(), 3);
        assert_eq!(html.matches("<li>Peak lapels</li>").count(), 3);
        let alpha = html.find("Alpha").unwrap();
        let beta = html.find("Beta").unwrap();
        let gamma = html.find("Gamma").unwrap();
        assert!(alpha < beta && beta < gamma);
    }

    #[test]
    fn idle_page_has_only_the_form() {
        let html = render_page(&FlowState::Idle, &FormView::default());
        assert!(html.contains(r#"name="fabricImageUrl""#));
        assert!(html.contains(">Generate Designs</button>"));
        assert!(!html.contains("Material Composition"));
        assert!(!html.contains("design-card"));
        assert!(!html.contains("role=\"alert\""));
    }

    #[test]
    fn loading_disables_submit() {
        let html = render_page(&FlowState::Loading, &FormView::default());
        assert!(html.contains(r#"<button type="submit" disabled>Generating...</button>"#));
    }

    #[test]
    fn error_banner_and_partial_summary() {
        let state = FlowState::Loading.fail("No designs were generated", Some(analysis(0.85)));
        let html = render_page(&state, &FormView::default());
        assert!(html.contains(r#"<p class="alert-description">No designs were generated</p>"#));
        assert!(html.contains("Material Composition: Silk Blend"));
        assert!(!html.contains("grid-cols-3"));
    }

    #[test]
    fn field_error_is_shown_with_submitted_value() {
        let form = FormView { fabric_image_url: "not a url".into(), field_error: Some("Please enter a valid URL".into()) };
        let html = render_page(&FlowState::Idle, &form);
        assert!(html.contains(r#"value="not a url""#));
        assert!(html.contains(r#"<p class="form-message">Please enter a valid URL</p>"#));
        assert!(html.contains(r#"aria-invalid="true""#));
    }

    #[test]
    fn model_text_is_escaped() {
        let mut evil = design("<script>alert(1)</script>");
        evil.key_properties = vec!["\"quoted\" & <b>bold</b>".into()];
        let html = render_page(&success(vec![evil]), &FormView::default());
        assert!(!html.contains("<script>alert(1)</script>"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(html.contains("<li>&quot;quoted&quot; &amp; &lt;b&gt;bold&lt;/b&gt;</li>"));
    }
}
