//! Resistance-gene sunburst: genes nested under their drug class.
//!
//! The plotly crate does not expose a sunburst trace, so the figure is
//! written as a standalone HTML page around the plotly.js CDN bundle, with
//! the trace, layout, and export config injected as JSON.

use indexmap::IndexMap;
use serde_json::json;

use crate::table::SampleTable;
use crate::visualization::PlotError;

const SUNBURST_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Resistance gene sunburst</title>
    <script src="https://cdn.plot.ly/plotly-2.35.2.min.js" charset="utf-8"></script>
</head>
<body>
    <div id="sunburst" style="width:1200px;height:600px;"></div>
    <script>
        Plotly.newPlot("sunburst", [{{trace}}], {{layout}}, {{config}});
    </script>
</body>
</html>"#;

/// Builds the sunburst page from a gene table with `drug_class`, `gene_id`,
/// `total`, and `proportion` columns.
///
/// Leaf segments are genes sized by `total` and colored by `proportion`
/// (proportion of chromosomal hits, RdBu scale). Class segments carry the
/// sum of their genes' totals, with `branchvalues: "total"` so plotly treats
/// the value as the whole ring rather than an extra remainder; the displayed
/// label+value then shows the class total. Class color is the total-weighted
/// mean proportion of the class.
pub fn build_html(table: &SampleTable) -> Result<String, PlotError> {
    let classes = table.column_str("drug_class")?;
    let genes = table.column_str("gene_id")?;
    let totals = table.column_f64("total")?;
    let proportions = table.column_f64("proportion")?;

    // (total, total-weighted proportion) per drug class, in table order
    let mut class_sums: IndexMap<&str, (f64, f64)> = IndexMap::new();
    for ((&class, &total), &proportion) in classes.iter().zip(&totals).zip(&proportions) {
        let entry = class_sums.entry(class).or_insert((0.0, 0.0));
        entry.0 += total;
        entry.1 += total * proportion;
    }

    let mut ids: Vec<String> = Vec::new();
    let mut labels: Vec<String> = Vec::new();
    let mut parents: Vec<String> = Vec::new();
    let mut values: Vec<f64> = Vec::new();
    let mut colors: Vec<f64> = Vec::new();

    for (class, &(total, weighted)) in &class_sums {
        ids.push(class.to_string());
        labels.push(class.to_string());
        parents.push(String::new());
        values.push(total);
        colors.push(if total > 0.0 { weighted / total } else { 0.0 });
    }

    for (((class, gene), &total), &proportion) in
        classes.iter().zip(&genes).zip(&totals).zip(&proportions)
    {
        // class-qualified id keeps genes shared by classes distinct
        ids.push(format!("{}/{}", class, gene));
        labels.push(gene.to_string());
        parents.push(class.to_string());
        values.push(total);
        colors.push(proportion);
    }

    let trace = json!({
        "type": "sunburst",
        "ids": ids,
        "labels": labels,
        "parents": parents,
        "values": values,
        "branchvalues": "total",
        "maxdepth": 3,
        "textinfo": "label+value",
        "marker": {
            "colors": colors,
            "colorscale": "RdBu",
            "showscale": true,
            "colorbar": {
                "title": { "text": "Proportion chromosomal" },
                "x": 1
            }
        }
    });
    let layout = json!({
        "margin": { "t": 1, "l": 1, "r": 1, "b": 1 },
        "font": { "size": 14 }
    });
    let config = json!({
        "toImageButtonOptions": {
            "format": "png",
            "filename": "ResistanceGeneSunburst",
            "height": 600,
            "width": 1200,
            "scale": 3
        }
    });

    Ok(SUNBURST_TEMPLATE
        .replace("{{trace}}", &serde_json::to_string(&trace)?)
        .replace("{{layout}}", &serde_json::to_string(&layout)?)
        .replace("{{config}}", &serde_json::to_string(&config)?))
}
