//! Spreadsheet rendering adapter
//!
//! Consumes the comparison results and writes the cross-linked workbook:
//! an Overview sheet with a similarity histogram, the skipped and
//! not-acquired project lists, one heatmap sheet per language whose cells
//! hyperlink into per-pair detail sheets, and a back link on every detail
//! sheet returning to its heatmap. A JSONL summary lands next to the
//! workbook for machine consumers.
//!
//! Rendering is pure: the same sorted report list produces the same
//! workbook, so output is reproducible for identical inputs.

use anyhow::{Context, Result};
use log::info;
use rust_xlsxwriter::{Chart, ChartType, Color, Format, Url, Workbook, Worksheet};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use crate::model::Project;
use crate::report::{EntityKind, Report};
use crate::schedule::PairReport;
use crate::types::{ColorMode, Language, PairSummary};

/// Three-band palette bounds.
const GREEN: u32 = 0x76FF71;
const YELLOW: u32 = 0xE7FF71;
const RED: u32 = 0xFF7171;

/// Rendering switches from the CLI.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    /// Emit the weight column on detail sheets.
    pub include_weight: bool,
    pub color_mode: ColorMode,
}

/// Write the whole workbook.
///
/// `reports` must be pre-sorted by the caller (language, then name pair) so
/// sheet order is stable; `skipped` lists projects without parseable
/// sources and `unmatched` the catalogue entries that could not be
/// acquired.
pub fn write_workbook(
    path: &Path,
    reports: &[PairReport],
    projects: &[Project],
    skipped: &[String],
    unmatched: &[String],
    options: &RenderOptions,
) -> Result<()> {
    let mut workbook = Workbook::new();

    let overview = workbook.add_worksheet().set_name("Overview")?;
    write_overview(overview, reports, skipped, unmatched)?;

    // Heatmaps first, then the detail sheets they link to; internal links
    // resolve by name once the workbook is complete.
    let mut details: Vec<(String, Language, &Report)> = Vec::new();
    for language in Language::ALL {
        let language_reports: Vec<&PairReport> =
            reports.iter().filter(|r| r.language == language).collect();
        let order = heatmap_order(projects, language);
        if order.is_empty() {
            continue;
        }
        let sheet = workbook
            .add_worksheet()
            .set_name(heatmap_sheet_name(language))?;
        let named = write_heatmap(sheet, language, &order, &language_reports, options)?;
        details.extend(named);
    }

    for (sheet_name, language, report) in details {
        let sheet = workbook.add_worksheet().set_name(&*sheet_name)?;
        write_detail(sheet, language, report, options)?;
    }

    workbook
        .save(path)
        .with_context(|| format!("could not write workbook {}", path.display()))?;
    info!("wrote {}", path.display());
    Ok(())
}

/// Write one root-report summary per line, next to the workbook.
pub fn write_summaries(path: &Path, summaries: &[PairSummary]) -> Result<()> {
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("could not create {}", path.display()))?;
    for summary in summaries {
        let line = serde_json::to_string(summary)?;
        writeln!(file, "{line}")?;
    }
    Ok(())
}

fn heatmap_sheet_name(language: Language) -> String {
    format!("Heatmap {language}")
}

fn detail_sheet_name(language: Language, first: usize, second: usize) -> String {
    let letter = language.label().chars().next().unwrap_or('X');
    format!("report-{letter}-{first}-{second}")
}

/// Projects of a language in heatmap order: templates leading, then
/// submissions, both alphabetical.
fn heatmap_order(projects: &[Project], language: Language) -> Vec<String> {
    let mut templates: Vec<String> = projects
        .iter()
        .filter(|p| p.language == language && p.is_template)
        .map(|p| p.name.clone())
        .collect();
    let mut submissions: Vec<String> = projects
        .iter()
        .filter(|p| p.language == language && !p.is_template)
        .map(|p| p.name.clone())
        .collect();
    templates.sort();
    submissions.sort();
    templates.extend(submissions);
    templates
}

/// Overview: a histogram of root scores in 10-point bins with a column
/// chart, plus the skipped / not-acquired lists.
fn write_overview(
    sheet: &mut Worksheet,
    reports: &[PairReport],
    skipped: &[String],
    unmatched: &[String],
) -> Result<()> {
    let bold = Format::new().set_bold();

    sheet.write_string_with_format(0, 0, "Similarity distribution", &bold)?;
    sheet.write_string_with_format(1, 0, "Score range", &bold)?;
    sheet.write_string_with_format(1, 1, "Pairs", &bold)?;

    let mut bins = [0u32; 10];
    for pair in reports {
        let bin = (pair.report.probability / 10).min(9) as usize;
        bins[bin] += 1;
    }
    for (i, count) in bins.iter().enumerate() {
        let label = if i == 9 {
            "90-100".to_string()
        } else {
            format!("{}-{}", i * 10, i * 10 + 9)
        };
        sheet.write_string(2 + i as u32, 0, label)?;
        sheet.write_number(2 + i as u32, 1, f64::from(*count))?;
    }

    let mut chart = Chart::new(ChartType::Column);
    chart
        .add_series()
        .set_values(("Overview", 2, 1, 11, 1))
        .set_categories(("Overview", 2, 0, 11, 0));
    chart.title().set_name("Similarity distribution");
    sheet.insert_chart(1, 7, &chart)?;

    sheet.write_string_with_format(0, 3, "Skipped projects", &bold)?;
    for (i, name) in skipped.iter().enumerate() {
        sheet.write_string(1 + i as u32, 3, name)?;
    }
    sheet.write_string_with_format(0, 5, "Not acquired", &bold)?;
    for (i, name) in unmatched.iter().enumerate() {
        sheet.write_string(1 + i as u32, 5, name)?;
    }

    sheet.set_column_width(0, 14)?;
    sheet.set_column_width(3, column_width(skipped, 16))?;
    sheet.set_column_width(5, column_width(unmatched, 16))?;
    Ok(())
}

/// Square probability matrix with internal links into detail sheets and a
/// trailing best-match column. Returns the detail sheets to create.
fn write_heatmap<'a>(
    sheet: &mut Worksheet,
    language: Language,
    order: &[String],
    reports: &[&'a PairReport],
    options: &RenderOptions,
) -> Result<Vec<(String, Language, &'a Report)>> {
    let index: BTreeMap<&str, usize> = order
        .iter()
        .enumerate()
        .map(|(i, name)| (name.as_str(), i))
        .collect();

    let top_label = Format::new().set_bold().set_rotation(90);
    let side_label = Format::new().set_bold();
    for (i, name) in order.iter().enumerate() {
        sheet.write_string_with_format(0, 1 + i as u16, name, &top_label)?;
        sheet.write_string_with_format(1 + i as u32, 0, name, &side_label)?;
    }

    let mut details = Vec::new();
    let mut best: BTreeMap<usize, (u32, &str)> = BTreeMap::new();
    for pair in reports {
        let first = pair.report.first.name.as_str();
        let second = pair.report.second.name.as_str();
        let (Some(&fi), Some(&si)) = (index.get(first), index.get(second)) else {
            continue;
        };
        let probability = pair.report.probability;
        let sheet_name = detail_sheet_name(language, fi, si);
        let format = score_format(probability, options.color_mode);
        let target = format!("internal:'{sheet_name}'!A1");
        sheet.write_url_with_format(
            1 + fi as u32,
            1 + si as u16,
            Url::new(&*target).set_text(probability.to_string()),
            &format,
        )?;
        sheet.write_url_with_format(
            1 + si as u32,
            1 + fi as u16,
            Url::new(&*target).set_text(probability.to_string()),
            &format,
        )?;

        for (own, other) in [(fi, second), (si, first)] {
            let entry = best.entry(own).or_insert((probability, other));
            if probability > entry.0 {
                *entry = (probability, other);
            }
        }
        details.push((sheet_name, language, &pair.report));
    }

    let best_col = 1 + order.len() as u16;
    sheet.write_string_with_format(0, best_col, "Best match", &side_label)?;
    for (&row, &(probability, partner)) in &best {
        sheet.write_string(1 + row as u32, best_col, format!("{partner} ({probability})"))?;
    }

    let name_width = column_width(order, 8);
    sheet.set_column_width(0, name_width)?;
    for i in 0..order.len() {
        sheet.set_column_width(1 + i as u16, 5)?;
    }
    sheet.set_column_width(best_col, name_width + 6.0)?;
    sheet.set_row_height(0, (name_width * 5.0).min(220.0))?;
    Ok(details)
}

/// Indented rows of `{kind, left, right, score, [weight]}` for one pair,
/// preceded by a back link to the heatmap.
fn write_detail(
    sheet: &mut Worksheet,
    language: Language,
    report: &Report,
    options: &RenderOptions,
) -> Result<()> {
    let bold = Format::new().set_bold();
    let back = format!("internal:'{}'!A1", heatmap_sheet_name(language));
    sheet.write_url_with_format(0, 0, Url::new(&*back).set_text("back to heatmap"), &bold)?;

    let mut rows = Vec::new();
    collect_detail_rows(report, 0, &mut rows);
    let max_depth = rows.iter().map(|r| r.depth).max().unwrap_or(0);
    let score_col = (max_depth + 3) as u16;

    for (i, row) in rows.iter().enumerate() {
        let r = 1 + i as u32;
        let c = row.depth as u16;
        sheet.write_string_with_format(r, c, row.kind, &bold)?;
        sheet.write_string(r, c + 1, &row.left)?;
        sheet.write_string(r, c + 2, &row.right)?;
        sheet.write_number_with_format(
            r,
            score_col,
            f64::from(row.probability),
            &score_format(row.probability, options.color_mode),
        )?;
        if options.include_weight {
            sheet.write_number(r, score_col + 1, f64::from(row.weight))?;
        }
    }

    for col in 0..=score_col {
        let width = rows
            .iter()
            .flat_map(|row| {
                let c = row.depth as u16;
                [
                    (c, row.kind.len()),
                    (c + 1, row.left.len()),
                    (c + 2, row.right.len()),
                ]
            })
            .filter(|(c, _)| *c == col)
            .map(|(_, len)| len)
            .max()
            .unwrap_or(4);
        sheet.set_column_width(col, (width as f64).max(4.0))?;
    }
    Ok(())
}

struct DetailRow {
    depth: usize,
    kind: &'static str,
    left: String,
    right: String,
    probability: u32,
    weight: u32,
}

/// Flatten the report tree into visualisable rows; a subtree whose root is
/// not worth showing is dropped whole.
fn collect_detail_rows(report: &Report, depth: usize, rows: &mut Vec<DetailRow>) {
    if !report.first.is_visualisable() && !report.second.is_visualisable() {
        return;
    }
    let kind = if report.first.kind == EntityKind::NotFound {
        report.second.kind.label()
    } else {
        report.first.kind.label()
    };
    rows.push(DetailRow {
        depth,
        kind,
        left: report.first.name.clone(),
        right: report.second.name.clone(),
        probability: report.probability,
        weight: report.weight,
    });
    for child in &report.children {
        collect_detail_rows(child, depth + 1, rows);
    }
}

/// Cell format for a score under the configured palette.
fn score_format(score: u32, mode: ColorMode) -> Format {
    Format::new().set_background_color(Color::RGB(band_rgb(score, mode)))
}

/// Colour for a score: fixed bands in legacy mode, a green-yellow-red
/// gradient otherwise.
fn band_rgb(score: u32, mode: ColorMode) -> u32 {
    match mode {
        ColorMode::ThreeBand => {
            if score <= 70 {
                GREEN
            } else if score <= 85 {
                YELLOW
            } else {
                RED
            }
        }
        ColorMode::Gradient => {
            if score <= 70 {
                blend(GREEN, YELLOW, f64::from(score) / 70.0)
            } else {
                blend(YELLOW, RED, f64::from(score - 70) / 30.0)
            }
        }
    }
}

/// Linear interpolation between two RGB colours, `t` in `0.0..=1.0`.
fn blend(from: u32, to: u32, t: f64) -> u32 {
    let t = t.clamp(0.0, 1.0);
    let channel = |shift: u32| {
        let a = f64::from((from >> shift) & 0xFF);
        let b = f64::from((to >> shift) & 0xFF);
        (a + (b - a) * t).round() as u32
    };
    (channel(16) << 16) | (channel(8) << 8) | channel(0)
}

/// A column wide enough for the longest name, with a floor.
fn column_width(names: &[String], floor: usize) -> f64 {
    names
        .iter()
        .map(String::len)
        .max()
        .unwrap_or(0)
        .max(floor) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::EntityRef;

    #[test]
    fn test_blend_endpoints_and_midpoint() {
        assert_eq!(blend(GREEN, YELLOW, 0.0), GREEN);
        assert_eq!(blend(GREEN, YELLOW, 1.0), YELLOW);
        let mid = blend(0x000000, 0xFF00FF, 0.5);
        assert_eq!(mid, 0x800080);
    }

    #[test]
    fn test_three_band_thresholds() {
        for (score, expected) in [(0, GREEN), (70, GREEN), (71, YELLOW), (85, YELLOW), (86, RED)] {
            assert_eq!(band_rgb(score, ColorMode::ThreeBand), expected, "score {score}");
        }
    }

    #[test]
    fn test_gradient_hits_the_band_anchors() {
        assert_eq!(band_rgb(0, ColorMode::Gradient), GREEN);
        assert_eq!(band_rgb(70, ColorMode::Gradient), YELLOW);
        assert_eq!(band_rgb(100, ColorMode::Gradient), RED);
    }

    #[test]
    fn test_detail_rows_skip_invisible_subtrees() {
        let mut root = Report::new(
            80,
            20,
            EntityRef::new(EntityKind::Project, "a"),
            EntityRef::new(EntityKind::Project, "b"),
        );
        let mut file = Report::new(
            80,
            10,
            EntityRef::new(EntityKind::File, "Main.java"),
            EntityRef::new(EntityKind::File, "Main.java"),
        );
        file.children.push(Report::new(
            100,
            10,
            EntityRef::new(EntityKind::Modifier, "public"),
            EntityRef::new(EntityKind::Modifier, "public"),
        ));
        root.children.push(file);
        root.children.push(Report::penalty(
            EntityRef::new(EntityKind::Class, "Lost"),
            EntityRef::not_found(),
        ));

        let mut rows = Vec::new();
        collect_detail_rows(&root, 0, &mut rows);

        let kinds: Vec<&str> = rows.iter().map(|r| r.kind).collect();
        assert_eq!(kinds, vec!["Project", "File", "Class"]);
        assert_eq!(rows[1].depth, 1);
        // The unmatched class labels itself by its visualisable side.
        assert_eq!(rows[2].right, "NOT FOUND");
    }

    #[test]
    fn test_detail_sheet_names_are_short_and_unique() {
        let a = detail_sheet_name(Language::Java, 3, 12);
        let b = detail_sheet_name(Language::Python, 3, 12);
        assert_ne!(a, b);
        assert!(a.len() <= 31 && b.len() <= 31);
    }
}
