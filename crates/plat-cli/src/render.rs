//! Table rendering for the `show` command.

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use plat_model::{Coord, Segment, Site};

pub fn print_site(site: &Site) {
    println!("Site: {}", site.name);
    println!("Version: {}", site.version);
    if let Some(session) = &site.session_id {
        println!("Session: {session}");
    }

    if site.points.is_empty() {
        println!("Points: none");
    } else {
        let mut table = Table::new();
        table.set_header(vec![
            header_cell("Point"),
            header_cell("X"),
            header_cell("Y"),
            header_cell("Layer"),
        ]);
        apply_table_style(&mut table);
        align_column(&mut table, 1, CellAlignment::Right);
        align_column(&mut table, 2, CellAlignment::Right);
        for point in &site.points {
            table.add_row(vec![
                id_cell(point.id.as_str()),
                Cell::new(format_number(point.x)),
                Cell::new(format_number(point.y)),
                layer_cell(&point.layer),
            ]);
        }
        println!("{table}");
    }

    let segments: Vec<&Segment> = site.segments().collect();
    if segments.is_empty() {
        println!("Segments: none");
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Segment"),
        header_cell("Kind"),
        header_cell("Start"),
        header_cell("End"),
        header_cell("Azimuth"),
        header_cell("Length"),
        header_cell("Layer"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 4, CellAlignment::Right);
    align_column(&mut table, 5, CellAlignment::Right);
    for segment in segments {
        table.add_row(vec![
            id_cell(segment.id().as_str()),
            Cell::new(segment.kind()),
            Cell::new(format_coord(segment.start())),
            Cell::new(format_coord(segment.end())),
            azimuth_cell(segment),
            Cell::new(format_number(segment.length())),
            layer_cell(segment.layer()),
        ]);
    }
    println!("{table}");
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn azimuth_cell(segment: &Segment) -> Cell {
    match segment {
        Segment::Line(line) => Cell::new(format_number(line.azimuth())),
        Segment::Arc(_) => dim_cell("-"),
    }
}

fn format_coord(coord: Coord) -> String {
    format!("({}, {})", format_number(coord.x), format_number(coord.y))
}

/// Fixed four decimal places, with the trailing zeros trimmed.
fn format_number(value: f64) -> String {
    let formatted = format!("{value:.4}");
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn id_cell(id: &str) -> Cell {
    Cell::new(id).fg(Color::Blue)
}

fn layer_cell(layer: &str) -> Cell {
    if layer.is_empty() {
        dim_cell("-")
    } else {
        Cell::new(layer)
    }
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
