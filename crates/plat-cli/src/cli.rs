//! CLI argument definitions for the plat geometry editor.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;
use plat_model::Coord;

#[derive(Parser)]
#[command(
    name = "plat",
    version,
    about = "Survey geometry editor with versioned session snapshots",
    long_about = "Edit 2D survey geometry (points, line and arc segments) per session.\n\n\
                  Every mutation commits a new snapshot of the session's site; undo\n\
                  restores the previous one. Sites round-trip between a storage JSON\n\
                  form and a frontend JSON form."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Root directory for session data (default: $PLAT_DATA_DIR or ./plat-data).
    #[arg(long = "data-dir", value_name = "DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Adjust log verbosity (-v for info, -vv for debug, -vvv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the session's current site.
    Show(ShowArgs),

    /// Add a point to the session's site.
    AddPoint(AddPointArgs),

    /// Update fields of an existing point.
    UpdatePoint(UpdatePointArgs),

    /// Add a line or arc segment.
    AddSegment(AddSegmentArgs),

    /// Move a segment's endpoints.
    UpdateSegment(UpdateSegmentArgs),

    /// Recalculate a line segment from a quadrant bearing and a distance.
    Recalculate(RecalculateArgs),

    /// Delete an object by kind and id.
    Delete(DeleteArgs),

    /// Replace the whole site from a JSON file.
    Import(ImportArgs),

    /// Restore the previous snapshot.
    Undo(SessionArgs),

    /// Empty the site as a committed mutation.
    Clear(SessionArgs),
}

#[derive(Parser)]
pub struct SessionArgs {
    /// Editing session identifier.
    #[arg(value_name = "SESSION")]
    pub session: String,
}

#[derive(Parser)]
pub struct ShowArgs {
    /// Editing session identifier.
    #[arg(value_name = "SESSION")]
    pub session: String,

    /// Output representation.
    #[arg(long = "output", value_enum, default_value = "table")]
    pub output: OutputArg,
}

#[derive(Parser)]
pub struct AddPointArgs {
    /// Editing session identifier.
    #[arg(value_name = "SESSION")]
    pub session: String,

    /// X (easting) coordinate.
    #[arg(long, allow_negative_numbers = true)]
    pub x: f64,

    /// Y (northing) coordinate.
    #[arg(long, allow_negative_numbers = true)]
    pub y: f64,

    /// Layer name tag for the point.
    #[arg(long)]
    pub layer: Option<String>,

    /// Free-form attribute as KEY=JSON (bare values are taken as strings).
    #[arg(long = "attr", value_name = "KEY=JSON", value_parser = parse_attr)]
    pub attrs: Vec<(String, serde_json::Value)>,
}

#[derive(Parser)]
pub struct UpdatePointArgs {
    /// Editing session identifier.
    #[arg(value_name = "SESSION")]
    pub session: String,

    /// Id of the point to update.
    #[arg(value_name = "ID")]
    pub id: String,

    /// New X coordinate.
    #[arg(long, allow_negative_numbers = true)]
    pub x: Option<f64>,

    /// New Y coordinate.
    #[arg(long, allow_negative_numbers = true)]
    pub y: Option<f64>,

    /// New layer name tag.
    #[arg(long)]
    pub layer: Option<String>,

    /// Attribute to merge as KEY=JSON.
    #[arg(long = "attr", value_name = "KEY=JSON", value_parser = parse_attr)]
    pub attrs: Vec<(String, serde_json::Value)>,
}

#[derive(Parser)]
pub struct AddSegmentArgs {
    /// Editing session identifier.
    #[arg(value_name = "SESSION")]
    pub session: String,

    /// Start endpoint as X,Y.
    #[arg(long, value_name = "X,Y", value_parser = parse_coord, allow_hyphen_values = true)]
    pub start: Coord,

    /// End endpoint as X,Y.
    #[arg(long, value_name = "X,Y", value_parser = parse_coord, allow_hyphen_values = true)]
    pub end: Coord,

    /// Segment type.
    #[arg(long, value_enum, default_value = "line")]
    pub kind: KindArg,

    /// Free-form attribute as KEY=JSON. Arc parameters (center, radius,
    /// rotation, delta) ride here.
    #[arg(long = "attr", value_name = "KEY=JSON", value_parser = parse_attr)]
    pub attrs: Vec<(String, serde_json::Value)>,
}

#[derive(Parser)]
pub struct UpdateSegmentArgs {
    /// Editing session identifier.
    #[arg(value_name = "SESSION")]
    pub session: String,

    /// Id of the segment to update.
    #[arg(value_name = "ID")]
    pub id: String,

    /// New start endpoint as X,Y.
    #[arg(long, value_name = "X,Y", value_parser = parse_coord, allow_hyphen_values = true)]
    pub start: Coord,

    /// New end endpoint as X,Y.
    #[arg(long, value_name = "X,Y", value_parser = parse_coord, allow_hyphen_values = true)]
    pub end: Coord,

    /// New layer name tag.
    #[arg(long)]
    pub layer: Option<String>,

    /// Attribute to merge as KEY=JSON.
    #[arg(long = "attr", value_name = "KEY=JSON", value_parser = parse_attr)]
    pub attrs: Vec<(String, serde_json::Value)>,
}

#[derive(Parser)]
pub struct RecalculateArgs {
    /// Editing session identifier.
    #[arg(value_name = "SESSION")]
    pub session: String,

    /// Id of the line segment to recalculate.
    #[arg(value_name = "ID")]
    pub id: String,

    /// Compass quadrant of the bearing.
    #[arg(long, value_enum)]
    pub quadrant: QuadrantArg,

    /// Bearing within the quadrant, in degrees (0 to 90).
    #[arg(long, allow_negative_numbers = true)]
    pub bearing: f64,

    /// Distance along the bearing, in site units.
    #[arg(long, allow_negative_numbers = true)]
    pub distance: f64,

    /// Endpoint to keep fixed.
    #[arg(long, value_enum, default_value = "start")]
    pub fixed: FixedArg,
}

#[derive(Parser)]
pub struct DeleteArgs {
    /// Editing session identifier.
    #[arg(value_name = "SESSION")]
    pub session: String,

    /// Kind of object to delete.
    #[arg(value_name = "KIND", value_enum)]
    pub kind: ObjectKindArg,

    /// Id of the object to delete.
    #[arg(value_name = "ID")]
    pub id: String,
}

#[derive(Parser)]
pub struct ImportArgs {
    /// Editing session identifier.
    #[arg(value_name = "SESSION")]
    pub session: String,

    /// JSON file holding the replacement site.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// JSON form of the payload (auto sniffs from top-level keys).
    #[arg(long, value_enum, default_value = "auto")]
    pub form: FormArg,
}

/// Output choices for `show`.
#[derive(Clone, Copy, ValueEnum)]
pub enum OutputArg {
    Table,
    Storage,
    Frontend,
}

/// Segment type choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum KindArg {
    Line,
    Arc,
}

/// Compass quadrant choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum QuadrantArg {
    Ne,
    Se,
    Sw,
    Nw,
}

/// Fixed-endpoint choices for recalculation.
#[derive(Clone, Copy, ValueEnum)]
pub enum FixedArg {
    Start,
    End,
}

/// Deletable object kinds.
#[derive(Clone, Copy, ValueEnum)]
pub enum ObjectKindArg {
    Point,
    Segment,
    Parcel,
    Layer,
    Geometry,
}

/// Import payload form choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum FormArg {
    Auto,
    Storage,
    Frontend,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

/// Parse an `X,Y` coordinate pair.
pub fn parse_coord(value: &str) -> Result<Coord, String> {
    let (x, y) = value
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y but got '{value}'"))?;
    let x = x
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("invalid X coordinate '{}'", x.trim()))?;
    let y = y
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("invalid Y coordinate '{}'", y.trim()))?;
    Ok(Coord::new(x, y))
}

/// Parse a `KEY=JSON` attribute. Values that fail to parse as JSON are
/// taken as bare strings, so `--attr note=staked` works without quoting.
pub fn parse_attr(value: &str) -> Result<(String, serde_json::Value), String> {
    let (key, raw) = value
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=JSON but got '{value}'"))?;
    if key.is_empty() {
        return Err(format!("empty attribute key in '{value}'"));
    }
    let parsed = serde_json::from_str(raw)
        .unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));
    Ok((key.to_string(), parsed))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{parse_attr, parse_coord};

    #[test]
    fn coord_parses_with_whitespace_and_negatives() {
        let coord = parse_coord("-3.5, 12").unwrap();
        assert!((coord.x - (-3.5)).abs() < 1e-12);
        assert!((coord.y - 12.0).abs() < 1e-12);
    }

    #[test]
    fn coord_rejects_malformed_pairs() {
        assert!(parse_coord("12").is_err());
        assert!(parse_coord("a,b").is_err());
        assert!(parse_coord("1,2,3").is_err());
    }

    #[test]
    fn attr_parses_json_values() {
        assert_eq!(parse_attr("radius=2.5").unwrap(), ("radius".into(), json!(2.5)));
        assert_eq!(
            parse_attr(r#"center={"x":1,"y":2}"#).unwrap(),
            ("center".into(), json!({"x": 1, "y": 2}))
        );
    }

    #[test]
    fn attr_falls_back_to_bare_strings() {
        assert_eq!(parse_attr("note=staked").unwrap(), ("note".into(), json!("staked")));
        assert_eq!(parse_attr("empty=").unwrap(), ("empty".into(), json!("")));
    }

    #[test]
    fn attr_rejects_missing_key_or_separator() {
        assert!(parse_attr("no-separator").is_err());
        assert!(parse_attr("=value").is_err());
    }
}
