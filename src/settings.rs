use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::types::OptimizeParams;

/// Stock catalogue offered when no settings file exists.
pub const DEFAULT_LENGTHS: [u32; 7] = [1595, 1798, 2400, 2750, 3200, 3600, 4800];

/// Which of the three canonical scenario picks a caller prefers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Cost,
    Length,
    Joints,
}

/// Persisted configuration blob. Stored as camelCase JSON so files
/// saved by the web client load unchanged. Missing fields fall back
/// to the defaults, so old blobs keep working.
///
/// Load/save happens only at the binary boundary; the core receives
/// an explicit [`OptimizeParams`] per solve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub module_width: f64,
    pub mid_clamp: f64,
    pub end_clamp_width: f64,
    pub buffer: f64,
    pub lengths: Vec<u32>,
    pub small_lengths: Vec<u32>,
    pub max_pieces: Option<u32>,
    pub max_waste_pct: Option<f64>,
    pub allow_undershoot_pct: f64,
    pub alpha_joint: f64,
    pub beta_small: f64,
    pub gamma_short: f64,
    pub cost_per_mm: f64,
    pub cost_per_joint_set: f64,
    pub joiner_length: f64,
    pub priority: Priority,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            module_width: 1303.0,
            mid_clamp: 20.0,
            end_clamp_width: 40.0,
            buffer: 15.0,
            lengths: DEFAULT_LENGTHS.to_vec(),
            small_lengths: Vec::new(),
            max_pieces: Some(3),
            max_waste_pct: None,
            allow_undershoot_pct: 0.0,
            alpha_joint: 220.0,
            beta_small: 60.0,
            gamma_short: 5.0,
            cost_per_mm: 0.1,
            cost_per_joint_set: 50.0,
            joiner_length: 100.0,
            priority: Priority::Cost,
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> io::Result<Self> {
        let text = fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        let text = serde_json::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, text)
    }

    /// Span a row of `modules` needs under this geometry.
    pub fn required_span(&self, modules: u32) -> u32 {
        required_span(
            modules,
            self.module_width,
            self.mid_clamp,
            self.end_clamp_width,
            self.buffer,
        )
    }

    /// Solve parameters for one target length.
    pub fn params(&self, required: u32) -> OptimizeParams {
        OptimizeParams {
            required,
            lengths: self.lengths.clone(),
            small_lengths: self.small_lengths.clone(),
            max_pieces: self.max_pieces,
            allow_undershoot_pct: self.allow_undershoot_pct,
            max_waste_pct: self.max_waste_pct,
            alpha_joint: self.alpha_joint,
            beta_small: self.beta_small,
            gamma_short: self.gamma_short,
            cost_per_mm: self.cost_per_mm,
            cost_per_joint_set: self.cost_per_joint_set,
            joiner_length: self.joiner_length,
        }
    }
}

/// Target rail length for a module row: the modules themselves, a mid
/// clamp between each adjacent pair, and an end clamp plus buffer at
/// both ends. Pure arithmetic, rounded to whole millimetres.
pub fn required_span(
    modules: u32,
    module_width: f64,
    mid_clamp: f64,
    end_clamp: f64,
    buffer: f64,
) -> u32 {
    let m = modules as f64;
    let mid = if modules > 0 { (m - 1.0) * mid_clamp } else { 0.0 };
    let span = m * module_width + mid + 2.0 * end_clamp + 2.0 * buffer;
    span.max(0.0).round() as u32
}

/// Comma- or space-separated number list, as typed into the lengths
/// field. Non-numeric and non-positive entries are dropped.
pub fn parse_num_list(s: &str) -> Vec<u32> {
    s.split([',', ' '])
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .filter_map(|p| p.parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v > 0.0)
        .map(|v| v.round() as u32)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_shipped_catalogue() {
        let s = Settings::default();
        assert_eq!(s.lengths, DEFAULT_LENGTHS.to_vec());
        assert_eq!(s.max_pieces, Some(3));
        assert_eq!(s.alpha_joint, 220.0);
        assert_eq!(s.priority, Priority::Cost);
    }

    #[test]
    fn test_json_round_trip() {
        let mut s = Settings::default();
        s.small_lengths = vec![1595];
        s.max_waste_pct = Some(0.05);
        s.priority = Priority::Joints;
        let json = serde_json::to_string(&s).unwrap();
        let back: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(s, back);
    }

    #[test]
    fn test_partial_blob_fills_defaults() {
        let s: Settings =
            serde_json::from_str(r#"{"moduleWidth": 1100.0, "maxPieces": 5}"#).unwrap();
        assert_eq!(s.module_width, 1100.0);
        assert_eq!(s.max_pieces, Some(5));
        assert_eq!(s.alpha_joint, 220.0);
        assert_eq!(s.lengths, DEFAULT_LENGTHS.to_vec());
    }

    #[test]
    fn test_blob_uses_camel_case_keys() {
        let json = serde_json::to_string(&Settings::default()).unwrap();
        assert!(json.contains("\"moduleWidth\""));
        assert!(json.contains("\"allowUndershootPct\""));
        assert!(!json.contains("\"module_width\""));
    }

    #[test]
    fn test_required_span_formula() {
        // 10 modules of 1303 with 20mm mid clamps, 40mm end clamps and
        // 15mm buffers: 13030 + 180 + 80 + 30.
        assert_eq!(required_span(10, 1303.0, 20.0, 40.0, 15.0), 13_320);
        // A single module has no mid clamps.
        assert_eq!(required_span(1, 1303.0, 20.0, 40.0, 15.0), 1413);
        // No modules leaves just the fixed ends.
        assert_eq!(required_span(0, 1303.0, 20.0, 40.0, 15.0), 110);
    }

    #[test]
    fn test_parse_num_list() {
        assert_eq!(
            parse_num_list("1595, 1798 2400,,3200"),
            vec![1595, 1798, 2400, 3200]
        );
        assert_eq!(parse_num_list("abc, -5, 0, 500.4"), vec![500]);
        assert!(parse_num_list("").is_empty());
    }
}
