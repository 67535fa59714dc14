//! Host load figures for the STATUS reply

use std::fs;
use std::path::PathBuf;

/// 1, 5 and 15 minute load averages
pub type LoadFigures = [f64; 3];

/// Source of the host's recent load
pub trait LoadAverage: Send + Sync {
    /// Current figures, or `None` when the host can't report them
    fn load_average(&self) -> Option<LoadFigures>;
}

/// Reads `/proc/loadavg`
#[derive(Debug, Clone)]
pub struct ProcLoadAverage {
    path: PathBuf,
}

impl ProcLoadAverage {
    pub fn new() -> Self {
        Self {
            path: PathBuf::from("/proc/loadavg"),
        }
    }

    /// Read figures from an alternate file in `/proc/loadavg` format
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for ProcLoadAverage {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadAverage for ProcLoadAverage {
    fn load_average(&self) -> Option<LoadFigures> {
        let text = fs::read_to_string(&self.path).ok()?;
        parse_loadavg(&text)
    }
}

/// Fixed figures, for hosts without a load source and for tests
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedLoadAverage(pub Option<LoadFigures>);

impl LoadAverage for FixedLoadAverage {
    fn load_average(&self) -> Option<LoadFigures> {
        self.0
    }
}

/// Parse the first three fields of `/proc/loadavg`
pub fn parse_loadavg(text: &str) -> Option<LoadFigures> {
    let mut fields = text.split_whitespace().map(str::parse::<f64>);
    let one = fields.next()?.ok()?;
    let five = fields.next()?.ok()?;
    let fifteen = fields.next()?.ok()?;
    Some([one, five, fifteen])
}
