//! Analytics JSON export

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::Result;
use crate::analytics::TemperatureAnalytics;

pub const ANALYTICS_FILE_NAME: &str = "temperature_analytics.json";

/// Write `<base>/temperature_analytics.json`, pretty-printed
pub fn write_analytics(base: &Path, analytics: &TemperatureAnalytics) -> Result<PathBuf> {
    fs::create_dir_all(base)?;
    let path = base.join(ANALYTICS_FILE_NAME);

    let mut writer = BufWriter::new(File::create(&path)?);
    serde_json::to_writer_pretty(&mut writer, analytics)?;
    writer.write_all(b"\n")?;
    writer.flush()?;

    info!("Wrote temperature analytics to {}", path.display());
    Ok(path)
}
