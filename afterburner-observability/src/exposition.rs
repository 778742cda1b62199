use afterburner_core::error::ScrapeError;
use afterburner_core::model::SensorReading;
use std::fmt::{self, Write};

/// Gauge every sensor reading is exported under.
pub const METRIC_NAME: &str = "msi_afterburner_HardwareMonitorEntry";

/// Render prometheus text exposition format for a list of readings.
pub fn render(readings: &[SensorReading]) -> Result<String, ScrapeError> {
    let mut out = String::with_capacity(64 + readings.len() * 96);
    write_exposition(&mut out, readings).map_err(|e| ScrapeError::Render(e.to_string()))?;
    Ok(out)
}

/// Write one `# TYPE` line, then one sample per reading in the given order.
///
/// Sample values are copied from the upstream text unchanged.
pub fn write_exposition<W: Write>(out: &mut W, readings: &[SensorReading]) -> fmt::Result {
    writeln!(out, "# TYPE {METRIC_NAME} gauge")?;
    for reading in readings {
        out.write_str(METRIC_NAME)?;
        out.write_str("{SrcName=\"")?;
        write_label_value(out, &reading.name)?;
        out.write_str("\",Gpu=\"")?;
        write_label_value(out, &reading.gpu_index)?;
        out.write_str("\",SrcId=\"")?;
        write_label_value(out, &reading.source_id)?;
        writeln!(out, "\"}} {}", reading.value)?;
    }
    Ok(())
}

/// Label value escaping per the text format: `\`, `"` and newline.
fn write_label_value<W: Write>(out: &mut W, value: &str) -> fmt::Result {
    if !value.contains(['\\', '"', '\n']) {
        return out.write_str(value);
    }
    for ch in value.chars() {
        match ch {
            '\\' => out.write_str("\\\\")?,
            '"' => out.write_str("\\\"")?,
            '\n' => out.write_str("\\n")?,
            c => out.write_char(c)?,
        }
    }
    Ok(())
}
