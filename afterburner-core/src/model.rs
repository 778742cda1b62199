//! In-memory form of one `/mahm` response.
//!
//! Every leaf is kept as the text Afterburner sent. Nothing here is parsed
//! into a number, so rendering can reproduce the upstream formatting exactly.

/// GPU index Afterburner reports for sensors that are not tied to a GPU
/// (framerate, CPU sensors, ...).
pub const GPU_SENTINEL: &str = "4294967295";

/// `<HardwareMonitor>`: header, sensor entries and GPU entries of one fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitorSnapshot {
    pub header: MonitorHeader,
    /// In document order.
    pub readings: Vec<SensorReading>,
    /// In document order.
    pub gpus: Vec<GpuDescriptor>,
}

/// `<HardwareMonitorHeader>`. Decoded for completeness, never rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitorHeader {
    pub signature: Option<String>,
    pub version: Option<String>,
    pub header_size: Option<String>,
    pub entry_count: Option<String>,
    pub entry_size: Option<String>,
    pub time: Option<String>,
    pub gpu_entry_count: Option<String>,
    pub gpu_entry_size: Option<String>,
}

/// `<HardwareMonitorEntry>`: one sensor at scrape time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SensorReading {
    /// `srcName`, e.g. "Framerate".
    pub name: String,
    /// `srcUnits`. Informational only.
    pub units: String,
    /// `gpu`. [`GPU_SENTINEL`] when not GPU specific.
    pub gpu_index: String,
    /// `srcId`, stable per sensor.
    pub source_id: String,
    /// `data`, verbatim.
    pub value: String,
    pub localized_name: Option<String>,
    pub localized_units: Option<String>,
    pub recommended_format: Option<String>,
    pub min_limit: Option<String>,
    pub max_limit: Option<String>,
    pub flags: Option<String>,
}

impl SensorReading {
    pub fn is_gpu_specific(&self) -> bool {
        self.gpu_index != GPU_SENTINEL
    }
}

/// `<HardwareMonitorGpuEntry>`. Decoded, not rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GpuDescriptor {
    pub gpu_id: Option<String>,
    pub family: Option<String>,
    pub device: Option<String>,
    pub driver: Option<String>,
    pub bios: Option<String>,
    pub mem_amount: Option<String>,
}
