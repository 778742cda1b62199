//! Decoder for the fixed `/mahm` XML document.
//!
//! The body is first read into a small element tree, then the fields the
//! exporter cares about are pulled out by name. Elements that are not named
//! below are skipped at any depth, so additions to the Afterburner schema do
//! not break decoding.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::debug;

use crate::error::DecodeError;
use crate::model::{GpuDescriptor, MonitorHeader, MonitorSnapshot, SensorReading};

const ROOT: &str = "HardwareMonitor";
const HEADER: &str = "HardwareMonitorHeader";
const ENTRIES: &str = "HardwareMonitorEntries";
const ENTRY: &str = "HardwareMonitorEntry";
const GPU_ENTRIES: &str = "HardwareMonitorGpuEntries";
const GPU_ENTRY: &str = "HardwareMonitorGpuEntry";

/// Decode a `/mahm` response body.
pub fn decode(bytes: &[u8]) -> Result<MonitorSnapshot, DecodeError> {
    let root = parse_tree(bytes)?;
    if root.name != ROOT {
        return Err(DecodeError::UnexpectedRoot {
            expected: ROOT,
            found: root.name,
        });
    }

    let header = decode_header(root.require(ROOT, HEADER)?);

    let readings = root
        .require(ROOT, ENTRIES)?
        .children(ENTRY)
        .enumerate()
        .map(|(index, entry)| decode_entry(index, entry))
        .collect::<Result<Vec<_>, _>>()?;

    let gpus = root
        .require(ROOT, GPU_ENTRIES)?
        .children(GPU_ENTRY)
        .map(decode_gpu)
        .collect();

    let snapshot = MonitorSnapshot {
        header,
        readings,
        gpus,
    };
    debug!(
        readings = snapshot.readings.len(),
        gpus = snapshot.gpus.len(),
        "Decoded /mahm document"
    );
    Ok(snapshot)
}

fn decode_header(el: &Element) -> MonitorHeader {
    MonitorHeader {
        signature: el.leaf("signature"),
        version: el.leaf("version"),
        header_size: el.leaf("headerSize"),
        entry_count: el.leaf("entryCount"),
        entry_size: el.leaf("entrySize"),
        time: el.leaf("time"),
        gpu_entry_count: el.leaf("gpuEntryCount"),
        gpu_entry_size: el.leaf("gpuEntrySize"),
    }
}

fn decode_entry(index: usize, el: &Element) -> Result<SensorReading, DecodeError> {
    let required = |field: &'static str| {
        el.leaf(field)
            .ok_or(DecodeError::MissingField { index, field })
    };

    Ok(SensorReading {
        name: required("srcName")?,
        units: el.leaf("srcUnits").unwrap_or_default(),
        gpu_index: required("gpu")?,
        source_id: required("srcId")?,
        // Stricter than `srcName`/`gpu`/`srcId` alone: without `data` the
        // sample line would have no value and the whole scrape would be unparseable.
        value: required("data")?,
        localized_name: el.leaf("localizedSrcName"),
        localized_units: el.leaf("localizedSrcUnits"),
        recommended_format: el.leaf("recommendedFormat"),
        min_limit: el.leaf("minLimit"),
        max_limit: el.leaf("maxLimit"),
        flags: el.leaf("flags"),
    })
}

fn decode_gpu(el: &Element) -> GpuDescriptor {
    GpuDescriptor {
        gpu_id: el.leaf("gpuId"),
        family: el.leaf("family"),
        device: el.leaf("device"),
        driver: el.leaf("driver"),
        bios: el.leaf("BIOS"),
        mem_amount: el.leaf("memAmount"),
    }
}

// ── Element tree ──────────────────────────────────────────────

#[derive(Debug)]
struct Element {
    name: String,
    text: String,
    children: Vec<Element>,
}

impl Element {
    fn new(start: &BytesStart<'_>) -> Self {
        Self {
            name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
            text: String::new(),
            children: Vec::new(),
        }
    }

    fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    fn children<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    fn require(&self, parent: &'static str, name: &'static str) -> Result<&Element, DecodeError> {
        self.child(name).ok_or(DecodeError::MissingElement {
            parent,
            element: name,
        })
    }

    /// Text of the first child named `name`. `<x/>` yields `Some("")`.
    fn leaf(&self, name: &str) -> Option<String> {
        self.child(name).map(|c| c.text.trim().to_string())
    }
}

/// Deepest level kept in the tree: root → container → entry → leaf.
const MAX_DEPTH: usize = 4;

/// Read the whole document into a tree rooted at its first element.
///
/// Anything nested below [`MAX_DEPTH`] is skipped by counting, so the tree
/// stays shallow however deep the upstream document goes.
fn parse_tree(bytes: &[u8]) -> Result<Element, DecodeError> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;
    // Open elements below MAX_DEPTH.
    let mut skipped = 0usize;

    loop {
        let event = match reader.read_event_into(&mut buf) {
            Ok(event) => event,
            Err(e) => {
                return Err(DecodeError::Xml {
                    position: reader.error_position() as u64,
                    message: e.to_string(),
                });
            }
        };

        match event {
            Event::Start(_) if skipped > 0 || stack.len() == MAX_DEPTH => skipped += 1,
            Event::Start(start) => stack.push(Element::new(&start)),
            Event::Empty(_) if skipped > 0 || stack.len() == MAX_DEPTH => {}
            Event::Empty(start) => attach(&mut stack, &mut root, Element::new(&start)),
            Event::End(_) if skipped > 0 => skipped -= 1,
            Event::End(_) => {
                // End names are checked by the reader, so the stack is never empty here.
                if let Some(el) = stack.pop() {
                    attach(&mut stack, &mut root, el);
                }
            }
            Event::Text(_) | Event::CData(_) if skipped > 0 => {}
            Event::Text(text) => {
                if let Some(top) = stack.last_mut() {
                    let unescaped = text.unescape().map_err(|e| DecodeError::Xml {
                        position: reader.buffer_position() as u64,
                        message: e.to_string(),
                    })?;
                    top.text.push_str(&unescaped);
                }
            }
            Event::CData(data) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if skipped > 0 || !stack.is_empty() {
        let inside = stack.last().map(|el| el.name.as_str()).unwrap_or("document");
        return Err(DecodeError::Xml {
            position: reader.buffer_position() as u64,
            message: format!("unexpected end of document inside <{inside}>"),
        });
    }
    root.ok_or(DecodeError::EmptyDocument)
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, el: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(el),
        // Only the first top-level element counts.
        None if root.is_none() => *root = Some(el),
        None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = include_str!("../tests/fixtures/mahm.xml");

    fn wrap(entries: &str, gpus: &str) -> String {
        format!(
            "<HardwareMonitor><HardwareMonitorHeader/>\
             <HardwareMonitorEntries>{entries}</HardwareMonitorEntries>\
             <HardwareMonitorGpuEntries>{gpus}</HardwareMonitorGpuEntries>\
             </HardwareMonitor>"
        )
    }

    // ── Fixture ───────────────────────────────────────────────────

    #[test]
    fn decodes_fixture_entries_in_order() {
        let snapshot = decode(FIXTURE.as_bytes()).unwrap();
        assert_eq!(snapshot.readings.len(), 2);

        let first = &snapshot.readings[0];
        assert_eq!(first.name, "Framerate");
        assert_eq!(first.units, "FPS");
        assert_eq!(first.gpu_index, "4294967295");
        assert_eq!(first.source_id, "80");
        assert_eq!(first.value, "0");
        assert_eq!(first.recommended_format.as_deref(), Some("%.0f"));
        assert_eq!(first.flags.as_deref(), Some("SHOW_IN_OSD"));

        let second = &snapshot.readings[1];
        assert_eq!(second.name, "GPU1 power");
        assert_eq!(second.units, "%");
        assert_eq!(second.gpu_index, "0");
        assert_eq!(second.source_id, "96");
        assert_eq!(second.value, "11");
    }

    #[test]
    fn decodes_fixture_header() {
        let snapshot = decode(FIXTURE.as_bytes()).unwrap();
        assert_eq!(snapshot.header.signature.as_deref(), Some("1296123981"));
        assert_eq!(snapshot.header.version.as_deref(), Some("131072"));
        assert_eq!(snapshot.header.entry_count.as_deref(), Some("38"));
        assert_eq!(snapshot.header.gpu_entry_count.as_deref(), Some("2"));
    }

    #[test]
    fn decodes_every_gpu_entry_and_unescapes_entities() {
        let snapshot = decode(FIXTURE.as_bytes()).unwrap();
        assert_eq!(snapshot.gpus.len(), 2);
        assert_eq!(
            snapshot.gpus[0].gpu_id.as_deref(),
            Some("VEN_10DE&DEV_13C0&SUBSYS_85041043&REV_A1&BUS_1&DEV_0&FN_0")
        );
        assert_eq!(snapshot.gpus[0].device.as_deref(), Some("GeForce GTX 980"));
        assert_eq!(snapshot.gpus[0].bios.as_deref(), Some("84.04.1f.00.02"));
        // Self-closing elements are present but empty.
        assert_eq!(snapshot.gpus[1].family.as_deref(), Some(""));
        assert_eq!(snapshot.gpus[1].mem_amount.as_deref(), Some("0"));
    }

    // ── Pass-through ──────────────────────────────────────────────

    #[test]
    fn values_are_kept_as_text() {
        let xml = wrap(
            "<HardwareMonitorEntry><srcName>CPU clock</srcName><gpu>4294967295</gpu>\
             <srcId>32</srcId><data>4712.500000</data></HardwareMonitorEntry>\
             <HardwareMonitorEntry><srcName>Temp</srcName><gpu>0</gpu>\
             <srcId>0</srcId><data>1e3</data></HardwareMonitorEntry>",
            "",
        );
        let snapshot = decode(xml.as_bytes()).unwrap();
        assert_eq!(snapshot.readings[0].value, "4712.500000");
        assert_eq!(snapshot.readings[1].value, "1e3");
    }

    #[test]
    fn unknown_elements_are_ignored() {
        let xml = "<HardwareMonitor>\
            <HardwareMonitorHeader><signature>1</signature><future>x</future></HardwareMonitorHeader>\
            <Extra><Nested>ignored</Nested></Extra>\
            <HardwareMonitorEntries>\
              <HardwareMonitorEntry><srcName>Fan</srcName><gpu>1</gpu><srcId>16</srcId>\
                <data>42</data><newField><deep/></newField></HardwareMonitorEntry>\
              <SomethingElse/>\
            </HardwareMonitorEntries>\
            <HardwareMonitorGpuEntries/>\
            </HardwareMonitor>";
        let snapshot = decode(xml.as_bytes()).unwrap();
        assert_eq!(snapshot.readings.len(), 1);
        assert_eq!(snapshot.readings[0].name, "Fan");
        assert!(snapshot.gpus.is_empty());
    }

    #[test]
    fn empty_entries_container_is_valid() {
        let snapshot = decode(wrap("", "").as_bytes()).unwrap();
        assert!(snapshot.readings.is_empty());
        assert!(snapshot.gpus.is_empty());
    }

    // ── Failures ──────────────────────────────────────────────────

    #[test]
    fn malformed_xml_is_rejected() {
        let err = decode(b"<HardwareMonitor><HardwareMonitorEntries></HardwareMonitor>").unwrap_err();
        assert!(matches!(err, DecodeError::Xml { .. }), "got {err:?}");
    }

    #[test]
    fn truncated_document_is_rejected() {
        let err = decode(b"<HardwareMonitor><HardwareMonitorHeader>").unwrap_err();
        assert!(matches!(err, DecodeError::Xml { .. }), "got {err:?}");
    }

    #[test]
    fn empty_body_is_rejected() {
        let err = decode(b"").unwrap_err();
        assert!(matches!(err, DecodeError::EmptyDocument));
    }

    #[test]
    fn wrong_root_is_rejected() {
        let err = decode(b"<html><body>Unauthorized</body></html>").unwrap_err();
        assert_eq!(
            err.to_string(),
            "expected root element <HardwareMonitor>, found <html>"
        );
    }

    #[test]
    fn missing_gpu_entries_container_is_rejected() {
        let xml = "<HardwareMonitor><HardwareMonitorHeader/>\
                   <HardwareMonitorEntries/></HardwareMonitor>";
        let err = decode(xml.as_bytes()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "missing element <HardwareMonitorGpuEntries> in <HardwareMonitor>"
        );
    }

    #[test]
    fn missing_entries_container_is_rejected() {
        let xml = "<HardwareMonitor><HardwareMonitorHeader/>\
                   <HardwareMonitorGpuEntries/></HardwareMonitor>";
        let err = decode(xml.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::MissingElement { element: ENTRIES, .. }
        ));
    }

    #[test]
    fn entry_without_src_id_is_rejected() {
        let xml = wrap(
            "<HardwareMonitorEntry><srcName>A</srcName><gpu>0</gpu><srcId>1</srcId><data>1</data></HardwareMonitorEntry>\
             <HardwareMonitorEntry><srcName>B</srcName><gpu>0</gpu><data>2</data></HardwareMonitorEntry>",
            "",
        );
        let err = decode(xml.as_bytes()).unwrap_err();
        assert_eq!(err.to_string(), "entry #1 is missing <srcId>");
    }

    #[test]
    fn entry_without_data_is_rejected() {
        let xml = wrap(
            "<HardwareMonitorEntry><srcName>A</srcName><gpu>0</gpu><srcId>1</srcId></HardwareMonitorEntry>",
            "",
        );
        let err = decode(xml.as_bytes()).unwrap_err();
        assert_eq!(err.to_string(), "entry #0 is missing <data>");
    }

    // ── Deep nesting ──────────────────────────────────────────────

    /// Decode on a thread with the tokio worker's default stack size.
    fn decode_on_small_stack(xml: String) -> Result<MonitorSnapshot, DecodeError> {
        std::thread::Builder::new()
            .stack_size(2 * 1024 * 1024)
            .spawn(move || decode(xml.as_bytes()))
            .unwrap()
            .join()
            .unwrap()
    }

    #[test]
    fn deeply_nested_unknown_element_does_not_overflow() {
        let depth = 500_000;
        let xml = format!(
            "<HardwareMonitor><HardwareMonitorHeader/><Extra>{}{}</Extra>\
             <HardwareMonitorEntries><HardwareMonitorEntry><srcName>Fan</srcName>\
             <gpu>0</gpu><srcId>16</srcId><data>42</data></HardwareMonitorEntry>\
             </HardwareMonitorEntries><HardwareMonitorGpuEntries/></HardwareMonitor>",
            "<a>".repeat(depth),
            "</a>".repeat(depth),
        );
        let snapshot = decode_on_small_stack(xml).unwrap();
        assert_eq!(snapshot.readings.len(), 1);
        assert_eq!(snapshot.readings[0].value, "42");
    }

    #[test]
    fn deep_nesting_inside_a_leaf_is_skipped() {
        let depth = 100_000;
        let xml = wrap(
            &format!(
                "<HardwareMonitorEntry><srcName>Fan</srcName><gpu>0</gpu><srcId>16</srcId>\
                 <data>7{}{}</data></HardwareMonitorEntry>",
                "<b>x".repeat(depth),
                "</b>".repeat(depth),
            ),
            "",
        );
        let snapshot = decode_on_small_stack(xml).unwrap();
        assert_eq!(snapshot.readings[0].value, "7");
    }

    #[test]
    fn truncated_deep_nesting_is_rejected() {
        let xml = format!("<HardwareMonitor><Extra>{}", "<a>".repeat(10_000));
        let err = decode_on_small_stack(xml).unwrap_err();
        assert!(matches!(err, DecodeError::Xml { .. }), "got {err:?}");
    }
}
