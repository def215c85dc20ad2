//! Serial port handling
//!
//! Opens the adapter's serial port as an async stream and enumerates
//! candidate ports.

use serialport::{SerialPortInfo, SerialPortType};
use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt, SerialStream, StopBits};

use super::ProtocolError;

/// USB vendor IDs of the bridge chips found in ELM327 cables
const ADAPTER_VIDS: [u16; 4] = [
    0x0403, // FTDI
    0x1A86, // WCH CH340
    0x067B, // Prolific PL2303
    0x10C4, // Silicon Labs CP210x
];

/// Information about an available serial port
#[derive(Debug, Clone)]
pub struct PortInfo {
    /// Port name (e.g., "/dev/ttyUSB0" or "COM3")
    pub name: String,

    /// USB vendor ID (if USB device)
    pub vid: Option<u16>,

    /// USB product ID (if USB device)
    pub pid: Option<u16>,

    /// Product name (if available)
    pub product: Option<String>,

    /// Whether the port sits behind a Bluetooth link
    pub bluetooth: bool,
}

impl PortInfo {
    /// Whether the port looks like an OBD-II adapter
    pub fn is_likely_adapter(&self) -> bool {
        self.bluetooth || self.vid.is_some_and(|vid| ADAPTER_VIDS.contains(&vid))
    }
}

impl From<SerialPortInfo> for PortInfo {
    fn from(info: SerialPortInfo) -> Self {
        let (vid, pid, product, bluetooth) = match info.port_type {
            SerialPortType::UsbPort(usb_info) => {
                (Some(usb_info.vid), Some(usb_info.pid), usb_info.product, false)
            }
            SerialPortType::BluetoothPort => (None, None, None, true),
            _ => (None, None, None, false),
        };
        let bluetooth = bluetooth || info.port_name.contains("rfcomm");

        Self {
            name: info.port_name,
            vid,
            pid,
            product,
            bluetooth,
        }
    }
}

/// Sort key placing likely adapters first:
///  - ttyUSB* (USB-serial bridges), numerically
///  - rfcomm* (Bluetooth adapters), numerically
///  - COM ports, numerically
///  - everything else by name
fn port_sort_key(name: &str) -> (u8, usize, String) {
    let basename = name.rsplit('/').next().unwrap_or(name);
    let numbered = [("ttyUSB", 0u8), ("rfcomm", 1), ("COM", 2)];
    for (prefix, rank) in numbered {
        if let Some(rest) = basename.strip_prefix(prefix) {
            let num = rest.parse::<usize>().unwrap_or(usize::MAX);
            return (rank, num, basename.to_string());
        }
    }
    (3, 0, basename.to_string())
}

/// List available serial ports, likely adapters first
pub fn list_ports() -> Vec<PortInfo> {
    let mut ports: Vec<PortInfo> = serialport::available_ports()
        .unwrap_or_default()
        .into_iter()
        .map(PortInfo::from)
        .collect();
    ports.sort_by_key(|p| (!p.is_likely_adapter(), port_sort_key(&p.name)));
    ports
}

/// Open the adapter's serial port, 8N1 without flow control
pub fn open_port(name: &str, baud_rate: u32) -> Result<SerialStream, ProtocolError> {
    tokio_serial::new(name, baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .open_native_async()
        .map_err(|e| ProtocolError::ConnectionFailed(format!("{name}: {e}")))
}
