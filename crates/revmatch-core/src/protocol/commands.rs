//! Adapter command set
//!
//! AT commands configure the adapter itself; two-digit hex commands are
//! OBD-II requests forwarded to the engine ECU.

/// Reset the adapter
pub const RESET: &str = "ATZ";
/// Do not echo commands back
pub const ECHO_OFF: &str = "ATE0";
/// No linefeed after carriage returns
pub const LINEFEEDS_OFF: &str = "ATL0";
/// Select ISO 15765-4 CAN (11 bit, 500 kbaud)
pub const PROTOCOL_CAN_11_500: &str = "ATSP6";
/// Hide CAN headers in responses
pub const HEADERS_OFF: &str = "ATH0";
/// Allow responses longer than seven bytes
pub const ALLOW_LONG: &str = "ATAL";

/// Setup sequence sent once before acquisition starts
pub const INIT_SEQUENCE: [&str; 6] = [
    RESET,
    ECHO_OFF,
    LINEFEEDS_OFF,
    PROTOCOL_CAN_11_500,
    HEADERS_OFF,
    ALLOW_LONG,
];

/// Mode 01 request for RPM (0C), speed (0D), load (04), throttle (11) and
/// coolant (05). The trailing digit is the expected response count, which
/// lets the adapter answer without waiting out its own timeout.
pub const ENGINE_DATA: &str = "01 0C 0D 04 11 05 4";

/// Mode 01 PID for engine speed
pub const PID_RPM: &str = "0C";
/// Mode 01 PID for vehicle speed
pub const PID_SPEED: &str = "0D";
/// Mode 01 PID for calculated engine load
pub const PID_LOAD: &str = "04";
/// Mode 01 PID for throttle position
pub const PID_THROTTLE: &str = "11";
