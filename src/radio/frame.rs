use packed_struct::prelude::*;

pub const FRAME_DELIMITER: u8 = 0x7E;
pub const BROADCAST_ADDRESS: u16 = 0xFFFF;

// API identifiers (Series 1, AP=1)
pub const API_TX16_REQUEST: u8 = 0x01;
pub const API_AT_COMMAND: u8 = 0x08;
pub const API_RX16_PACKET: u8 = 0x81;
pub const API_AT_RESPONSE: u8 = 0x88;
pub const API_TX_STATUS: u8 = 0x89;

// Frames longer than this are a corrupt length field, not real traffic
const MAX_FRAME_DATA: usize = 512;

/// Frame-data checksum: 0xFF minus the low byte of the byte sum
pub fn checksum(frame_data: &[u8]) -> u8 {
    let sum: u32 = frame_data.iter().map(|byte| u32::from(*byte)).sum();
    0xFF - (sum & 0xFF) as u8
}

/// Wrap frame data with the delimiter, big-endian length and checksum
fn wrap_frame(frame_data: Vec<u8>) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(frame_data.len() + 4);
    bytes.push(FRAME_DELIMITER);
    bytes.extend_from_slice(&(frame_data.len() as u16).to_be_bytes());
    let check = checksum(&frame_data);
    bytes.extend_from_slice(&frame_data);
    bytes.push(check);
    bytes
}

// frame data | Bits & Definition
// Tx16 Request:
// 0          | API identifier (0x01)
// 1          | Frame ID (0x00 suppresses the status reply)
// 2..=3      | Destination address, 0xFFFF = broadcast
// 4          | Options
// 5..        | Payload
#[derive(PackedStruct, Default, Debug, PartialEq, Clone)]
#[packed_struct(bit_numbering = "msb0", endian = "msb")]
pub struct Tx16Header {
    #[packed_field(bytes = "0")]
    pub api_id: u8,
    #[packed_field(bytes = "1")]
    pub frame_id: u8,
    #[packed_field(bytes = "2..=3")]
    pub destination: u16,
    #[packed_field(bytes = "4")]
    pub options: u8,
}

// Rx16 Packet:
// 0          | API identifier (0x81)
// 1..=2      | Source address
// 3          | RSSI (negated dBm)
// 4          | Options
// 5..        | Payload
#[derive(PackedStruct, Default, Debug, PartialEq, Clone)]
#[packed_struct(bit_numbering = "msb0", endian = "msb")]
pub struct Rx16Header {
    #[packed_field(bytes = "0")]
    pub api_id: u8,
    #[packed_field(bytes = "1..=2")]
    pub source: u16,
    #[packed_field(bytes = "3")]
    pub rssi: u8,
    #[packed_field(bytes = "4")]
    pub options: u8,
}

/// Local AT command, two ASCII letters plus an optional parameter. No
/// parameter queries the register.
#[derive(Debug, Clone, PartialEq)]
pub struct AtCommandRequest {
    pub frame_id: u8,
    pub command: [u8; 2],
    pub parameter: Vec<u8>,
}

impl AtCommandRequest {
    pub fn new(frame_id: u8, command: [u8; 2]) -> Self {
        Self {
            frame_id,
            command,
            parameter: Vec::new(),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut data = vec![
            API_AT_COMMAND,
            self.frame_id,
            self.command[0],
            self.command[1],
        ];
        data.extend_from_slice(&self.parameter);
        wrap_frame(data)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tx16Request {
    pub frame_id: u8,
    pub destination: u16,
    pub options: u8,
    pub payload: Vec<u8>,
}

impl Tx16Request {
    pub fn broadcast(frame_id: u8, payload: Vec<u8>) -> Self {
        Self {
            frame_id,
            destination: BROADCAST_ADDRESS,
            options: 0,
            payload,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let header = Tx16Header {
            api_id: API_TX16_REQUEST,
            frame_id: self.frame_id,
            destination: self.destination,
            options: self.options,
        };
        let mut data = header.pack().unwrap().to_vec();
        data.extend_from_slice(&self.payload);
        wrap_frame(data)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AtStatus {
    Ok,
    Error,
    InvalidCommand,
    InvalidParameter,
    Other(u8),
}

impl From<u8> for AtStatus {
    fn from(byte: u8) -> Self {
        match byte {
            0 => AtStatus::Ok,
            1 => AtStatus::Error,
            2 => AtStatus::InvalidCommand,
            3 => AtStatus::InvalidParameter,
            other => AtStatus::Other(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AtCommandResponse {
    pub frame_id: u8,
    pub command: [u8; 2],
    pub status: AtStatus,
    pub value: Vec<u8>,
}

impl AtCommandResponse {
    /// Two-byte register values (MY among them) come back big-endian
    pub fn value_u16(&self) -> Option<u16> {
        match self.value[..] {
            [high, low] => Some(u16::from_be_bytes([high, low])),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rx16Packet {
    pub source: u16,
    pub rssi: u8,
    pub options: u8,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TxStatus {
    pub frame_id: u8,
    pub status: u8,
}

/// Frames the radio can send us
#[derive(Debug, Clone, PartialEq)]
pub enum RxFrame {
    AtCommandResponse(AtCommandResponse),
    Rx16(Rx16Packet),
    TxStatus(TxStatus),
}

fn decode_frame(data: &[u8]) -> Option<RxFrame> {
    match *data.first()? {
        API_AT_RESPONSE => {
            if data.len() < 5 {
                return None;
            }
            Some(RxFrame::AtCommandResponse(AtCommandResponse {
                frame_id: data[1],
                command: [data[2], data[3]],
                status: AtStatus::from(data[4]),
                value: data[5..].to_vec(),
            }))
        }
        API_RX16_PACKET => {
            if data.len() < 5 {
                return None;
            }
            let header_bytes: [u8; 5] = data[..5].try_into().ok()?;
            let header = Rx16Header::unpack(&header_bytes).ok()?;
            Some(RxFrame::Rx16(Rx16Packet {
                source: header.source,
                rssi: header.rssi,
                options: header.options,
                payload: data[5..].to_vec(),
            }))
        }
        API_TX_STATUS => {
            if data.len() < 3 {
                return None;
            }
            Some(RxFrame::TxStatus(TxStatus {
                frame_id: data[1],
                status: data[2],
            }))
        }
        _ => None,
    }
}

/// Reassembles API frames from the raw UART byte stream. Bytes arrive in
/// arbitrary chunks, so this is an explicit state machine. Anything before a
/// delimiter is noise and gets skipped; a frame with a bad checksum is
/// dropped and parsing resyncs on the next delimiter.
#[derive(Debug, Default)]
pub struct FrameParser {
    state: ParserState,
}

#[derive(Debug, Default)]
enum ParserState {
    #[default]
    Idle,
    LengthHigh,
    LengthLow {
        high: u8,
    },
    Data {
        remaining: usize,
        data: Vec<u8>,
    },
    Checksum {
        data: Vec<u8>,
    },
}

impl FrameParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, bytes: &[u8]) -> Vec<RxFrame> {
        bytes.iter().filter_map(|byte| self.push(*byte)).collect()
    }

    pub fn push(&mut self, byte: u8) -> Option<RxFrame> {
        match std::mem::take(&mut self.state) {
            ParserState::Idle => {
                if byte == FRAME_DELIMITER {
                    self.state = ParserState::LengthHigh;
                }
                None
            }
            ParserState::LengthHigh => {
                self.state = ParserState::LengthLow { high: byte };
                None
            }
            ParserState::LengthLow { high } => {
                let length = u16::from_be_bytes([high, byte]) as usize;
                if length == 0 || length > MAX_FRAME_DATA {
                    self.state = ParserState::Idle;
                } else {
                    self.state = ParserState::Data {
                        remaining: length,
                        data: Vec::with_capacity(length),
                    };
                }
                None
            }
            ParserState::Data {
                mut remaining,
                mut data,
            } => {
                data.push(byte);
                remaining -= 1;
                self.state = if remaining == 0 {
                    ParserState::Checksum { data }
                } else {
                    ParserState::Data { remaining, data }
                };
                None
            }
            ParserState::Checksum { data } => {
                self.state = ParserState::Idle;
                if checksum(&data) == byte {
                    decode_frame(&data)
                } else {
                    None
                }
            }
        }
    }
}
