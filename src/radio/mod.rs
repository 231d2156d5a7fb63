use anyhow::Error;
use log::{debug, error, info};
use tokio::sync::mpsc;
use tokio::time::{interval, Duration, Instant};

#[cfg(feature = "pi")]
use rppal::uart::{Parity, Uart};

use crate::config::Config;
use crate::radio::frame::{
    AtCommandRequest, AtCommandResponse, AtStatus, FrameParser, RxFrame, Tx16Request,
};
use crate::radio::wire::PeerMessage;
use crate::{InternalMessage, MessageKind};

pub mod frame;
pub mod wire;

const READ_POLL_MS: u64 = 20;
const AT_RESPONSE_TIMEOUT_MS: u64 = 1_000;

/// Outbound radio traffic
#[derive(Debug)]
pub enum RadioMessage {
    Broadcast(PeerMessage),
}

#[allow(dead_code)]
pub struct XBeeController {
    #[cfg(feature = "pi")]
    uart: Uart,
    parser: FrameParser,
    next_frame_id: u8,
}

impl XBeeController {
    pub async fn init(config: &Config) -> Result<Self, Error> {
        info!(
            "Radio: initializing on {} at {} baud",
            config.radio.uart_path, config.radio.baud
        );

        #[cfg(feature = "pi")]
        let uart = {
            let mut uart = Uart::with_path(
                &config.radio.uart_path,
                config.radio.baud,
                Parity::None,
                8,
                1,
            )?;
            // Return immediately from reads with whatever is buffered
            uart.set_read_mode(0, std::time::Duration::ZERO)?;
            uart
        };

        Ok(XBeeController {
            #[cfg(feature = "pi")]
            uart,
            parser: FrameParser::new(),
            next_frame_id: 1,
        })
    }

    /// Frame ID 0 suppresses the radio's status reply, so skip it
    fn take_frame_id(&mut self) -> u8 {
        let id = self.next_frame_id;
        self.next_frame_id = self.next_frame_id.checked_add(1).unwrap_or(1);
        id
    }

    fn write_frame(&mut self, data: Vec<u8>) -> Result<(), Error> {
        debug!("Radio: sending {:02X?}", data);
        #[cfg(feature = "pi")]
        self.uart.write(&data)?;
        Ok(())
    }

    /// Send a local AT command and wait for the matching response. A non-OK
    /// status or a timeout is an error.
    pub async fn send_at_command(
        &mut self,
        command: [u8; 2],
        parameter: Vec<u8>,
    ) -> Result<AtCommandResponse, Error> {
        if cfg!(not(feature = "pi")) {
            anyhow::bail!("Radio is not supported on this platform");
        }

        let frame_id = self.take_frame_id();
        let mut request = AtCommandRequest::new(frame_id, command);
        request.parameter = parameter;
        self.write_frame(request.encode())?;

        let deadline = Instant::now() + Duration::from_millis(AT_RESPONSE_TIMEOUT_MS);
        while Instant::now() < deadline {
            for rx_frame in self.poll_frames() {
                if let RxFrame::AtCommandResponse(response) = rx_frame {
                    if response.frame_id == frame_id {
                        if response.status != AtStatus::Ok {
                            anyhow::bail!(
                                "AT {}{} failed: {:?}",
                                command[0] as char,
                                command[1] as char,
                                response.status
                            );
                        }
                        return Ok(response);
                    }
                }
            }
            tokio::time::sleep(Duration::from_millis(READ_POLL_MS)).await;
        }

        anyhow::bail!(
            "AT {}{} timed out",
            command[0] as char,
            command[1] as char
        )
    }

    /// The node's 16-bit source address, which doubles as its election ID
    pub async fn my_address(&mut self) -> Result<u16, Error> {
        let response = self.send_at_command(*b"MY", Vec::new()).await?;
        response.value_u16().ok_or_else(|| {
            anyhow::anyhow!("AT MY returned {} bytes, expected 2", response.value.len())
        })
    }

    fn broadcast(&mut self, message: PeerMessage) -> Result<(), Error> {
        let frame_id = self.take_frame_id();
        let request = Tx16Request::broadcast(frame_id, message.to_bytes());
        self.write_frame(request.encode())
    }

    fn poll_frames(&mut self) -> Vec<RxFrame> {
        #[cfg(feature = "pi")]
        {
            let mut frames = Vec::new();
            let mut buffer = [0u8; 64];
            loop {
                match self.uart.read(&mut buffer) {
                    Ok(0) => break,
                    Ok(count) => frames.extend(self.parser.feed(&buffer[..count])),
                    Err(e) => {
                        error!("Radio: UART read failed: {}", e);
                        break;
                    }
                }
            }
            frames
        }
        #[cfg(not(feature = "pi"))]
        Vec::new()
    }

    /// Run the radio: drain outbound messages and forward inbound peer
    /// traffic to the manager queue.
    pub async fn start(
        mut self,
        mut rx: mpsc::Receiver<RadioMessage>,
        queue: mpsc::Sender<MessageKind>,
    ) {
        let mut poll = interval(Duration::from_millis(READ_POLL_MS));
        loop {
            tokio::select! {
                message = rx.recv() => {
                    match message {
                        Some(RadioMessage::Broadcast(peer_message)) => {
                            if let Err(e) = self.broadcast(peer_message) {
                                error!("Radio: failed to send: {}", e);
                            }
                        }
                        None => break,
                    }
                }
                _ = poll.tick() => {
                    for rx_frame in self.poll_frames() {
                        if let Some(internal) = Self::translate(rx_frame) {
                            if queue
                                .send(MessageKind::InternalMessage(internal))
                                .await
                                .is_err()
                            {
                                return;
                            }
                        }
                    }
                }
            }
        }
    }

    fn translate(rx_frame: RxFrame) -> Option<InternalMessage> {
        match rx_frame {
            RxFrame::Rx16(packet) => {
                let message = PeerMessage::parse(&packet.payload);
                if message.is_none() {
                    debug!(
                        "Radio: unrecognized payload from {:04X}: {:02X?}",
                        packet.source, packet.payload
                    );
                }
                match message? {
                    PeerMessage::ElectionCall { id } => Some(InternalMessage::ElectionCall { id }),
                    PeerMessage::Announce { id } => Some(InternalMessage::Announce { id }),
                }
            }
            RxFrame::TxStatus(status) => {
                if status.status != 0 {
                    error!(
                        "Radio: delivery failed for frame {} (status {})",
                        status.frame_id, status.status
                    );
                }
                None
            }
            RxFrame::AtCommandResponse(response) => {
                debug!("Radio: stray AT response: {:?}", response);
                None
            }
        }
    }
}
