use std::path::Path;

use anyhow::Error;
use pi_pinout::{GpioPin, PhysicalPin, WiringPiPin};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, PartialEq)]
pub struct Config {
    pub radio: RadioConfig,
    pub pins: PinConfig,
    pub button: ButtonConfig,
    pub election: ElectionConfig,
}

#[derive(Debug, Deserialize, Serialize, PartialEq)]
pub struct RadioConfig {
    pub uart_path: String,
    pub baud: u32,
}

#[derive(Debug, Deserialize, Serialize, PartialEq)]
pub struct PinConfig {
    pub button: Pin,
    pub leader_led: Pin,
    pub pleb_led: Pin,
}

#[derive(Debug, Deserialize, Serialize, PartialEq)]
pub struct ButtonConfig {
    pub poll_interval_ms: u64,
    /// Consecutive samples at the same level before a press or release counts
    pub debounce_samples: u8,
}

#[derive(Debug, Deserialize, Serialize, PartialEq)]
pub struct ElectionConfig {
    /// How long a round stays open to collect announcements
    pub window_ms: u64,
    /// Upper bound on the random delay before answering an election call
    pub announce_jitter_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, PartialEq)]
pub enum Pin {
    Physical(PhysicalPin),
    Gpio(GpioPin),
    WiringPi(WiringPiPin),
}

impl Pin {
    /// Turn this pin into a BCM GPIO pin number
    pub fn gpio(&self) -> GpioPin {
        match *self {
            Pin::Physical(pin) => pin.into(),
            Pin::Gpio(pin) => pin,
            Pin::WiringPi(pin) => pin.into(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Config, Error> {
        Self::load_from("config.ron")
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Config, Error> {
        let config = std::fs::read_to_string(path)?;
        let config: Config = ron::from_str(&config)?;
        Ok(config)
    }
}
