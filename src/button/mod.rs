use anyhow::Error;
use log::info;
use tokio::sync::mpsc;
use tokio::time::{interval, Duration};

#[cfg(feature = "pi")]
use rppal::gpio::{Gpio, InputPin};

use crate::config::Config;
use crate::{InternalMessage, MessageKind};

/// Sampling debouncer. A press is reported once after the line has been
/// stably active for the required number of samples, and not again until it
/// has been stably released for the same count.
#[derive(Debug)]
pub struct Debouncer {
    required: u8,
    active_streak: u8,
    inactive_streak: u8,
    pressed: bool,
}

impl Debouncer {
    pub fn new(required: u8) -> Self {
        Self {
            required: required.max(1),
            active_streak: 0,
            inactive_streak: 0,
            pressed: false,
        }
    }

    /// Feed one sample. Returns true exactly when a new press completes.
    pub fn update(&mut self, active: bool) -> bool {
        if active {
            self.inactive_streak = 0;
            self.active_streak = self.active_streak.saturating_add(1);
            if !self.pressed && self.active_streak >= self.required {
                self.pressed = true;
                return true;
            }
        } else {
            self.active_streak = 0;
            self.inactive_streak = self.inactive_streak.saturating_add(1);
            if self.pressed && self.inactive_streak >= self.required {
                self.pressed = false;
            }
        }
        false
    }
}

#[allow(dead_code)]
pub struct ButtonController {
    #[cfg(feature = "pi")]
    pin: InputPin,
    poll_interval: Duration,
    debouncer: Debouncer,
    queue: mpsc::Sender<MessageKind>,
}

impl ButtonController {
    pub async fn init(config: &Config, queue: mpsc::Sender<MessageKind>) -> Result<Self, Error> {
        // Turn this pin into a physical pin
        let pin = config.pins.button.gpio();

        info!("Button: initializing on pin {}", pin.0);

        // The button shorts the pin to ground, so pull it up and treat low
        // as pressed
        #[cfg(feature = "pi")]
        let pin = Gpio::new()?.get(pin.0)?.into_input_pullup();

        Ok(Self {
            #[cfg(feature = "pi")]
            pin,
            poll_interval: Duration::from_millis(config.button.poll_interval_ms),
            debouncer: Debouncer::new(config.button.debounce_samples),
            queue,
        })
    }

    fn is_pressed(&self) -> bool {
        #[cfg(feature = "pi")]
        return self.pin.is_low();
        #[cfg(not(feature = "pi"))]
        false
    }

    /// Poll the pin and send a message for every debounced press
    pub async fn start(mut self) {
        let mut ticker = interval(self.poll_interval);
        loop {
            ticker.tick().await;
            if self.debouncer.update(self.is_pressed()) {
                info!("Button: press detected");
                if self
                    .queue
                    .send(MessageKind::InternalMessage(InternalMessage::ButtonPressed))
                    .await
                    .is_err()
                {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_press_needs_stable_samples() {
        let mut debouncer = Debouncer::new(3);
        assert!(!debouncer.update(true));
        assert!(!debouncer.update(true));
        assert!(debouncer.update(true));
        // Holding does not repeat
        assert!(!debouncer.update(true));
        assert!(!debouncer.update(true));
    }

    #[test]
    fn test_bounce_is_filtered() {
        let mut debouncer = Debouncer::new(3);
        assert!(!debouncer.update(true));
        assert!(!debouncer.update(false));
        assert!(!debouncer.update(true));
        assert!(!debouncer.update(true));
        // The streak restarted after the bounce
        assert!(debouncer.update(true));
    }

    #[test]
    fn test_release_rearms() {
        let mut debouncer = Debouncer::new(2);
        assert!(!debouncer.update(true));
        assert!(debouncer.update(true));

        // A bouncy release, then a clean one
        assert!(!debouncer.update(false));
        assert!(!debouncer.update(true));
        assert!(!debouncer.update(false));
        assert!(!debouncer.update(false));

        // Second press fires again
        assert!(!debouncer.update(true));
        assert!(debouncer.update(true));
    }

    #[test]
    fn test_zero_required_still_works() {
        let mut debouncer = Debouncer::new(0);
        assert!(debouncer.update(true));
        assert!(!debouncer.update(true));
    }
}
