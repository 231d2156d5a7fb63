use anyhow::Error;
use log::info;

#[cfg(feature = "pi")]
use rppal::gpio::{Gpio, OutputPin};

use crate::config::Config;
use crate::election::Role;

/// Drives the two role LEDs. Exactly one of them is lit once a round has
/// decided; both stay dark until then.
#[allow(dead_code)]
pub struct RoleLedController {
    #[cfg(feature = "pi")]
    leader: OutputPin,
    #[cfg(feature = "pi")]
    pleb: OutputPin,
}

impl RoleLedController {
    pub async fn init(config: &Config) -> Result<Self, Error> {
        let leader_pin = config.pins.leader_led.gpio();
        let pleb_pin = config.pins.pleb_led.gpio();

        info!(
            "Leds: leader on pin {}, pleb on pin {}",
            leader_pin.0, pleb_pin.0
        );

        // Only initialize GPIO if the Pi feature is enabled
        #[cfg(feature = "pi")]
        {
            let gpio = Gpio::new()?;
            let mut leader = gpio.get(leader_pin.0)?.into_output();
            let mut pleb = gpio.get(pleb_pin.0)?.into_output();

            // Start dark, no role is known yet
            leader.set_low();
            pleb.set_low();

            return Ok(Self { leader, pleb });
        }

        #[cfg(not(feature = "pi"))]
        Ok(Self {})
    }

    #[allow(unused_variables)]
    pub fn show_role(&mut self, role: Role) {
        info!("Leds: showing {:?}", role);

        #[cfg(feature = "pi")]
        match role {
            Role::Leader => {
                self.leader.set_high();
                self.pleb.set_low();
            }
            Role::Pleb => {
                self.leader.set_low();
                self.pleb.set_high();
            }
            Role::Undecided => {
                self.leader.set_low();
                self.pleb.set_low();
            }
        }
    }
}
