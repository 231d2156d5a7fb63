use log::{debug, error, info};
use rand::Rng;
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};

use crate::config::Config;
use crate::election::{NodeId, Role, Roster};
use crate::leds::RoleLedController;
use crate::radio::wire::PeerMessage;
use crate::radio::RadioMessage;
use crate::{InternalMessage, MessageKind};

/// The NodeManager owns the election state for this node. It reacts to the
/// local button, to election traffic from peers, and to the round timer, and
/// it tells the LED controller which role to display.
///
/// Every election call, local or remote, opens a fresh round: the roster is
/// reset to just this node, IDs are collected until the window closes, and
/// then the role is decided. Rounds are numbered so that a timer from an
/// abandoned round cannot close a newer one.
pub struct NodeManager {
    id: NodeId,
    role: Role,
    roster: Roster,
    round: u64,
    window: Duration,
    jitter_ms: u64,
    /// Loops timer expirations back into the main queue
    queue: mpsc::Sender<MessageKind>,
    radio: mpsc::Sender<RadioMessage>,
}

impl NodeManager {
    pub fn new(
        id: NodeId,
        config: &Config,
        queue: mpsc::Sender<MessageKind>,
        radio: mpsc::Sender<RadioMessage>,
    ) -> Self {
        Self {
            id,
            role: Role::Undecided,
            roster: Roster::new(),
            round: 0,
            window: Duration::from_millis(config.election.window_ms),
            jitter_ms: config.election.announce_jitter_ms,
            queue,
            radio,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub async fn start(mut self, mut rx: mpsc::Receiver<MessageKind>, mut leds: RoleLedController) {
        while let Some(message) = rx.recv().await {
            match message {
                MessageKind::InternalMessage(internal) => self.handle(internal, &mut leds).await,
            }
        }
    }

    async fn handle(&mut self, message: InternalMessage, leds: &mut RoleLedController) {
        match message {
            InternalMessage::ButtonPressed => {
                self.open_round().await;
                self.send(PeerMessage::ElectionCall { id: self.id }).await;
                self.send(PeerMessage::Announce { id: self.id }).await;
            }
            InternalMessage::ElectionCall { id } => {
                self.open_round().await;
                self.roster.insert(id);
                self.schedule_announce();
            }
            InternalMessage::Announce { id } => {
                if self.roster.insert(id) {
                    debug!("Round {}: learned node {:04X}", self.round, id);
                }
            }
            InternalMessage::WindowExpired { round } => {
                if round != self.round {
                    debug!("Ignoring expiry of stale round {}", round);
                    return;
                }
                self.role = self.roster.decide_role(self.id);
                info!(
                    "Round {}: decided {:?} with {} node(s), leader {:04X}",
                    self.round,
                    self.role,
                    self.roster.len(),
                    self.roster.leader_id().unwrap_or(0),
                );
                leds.show_role(self.role);
            }
        }
    }

    async fn open_round(&mut self) {
        self.round += 1;
        self.roster.clear_round(self.id);
        info!("Round {}: opened", self.round);

        // The window timer reports back through the main queue
        let queue = self.queue.clone();
        let round = self.round;
        let window = self.window;
        tokio::spawn(async move {
            sleep(window).await;
            let _ = queue
                .send(MessageKind::InternalMessage(InternalMessage::WindowExpired {
                    round,
                }))
                .await;
        });
    }

    /// Answer an election call after a random delay so that a dozen nodes do
    /// not key their radios at the same instant
    fn schedule_announce(&self) {
        let radio = self.radio.clone();
        let id = self.id;
        let delay = Duration::from_millis(rand::thread_rng().gen_range(0..=self.jitter_ms));
        tokio::spawn(async move {
            sleep(delay).await;
            if let Err(e) = radio
                .send(RadioMessage::Broadcast(PeerMessage::Announce { id }))
                .await
            {
                error!("Failed to queue announce: {}", e);
            }
        });
    }

    async fn send(&self, message: PeerMessage) {
        if let Err(e) = self.radio.send(RadioMessage::Broadcast(message)).await {
            error!("Failed to queue radio message: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ButtonConfig, ElectionConfig, Pin, PinConfig, RadioConfig};
    use pi_pinout::GpioPin;

    fn test_config() -> Config {
        Config {
            radio: RadioConfig {
                uart_path: "/dev/null".to_string(),
                baud: 9600,
            },
            pins: PinConfig {
                button: Pin::Gpio(GpioPin(17)),
                leader_led: Pin::Gpio(GpioPin(22)),
                pleb_led: Pin::Gpio(GpioPin(23)),
            },
            button: ButtonConfig {
                poll_interval_ms: 10,
                debounce_samples: 2,
            },
            election: ElectionConfig {
                window_ms: 10,
                announce_jitter_ms: 1,
            },
        }
    }

    async fn expect_expiry(queue_rx: &mut mpsc::Receiver<MessageKind>) -> InternalMessage {
        match queue_rx.recv().await.unwrap() {
            MessageKind::InternalMessage(internal @ InternalMessage::WindowExpired { .. }) => {
                internal
            }
            other => panic!("expected a window expiry, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_alone_node_elects_itself() {
        let config = test_config();
        let (queue_tx, mut queue_rx) = mpsc::channel(16);
        let (radio_tx, mut radio_rx) = mpsc::channel(16);
        let mut manager = NodeManager::new(7, &config, queue_tx, radio_tx);
        let mut leds = RoleLedController::init(&config).await.unwrap();

        manager.handle(InternalMessage::ButtonPressed, &mut leds).await;

        // The press goes out as a call plus our own announce
        assert!(matches!(
            radio_rx.recv().await,
            Some(RadioMessage::Broadcast(PeerMessage::ElectionCall { id: 7 }))
        ));
        assert!(matches!(
            radio_rx.recv().await,
            Some(RadioMessage::Broadcast(PeerMessage::Announce { id: 7 }))
        ));

        // Nobody else speaks up before the window closes
        let expiry = expect_expiry(&mut queue_rx).await;
        manager.handle(expiry, &mut leds).await;

        assert_eq!(manager.role(), Role::Leader);
    }

    #[tokio::test]
    async fn test_higher_peer_wins() {
        let config = test_config();
        let (queue_tx, mut queue_rx) = mpsc::channel(16);
        let (radio_tx, _radio_rx) = mpsc::channel(16);
        let mut manager = NodeManager::new(7, &config, queue_tx, radio_tx);
        let mut leds = RoleLedController::init(&config).await.unwrap();

        manager.handle(InternalMessage::ButtonPressed, &mut leds).await;
        manager
            .handle(InternalMessage::Announce { id: 99 }, &mut leds)
            .await;

        let expiry = expect_expiry(&mut queue_rx).await;
        manager.handle(expiry, &mut leds).await;

        assert_eq!(manager.role(), Role::Pleb);
    }

    #[tokio::test]
    async fn test_remote_call_triggers_announce() {
        let config = test_config();
        let (queue_tx, mut queue_rx) = mpsc::channel(16);
        let (radio_tx, mut radio_rx) = mpsc::channel(16);
        let mut manager = NodeManager::new(7, &config, queue_tx, radio_tx);
        let mut leds = RoleLedController::init(&config).await.unwrap();

        manager
            .handle(InternalMessage::ElectionCall { id: 9 }, &mut leds)
            .await;

        // We answer the call with our own ID (after jitter)
        assert!(matches!(
            radio_rx.recv().await,
            Some(RadioMessage::Broadcast(PeerMessage::Announce { id: 7 }))
        ));

        let expiry = expect_expiry(&mut queue_rx).await;
        manager.handle(expiry, &mut leds).await;

        // The caller had the higher ID
        assert_eq!(manager.role(), Role::Pleb);
    }

    #[tokio::test]
    async fn test_stale_window_is_ignored() {
        let config = test_config();
        let (queue_tx, mut queue_rx) = mpsc::channel(16);
        let (radio_tx, _radio_rx) = mpsc::channel(16);
        let mut manager = NodeManager::new(7, &config, queue_tx, radio_tx);
        let mut leds = RoleLedController::init(&config).await.unwrap();

        // Two presses back to back restart the round
        manager.handle(InternalMessage::ButtonPressed, &mut leds).await;
        manager.handle(InternalMessage::ButtonPressed, &mut leds).await;

        // Both timers fire close together and in no guaranteed order
        let a = expect_expiry(&mut queue_rx).await;
        let b = expect_expiry(&mut queue_rx).await;
        let (stale, live) = match a {
            InternalMessage::WindowExpired { round: 1 } => (a, b),
            _ => (b, a),
        };

        // The first round's timer may not close round two
        manager.handle(stale, &mut leds).await;
        assert_eq!(manager.role(), Role::Undecided);

        manager.handle(live, &mut leds).await;
        assert_eq!(manager.role(), Role::Leader);
    }

    #[tokio::test]
    async fn test_late_announce_refreshes_roster_not_role() {
        let config = test_config();
        let (queue_tx, mut queue_rx) = mpsc::channel(16);
        let (radio_tx, _radio_rx) = mpsc::channel(16);
        let mut manager = NodeManager::new(7, &config, queue_tx, radio_tx);
        let mut leds = RoleLedController::init(&config).await.unwrap();

        manager.handle(InternalMessage::ButtonPressed, &mut leds).await;
        let expiry = expect_expiry(&mut queue_rx).await;
        manager.handle(expiry, &mut leds).await;
        assert_eq!(manager.role(), Role::Leader);

        // A straggler outside any window does not flip the decided role
        manager
            .handle(InternalMessage::Announce { id: 99 }, &mut leds)
            .await;
        assert_eq!(manager.role(), Role::Leader);
    }
}
