use anyhow::Error;
use tokio::sync::mpsc;
use xbee_node::prelude::*;

#[tokio::main]
async fn main() -> Result<(), Error> {
    env_logger::init();

    // Load the config file
    println!("Starting config...");
    let config = Config::load()?;

    // Message queue
    let (message_queue_tx, message_queue_rx) = mpsc::channel(100);
    let (radio_channel_tx, radio_channel_rx) = mpsc::channel(100);

    // Initialize the radio and ask it who we are
    println!("Starting radio...");
    let mut radio = XBeeController::init(&config).await?;
    let my_id = radio.my_address().await?;
    println!("This node is 0x{:04X}", my_id);

    // Initialize the LEDs
    println!("Starting leds...");
    let leds = RoleLedController::init(&config).await?;

    // Initialize the button
    println!("Starting button...");
    let button = ButtonController::init(&config, message_queue_tx.clone()).await?;

    // The manager owns the election state
    println!("Starting manager...");
    let manager = NodeManager::new(my_id, &config, message_queue_tx.clone(), radio_channel_tx);

    let radio_handle = tokio::spawn(radio.start(radio_channel_rx, message_queue_tx.clone()));
    let button_handle = tokio::spawn(button.start());
    let manager_handle = tokio::spawn(manager.start(message_queue_rx, leds));

    println!("Joining...");
    let _ = tokio::join!(radio_handle, button_handle, manager_handle);

    Ok(())
}
