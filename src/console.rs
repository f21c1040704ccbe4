//! Console Output
//!
//! The output side of the interactive session: the startup menu and the
//! printer task that renders peer events between prompts.

use tokio::sync::mpsc;

use crate::connection::PeerEvent;

/// Command menu shown at startup.
pub fn print_menu() {
    println!();
    println!("************** Chat Application **************");
    println!("Use the commands below:");
    println!("1. myip                  : Display IP address of this app");
    println!("2. myport                : Display listening port of this app");
    println!("3. connect <ip> <port>   : Connect to the app of another user");
    println!("4. list                  : List all the connections of this app");
    println!("5. terminate <id>        : Terminate a connection");
    println!("6. send <id> <message>   : Send a message to a connection");
    println!("7. exit                  : Close all connections & terminate the app");
    println!("**********************************************");
}

/// Renders peer events until the channel closes.
pub async fn print_events(mut events: mpsc::UnboundedReceiver<PeerEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            PeerEvent::Accepted { peer } => println!("New connection from {peer}"),
            PeerEvent::Message { peer, text } => println!("Message from {peer}: {text}"),
            PeerEvent::Terminated { id, peer } => {
                println!("Connection {id} ({peer}) terminated by remote host.")
            }
            PeerEvent::Closed { id, peer } => {
                println!("Connection {id} ({peer}) closed unexpectedly.")
            }
        }
    }
}
