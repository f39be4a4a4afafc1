//! Minimal interactive chat client for the hub.
//!
//! Every line typed on stdin is sent as a `CHAT_MESSAGE`; every envelope
//! received from the hub is printed. Type `quit` or `exit` to leave.
//!
//! ```text
//! HUB_CLIENT_URL=ws://127.0.0.1:8080/ws cargo run -p hub-server --example ws_client
//! ```

use std::env;
use std::error::Error;

use futures::{SinkExt, StreamExt};
use hub_protocol::{ChatPayload, Envelope, MessageType};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let url = env::var("HUB_CLIENT_URL").unwrap_or_else(|_| "ws://127.0.0.1:8080/ws".to_string());
    let nickname = env::var("HUB_CLIENT_NAME").unwrap_or_else(|_| "anonymous".to_string());

    println!("Connecting to {}...", url);
    let (socket, _) = connect_async(url.as_str()).await?;
    println!("Connected. Type a chat line, or 'quit' to leave.\n");

    let (mut write, mut read) = socket.split();

    // Reader task: print whatever the hub sends us.
    let reader = tokio::spawn(async move {
        while let Some(msg) = read.next().await {
            match msg {
                Ok(Message::Text(text)) => match Envelope::decode(text.as_str().as_bytes()) {
                    Ok(env) => println!(
                        "<< [{}] {}: {}",
                        env.kind(),
                        env.player_id(),
                        env.raw_payload()
                    ),
                    Err(_) => println!("<< {}", text.as_str()),
                },
                Ok(Message::Close(_)) => {
                    println!("Server closed the connection.");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    eprintln!("Read error: {}", e);
                    break;
                }
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") {
            break;
        }

        let env = Envelope::new(
            MessageType::ChatMessage,
            nickname.as_str(),
            &ChatPayload { text: line.to_string() },
        )?;
        write.send(Message::text(env.encode()?)).await?;
    }

    write.close().await?;
    reader.abort();
    println!("Bye.");
    Ok(())
}
