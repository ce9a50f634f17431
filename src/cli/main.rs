/**
 * teammatch-chat
 *
 * Headless chat client. Restores the saved session, or logs in with
 * `TEAMMATCH_EMAIL` / `TEAMMATCH_PASSWORD`, then prints incoming messages and
 * sends every line typed on stdin to the open conversation.
 *
 * Usage: `teammatch-chat [peer-user-id]`
 *
 * Commands: `/dm <user-id>`, `/global`, `/online`, `/logout`, `/quit`
 */
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, BufReader};

use teammatch::client::{ClientContext, ClientError, Config, ConversationStore};
use teammatch::shared::{ChatMessage, ConversationKey};

const EMAIL_ENV: &str = "TEAMMATCH_EMAIL";
const PASSWORD_ENV: &str = "TEAMMATCH_PASSWORD";
const CONFIG_ENV: &str = "TEAMMATCH_CONFIG";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&env_filter))
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load(std::env::var_os(CONFIG_ENV).map(Into::into))?;
    tracing::info!(server = %config.server_url(), "starting");

    let context = Arc::new(ClientContext::with_defaults(config)?);
    let user = match context.start().await? {
        Some(user) => user,
        None => {
            let (Ok(email), Ok(password)) = (std::env::var(EMAIL_ENV), std::env::var(PASSWORD_ENV)) else {
                eprintln!("No saved session. Set {} and {} to log in.", EMAIL_ENV, PASSWORD_ENV);
                context.shutdown().await;
                return Ok(());
            };
            context.auth().login(&email, &password).await?
        }
    };
    println!("Logged in as {} ({})", user.name, user.role);

    let seen = Arc::new(Mutex::new(HashSet::new()));
    let mut key = ConversationKey::from_peer(std::env::args().nth(1).as_deref());
    open(context.conversations(), &key, &seen).await;

    let printer = tokio::spawn(print_updates(context.clone(), seen.clone()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line.split_once(' ').unwrap_or((line, "")) {
            ("/quit", _) => break,
            ("/logout", _) => {
                context.auth().logout();
                break;
            }
            ("/global", _) => {
                key = ConversationKey::Global;
                open(context.conversations(), &key, &seen).await;
            }
            ("/dm", peer) if !peer.trim().is_empty() => {
                key = ConversationKey::Peer(peer.trim().to_string());
                open(context.conversations(), &key, &seen).await;
            }
            ("/online", _) => println!("online: {}", context.channel().online_users().join(", ")),
            _ => match context.conversations().send_message(line, &key).await {
                Ok(_) => {}
                Err(ClientError::Validation(_)) => {}
                Err(e) => eprintln!("! {}", e),
            },
        }
    }

    printer.abort();
    context.shutdown().await;
    Ok(())
}

type Seen = Arc<Mutex<HashSet<String>>>;

async fn open(conversations: &ConversationStore, key: &ConversationKey, seen: &Seen) {
    println!("--- {} ---", key);
    match conversations.select(key.clone()).await {
        Ok(messages) => print_new(&messages, seen),
        Err(e) => eprintln!("! {}", e),
    }
}

/// Print messages as they land in the selected conversation
async fn print_updates(context: Arc<ClientContext>, seen: Seen) {
    let conversations = context.conversations();
    let mut updates = conversations.subscribe();

    while let Ok(key) = updates.recv().await {
        if conversations.selected().as_ref() == Some(&key) {
            print_new(&conversations.messages(&key), &seen);
        }
    }
}

fn print_new(messages: &[ChatMessage], seen: &Seen) {
    let mut seen = seen.lock().unwrap_or_else(|p| p.into_inner());
    for message in messages {
        if seen.insert(message.id.clone()) {
            print_message(message);
        }
    }
}

fn print_message(message: &ChatMessage) {
    println!(
        "[{}] {}: {}",
        message.created_at.format("%H:%M"),
        message.sender_name(),
        message.content
    );
}
