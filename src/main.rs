use hearth::cabin;
use hearth::config::Settings;
use hearth::services::chat::ChatClient;
use hearth::session::controller::SessionState;
use hearth::session::driver::{VoiceCommand, VoiceDriver};
use hearth::session::event::ChatMessage;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Setup logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    // 2. Resolve configuration; no key means no calls, ever.
    let settings = match Settings::from_env() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("hearth: {}", e);
            std::process::exit(1);
        }
    };

    print_info_card();
    println!("fuzzy> {}", cabin::GREETING);
    println!("(type a question, or /call, /stop, /mic, /verify, /quit)");

    // 3. Voice driver + channels
    let (cmd_tx, cmd_rx) = mpsc::channel::<VoiceCommand>(8);
    let (messages_tx, mut messages_rx) = mpsc::channel::<ChatMessage>(64);
    let (driver, mut session_rx) = VoiceDriver::new(settings.clone(), cmd_rx, messages_tx);
    tokio::spawn(driver.run());

    // 4. Finalized voice-turn messages land in the chat history
    tokio::spawn(async move {
        while let Some(msg) = messages_rx.recv().await {
            print_message(&msg);
        }
    });

    // 5. Call status line
    tokio::spawn(async move {
        let mut last = SessionState::Idle;
        while session_rx.changed().await.is_ok() {
            let update = session_rx.borrow().clone();
            if update.state != last {
                match (update.state, &update.error) {
                    (SessionState::Connecting, _) => println!("  [call] connecting..."),
                    (SessionState::Active, _) => println!("  [call] live - speak freely"),
                    (SessionState::Idle, Some(err)) => println!("  [call] ended: {}", err),
                    (SessionState::Idle, None) => println!("  [call] ended"),
                    (SessionState::Error, _) => {}
                }
                last = update.state;
            }
        }
    });

    let chat = ChatClient::new(&settings);

    // 6. Console loop
    let stdin = tokio::io::stdin();
    let reader = BufReader::new(stdin);
    let mut lines = reader.lines();

    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }
        match line.as_str() {
            "/quit" => break,
            "/call" => {
                let _ = cmd_tx.send(VoiceCommand::Start).await;
            }
            "/stop" => {
                let _ = cmd_tx.send(VoiceCommand::Stop).await;
            }
            "/mic" => {
                let result = tokio::task::spawn_blocking(|| {
                    hearth::audio::meter::run_mic_check(5, Some(Path::new("mic-check.wav")))
                })
                .await;
                match result {
                    Ok(Ok(())) => println!("  mic check done (saved mic-check.wav)"),
                    Ok(Err(e)) => println!("  mic check failed: {}", e),
                    Err(e) => println!("  mic check failed: {}", e),
                }
            }
            "/verify" => match chat.verify().await {
                Ok(()) => println!("  connection OK - Fuzzy's brain is active"),
                Err(e) => println!("  connection failed: {}", e),
            },
            question => {
                println!("  consulting the guides...");
                match chat.ask(question).await {
                    Ok(reply) => {
                        println!("fuzzy> {}", reply.text);
                        for citation in &reply.citations {
                            println!("       [{}] {}", citation.title, citation.uri);
                        }
                    }
                    Err(e) => println!("fuzzy> Error: {}", e),
                }
            }
        }
    }

    Ok(())
}

fn print_info_card() {
    let d = &cabin::DETAILS;
    println!("== Fuzzy Bear Cabin - Stay Brief ==");
    println!("  Wi-Fi: {} / {}", d.wifi_name, d.wifi_pass);
    println!("  Check-in: {}   Check-out: {}", d.check_in, d.check_out);
    println!("  Host: {}", d.host_phone);
    println!("  Rules:");
    for rule in d.rules {
        println!("    - {}", rule);
    }
    println!();
}

fn print_message(msg: &ChatMessage) {
    println!(
        "{}> {} ({})",
        msg.speaker.label(),
        msg.text,
        msg.timestamp.format("%H:%M")
    );
}
