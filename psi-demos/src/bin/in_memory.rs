//! In-memory example of PSI protocol execution.
//!
//! This example runs a client and a server within a single process, passing
//! the serialized messages between them without network I/O.
//!
//! Run with:
//! ```bash
//! RUST_LOG=debug cargo run --bin in_memory [config.json]
//! ```
//!
//! The optional JSON file overrides the setup parameters, e.g.
//! `{"fpr": 0.001, "data_structure": "BloomFilter"}`.

use log::info;
use psi_core::{
    PsiClient, PsiServer, Request, Response, ServerSetup, SetupConfig, WireMessage,
};
use std::error::Error;
use std::{env, fs};

fn load_config() -> Result<SetupConfig, Box<dyn Error>> {
    let config = match env::args().nth(1) {
        Some(path) => {
            info!("Loading setup config from {}", path);
            serde_json::from_str(&fs::read_to_string(path)?)?
        }
        None => SetupConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn run_session(
    config: &SetupConfig,
    client_items: &[String],
    server_items: &[String],
    reveal_intersection: bool,
) -> Result<(), Box<dyn Error>> {
    let server = PsiServer::create_with_new_key(reveal_intersection)?;
    let mut client = PsiClient::create_with_new_key(reveal_intersection)?;

    // === Phase 1: Server setup and client request ===
    let setup_bytes = server
        .create_setup_message_with_config(config, server_items)?
        .to_bytes()?;
    let request_bytes = client.create_request(client_items)?.to_bytes()?;
    println!(
        "Setup message: {} bytes, request: {} bytes",
        setup_bytes.len(),
        request_bytes.len()
    );

    // === Phase 2: Server answers the request ===
    // In a real deployment these bytes travel over an encrypted channel
    let request = Request::from_bytes(&request_bytes)?;
    let response_bytes = server.process_request(&request)?.to_bytes()?;
    println!("Response: {} bytes", response_bytes.len());

    // === Phase 3: Client computes the result ===
    let setup = ServerSetup::from_bytes(&setup_bytes)?;
    let response = Response::from_bytes(&response_bytes)?;
    if reveal_intersection {
        let indices = client.get_intersection(&setup, &response)?;
        println!("Intersection ({} items):", indices.len());
        for index in indices {
            println!("  {}: {}", index, client_items[index]);
        }
    } else {
        let size = client.get_intersection_size(&setup, &response)?;
        println!("Intersection size: {}", size);
    }

    client.delete()?;
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    println!("=== PSI Protocol In-Memory Example (v{}) ===\n", psi_core::VERSION);

    let mut config = load_config()?;

    let client_items: Vec<String> = (0..10).map(|i| format!("Element {}", i)).collect();
    let server_items: Vec<String> = (0..100).map(|i| format!("Element {}", 2 * i)).collect();
    config.num_client_inputs = client_items.len();

    println!(
        "Client: {} items, server: {} items, {:?} setup with fpr {}",
        client_items.len(),
        server_items.len(),
        config.data_structure,
        config.fpr
    );

    println!("\n--- Cardinality only ---");
    run_session(&config, &client_items, &server_items, false)?;

    println!("\n--- Reveal intersection ---");
    run_session(&config, &client_items, &server_items, true)?;

    // Keys can be stored and restored; never share them
    let server = PsiServer::create_with_new_key(false)?;
    let key = server.get_private_key_bytes()?;
    let restored = PsiServer::create_from_key(&key, server.reveal_intersection())?;
    println!(
        "\nRestored server key {}.. ({:?})",
        hex::encode(&key[..4]),
        restored
    );

    Ok(())
}
