//! # Private Set Intersection (PSI) Protocol
//!
//! This library implements two-party Private Set Intersection using
//! Elliptic Curve Diffie-Hellman (ECDH) on the Ristretto group
//! (curve25519-dalek).
//!
//! A client and a server each hold a private set of byte strings. At the end
//! of the protocol the client learns either which of its elements are in the
//! server's set or only how many are, and the server learns nothing.
//!
//! ## Features
//!
//! - **Transport Agnostic**: The library builds and consumes messages but
//!   leaves moving them to the user.
//! - **Deterministic Wire Format**: Every message implements [`WireMessage`]
//!   and serializes to the same bytes on every platform.
//! - **Compact Setup**: The server's set can be shipped as a raw sorted list,
//!   a Bloom filter or a Golomb-compressed set, trading exactness for size.
//! - **Input as Byte Arrays**: Accepts anything that is `AsRef<[u8]>`,
//!   handling hashing internally.
//!
//! ## Protocol Overview
//!
//! 1. **Setup**: The server blinds its elements, `H(y)^s`, and encodes them
//!    into a [`ServerSetup`].
//!
//! 2. **Request**: The client blinds its elements, `H(x)^c`, and sends them
//!    sorted as a [`Request`].
//!
//! 3. **Response**: The server blinds the request again, `H(x)^(cs)`, and
//!    returns it as a [`Response`], in request order when the intersection is
//!    revealed and sorted otherwise. Both parties pick the mode up front; a
//!    server rejects requests in the other mode.
//!
//! 4. **Intersection**: The client strips its own blinding, leaving `H(x)^s`,
//!    and looks each element up in the setup.
//!
//! Steps 1 and 2 are independent; the setup can be reused for many requests
//! as long as the server keeps its key.
//!
//! ## Example Usage
//!
//! ```ignore
//! use psi_core::{DataStructure, PsiClient, PsiServer, WireMessage};
//!
//! let server = PsiServer::create_with_new_key(true)?;
//! let mut client = PsiClient::create_with_new_key(true)?;
//!
//! let server_items = ["apple", "banana", "cherry"];
//! let client_items = ["banana", "date"];
//!
//! let setup = server.create_setup_message(1e-9, client_items.len(), &server_items,
//!     DataStructure::Gcs)?;
//! let request = client.create_request(&client_items)?;
//!
//! // send_to_server(request.to_bytes()?);
//! let response = server.process_request(&request)?;
//!
//! assert_eq!(client.get_intersection(&setup, &response)?, vec![0]);
//! # Ok::<(), psi_core::PsiError>(())
//! ```
//!
//! ## Security Considerations
//!
//! - Messages MUST travel over an authenticated, encrypted channel; the
//!   protocol only protects against a semi-honest peer.
//! - A server key reused across sessions lets clients link their queries.
//! - With a Bloom filter or GCS the client may see false positives at about
//!   the configured rate.
//!
//! ## Modules
//!
//! - [`client`] - Client role
//! - [`server`] - Server role
//! - [`messages`] - Wire messages
//! - [`datastructure`] - Encodings of the server's set
//! - [`config`] - Setup parameters
//! - [`crypto`] - Group operations and keys
//! - [`error`] - Error types

pub use client::PsiClient;
pub use config::SetupConfig;
pub use datastructure::DataStructure;
pub use error::{PsiError, Result};
pub use messages::{Request, Response, ServerSetup, WireMessage};
pub use server::PsiServer;

pub mod client;
pub mod config;
pub mod crypto;
pub mod datastructure;
pub mod error;
pub mod messages;
pub mod server;

/// Version of this library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
