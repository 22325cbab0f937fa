//! # Events Module
//!
//! Channel-based progress reporting so any front end (CLI, GUI) can follow
//! a scan or a review without the core knowing about it.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         if let Event::Fingerprint(FingerprintEvent::Progress(p)) = event {
//!             println!("{}/{}", p.completed, p.discovered);
//!         }
//!     }
//! });
//!
//! scanner.scan_with_events(&roots, &sender)?;
//! ```

mod channel;
mod types;

pub use channel::{null_sender, EventChannel, EventReceiver, EventSender};
pub use types::*;
