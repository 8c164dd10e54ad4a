//! Fast Information Block processor for a DAB receiver.
//!
//! Consumes 30-byte FIC Fast Information Blocks and decodes the FIGs they
//! carry into a live, queryable ensemble directory: services, sub-channels,
//! service components, and the current date and time. See [`FibProcessor`]
//! for the public entry point.
//!
//! Reconfiguration, announcement routing, frequency-information tables,
//! conditional access, region labels, OE=1 cross-references, and service
//! deletion are out of scope — see `DESIGN.md`.

pub mod bitcursor;
pub mod charset;
pub mod directory;
pub mod fic;
pub mod processor;
pub mod tables;

pub use directory::{DateTime, Directory, Service, ServiceComponent, SubChannel};
pub use fic::{process_fib, FibCallbacks, NullCallbacks};
pub use processor::{AudioServiceData, DataServiceData, FibProcessor, ServiceKind};
