//! # Intermediate Representation (IR)
//!
//! A print job is built as a [`PrintSpec`], an ordered list of
//! [`Command`]s, before any bytes exist. Specs come from code or from the
//! [`markup`] language, and the [`Encoder`] turns them into ESC/POS bytes.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌───────────┐     ┌──────────┐
//! │   Markup    │ ──► │  PrintSpec  │ ──► │  Resolve  │ ──► │ Encoder  │
//! │  (or code)  │     │(Vec<Command>)│    │ (symbols) │     │ (bytes)  │
//! └─────────────┘     └─────────────┘     └───────────┘     └──────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use recibo::ir::{Command, Encoder, PrintSpec};
//! use recibo::printer::PrinterProfile;
//! use recibo::protocol::text::Alignment;
//!
//! let mut spec = PrintSpec::with_init();
//! spec.push(Command::SetAlignment(Alignment::Center));
//! spec.push(Command::SetEmphasis(true));
//! spec.push(Command::text("HELLO\n"));
//!
//! // Inspect the IR
//! println!("{:#?}", spec);
//!
//! let bytes = Encoder::new(PrinterProfile::MM58).encode(&spec).unwrap();
//! assert_eq!(&bytes[..2], &[0x1B, 0x40]);
//! ```

mod codegen;
pub mod markup;
mod ops;

pub use codegen::Encoder;
pub use ops::*;
