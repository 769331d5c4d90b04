//! # Recibo CLI
//!
//! Command-line interface for ESC/POS receipt printing.
//!
//! ## Usage
//!
//! ```bash
//! # Print a markup receipt over the network
//! recibo print --tcp 192.168.1.50 --cut receipt.txt
//!
//! # Print a picture over Bluetooth with error diffusion
//! recibo image --bluetooth 66:22:B3:01:02:03 --dither floyd logo.png
//!
//! # Ask a USB printer for its status
//! recibo status --usb 0416:5011
//!
//! # Send raw bytes (here: open the cash drawer)
//! recibo raw --rfcomm /dev/rfcomm0 "1B 70 00 19 FA"
//!
//! # Encode without a printer
//! echo "[C]<b>Hello</b>" | recibo encode - --out hello.bin
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use image::imageops::FilterType;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use recibo::{
    Command, Encoder, PrintSpec, PrinterProfile, ReciboError, Transport, WriterConfig,
    ir::markup::MarkupParser,
    job::PrintJobWriter,
    protocol::{commands::CutMode, graphics::RasterScale, text::Alignment},
    render::dither::{RasterMode, Rasterizer},
    transport::{BluetoothConnector, Connection, TcpConnector, UsbConnector, bluetooth},
};

/// Recibo - ESC/POS receipt printer utility
#[derive(Parser, Debug)]
#[command(name = "recibo")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log transport and job details (overrides RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print a markup receipt
    Print {
        /// Markup file, or `-` for stdin
        input: PathBuf,

        #[command(flatten)]
        receipt: ReceiptArgs,

        #[command(flatten)]
        printer: PrinterArgs,
    },

    /// Print a picture
    Image {
        /// Image file (PNG, JPEG, GIF, BMP, ...)
        path: PathBuf,

        /// How gray levels become dots
        #[arg(long, value_enum, default_value_t = Dither::Floyd)]
        dither: Dither,

        /// Luminance below which a pixel is inked (threshold mode)
        #[arg(long, default_value_t = 128)]
        level: u8,

        /// Printer-side magnification
        #[arg(long, value_enum, default_value_t = Scale::Normal)]
        scale: Scale,

        #[command(flatten)]
        receipt: ReceiptArgs,

        #[command(flatten)]
        printer: PrinterArgs,
    },

    /// Query the printer status
    Status {
        #[command(flatten)]
        printer: PrinterArgs,
    },

    /// Send raw hex bytes, e.g. "1B 40"
    Raw {
        hex: String,

        #[command(flatten)]
        printer: PrinterArgs,
    },

    /// Encode a markup receipt to a file without printing
    Encode {
        /// Markup file, or `-` for stdin
        input: PathBuf,

        /// Where to write the ESC/POS bytes
        #[arg(long, short, value_name = "FILE")]
        out: PathBuf,

        #[command(flatten)]
        receipt: ReceiptArgs,

        #[command(flatten)]
        settings: SettingsArgs,
    },
}

/// Commands wrapped around the receipt body.
#[derive(Args, Debug)]
struct ReceiptArgs {
    /// Reset the printer first
    #[arg(long)]
    init: bool,

    /// Feed this many lines at the end
    #[arg(long, value_name = "LINES")]
    feed: Option<u8>,

    /// Cut the paper at the end
    #[arg(long)]
    cut: bool,
}

impl ReceiptArgs {
    fn wrap(&self, body: PrintSpec) -> PrintSpec {
        let mut spec = if self.init {
            PrintSpec::with_init()
        } else {
            PrintSpec::new()
        };
        spec.extend(body);
        if let Some(lines) = self.feed {
            spec.push(Command::FeedLines(lines));
        }
        if self.cut {
            spec.push(Command::CutPaper(CutMode::Full));
        }
        spec
    }
}

#[derive(Args, Debug)]
struct SettingsArgs {
    /// Writer configuration (JSON)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Printer preset: 58mm or 80mm
    #[arg(long, value_parser = PrinterProfile::parse)]
    paper: Option<PrinterProfile>,
}

impl SettingsArgs {
    /// File values first, then flags.
    fn writer_config(&self, preset: WriterConfig) -> Result<WriterConfig, ReciboError> {
        let mut config = match &self.config {
            Some(path) => WriterConfig::load(path)?,
            None => preset,
        };
        if let Some(profile) = self.paper {
            config.printer_capabilities = profile.capabilities;
        }
        Ok(config)
    }
}

#[derive(Args, Debug)]
struct PrinterArgs {
    #[command(flatten)]
    medium: MediumArgs,

    /// Poll the printer status after the job
    #[arg(long)]
    check_status: bool,

    #[command(flatten)]
    settings: SettingsArgs,
}

/// At most one way to reach the printer.
#[derive(Args, Debug)]
#[group(id = "medium", multiple = false)]
struct MediumArgs {
    /// Network printer, HOST[:PORT] (port 9100 by default)
    #[arg(long, value_name = "HOST[:PORT]", value_parser = TcpConnector::parse)]
    tcp: Option<TcpConnector>,

    /// Bluetooth address of a paired printer bound to an RFCOMM device
    #[arg(long, value_name = "MAC", value_parser = BluetoothConnector::address)]
    bluetooth: Option<BluetoothConnector>,

    /// RFCOMM device path [default: /dev/rfcomm0]
    #[arg(long, value_name = "PATH")]
    rfcomm: Option<PathBuf>,

    /// USB printer, VID:PID in hex
    #[arg(long, value_name = "VID:PID", value_parser = UsbConnector::parse)]
    usb: Option<UsbConnector>,
}

impl PrinterArgs {
    fn writer_config(&self) -> Result<WriterConfig, ReciboError> {
        let medium = &self.medium;
        let preset = if medium.tcp.is_some() {
            WriterConfig::tcp()
        } else if medium.usb.is_some() {
            WriterConfig::usb()
        } else {
            WriterConfig::bluetooth()
        };
        let mut config = self.settings.writer_config(preset)?;
        config.query_status |= self.check_status;
        Ok(config)
    }

    /// Open the selected printer.
    fn connect(&self) -> Result<Box<dyn Transport>, ReciboError> {
        let medium = &self.medium;
        let mut transport: Box<dyn Transport> = if let Some(tcp) = &medium.tcp {
            Box::new(Connection::new(tcp.clone()))
        } else if let Some(usb) = &medium.usb {
            Box::new(Connection::new(usb.clone()))
        } else if let Some(bt) = &medium.bluetooth {
            Box::new(Connection::new(bt.clone()))
        } else {
            let device = medium
                .rfcomm
                .clone()
                .unwrap_or_else(|| PathBuf::from(bluetooth::DEFAULT_DEVICE));
            Box::new(Connection::new(BluetoothConnector::device(device)))
        };
        transport.open()?;
        Ok(transport)
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Dither {
    Threshold,
    Floyd,
    Bayer,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Scale {
    Normal,
    DoubleWidth,
    DoubleHeight,
    Quadruple,
}

impl From<Scale> for RasterScale {
    fn from(scale: Scale) -> Self {
        match scale {
            Scale::Normal => RasterScale::Normal,
            Scale::DoubleWidth => RasterScale::DoubleWidth,
            Scale::DoubleHeight => RasterScale::DoubleHeight,
            Scale::Quadruple => RasterScale::Quadruple,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(command: Commands) -> Result<(), ReciboError> {
    match command {
        Commands::Print {
            input,
            receipt,
            printer,
        } => {
            let config = printer.writer_config()?;
            let body = MarkupParser::new(&config.profile()).parse(&read_input(&input)?)?;
            send(&printer, &config, &receipt.wrap(body))
        }

        Commands::Image {
            path,
            dither,
            level,
            scale,
            receipt,
            printer,
        } => {
            let config = printer.writer_config()?;
            let image = image_command(&path, &config, dither, level, scale.into())?;
            let body = [Command::SetAlignment(Alignment::Center), image]
                .into_iter()
                .collect();
            send(&printer, &config, &receipt.wrap(body))
        }

        Commands::Status { printer } => {
            let config = printer.writer_config()?;
            let mut transport = printer.connect()?;
            let status = PrintJobWriter::new(&config)
                .query_status(&mut transport)
                .map_err(|error| recibo::job::JobFailure {
                    phase: recibo::job::JobPhase::StatusCheck,
                    bytes_written: 0,
                    error,
                })?;
            transport.close();
            println!("{}", serde_json::to_string_pretty(&status)?);
            if let Some(fault) = status.fault() {
                return Err(fault.into());
            }
            Ok(())
        }

        Commands::Raw { hex, printer } => {
            let config = printer.writer_config()?;
            let spec = [Command::raw_hex(&hex)?].into_iter().collect();
            send(&printer, &config, &spec)
        }

        Commands::Encode {
            input,
            out,
            receipt,
            settings,
        } => {
            let config = settings.writer_config(WriterConfig::default())?;
            let body = MarkupParser::new(&config.profile()).parse(&read_input(&input)?)?;
            let bytes = Encoder::new(config.profile()).encode(&receipt.wrap(body))?;
            fs::write(&out, &bytes)?;
            println!("Wrote {} bytes to {}", bytes.len(), out.display());
            Ok(())
        }
    }
}

/// Read a file, or stdin for `-`.
fn read_input(path: &Path) -> Result<String, ReciboError> {
    if path == Path::new("-") {
        Ok(io::read_to_string(io::stdin())?)
    } else {
        Ok(fs::read_to_string(path)?)
    }
}

/// Load a picture, shrink it to the printable width and rasterize it.
fn image_command(
    path: &Path,
    config: &WriterConfig,
    dither: Dither,
    level: u8,
    scale: RasterScale,
) -> Result<Command, ReciboError> {
    let mut img = image::open(path)
        .map_err(|e| ReciboError::Image(format!("Failed to open {}: {}", path.display(), e)))?;

    let max_width = config.printer_capabilities.max_dots_per_line / scale.x_factor();
    if img.width() > max_width {
        debug!(from = img.width(), to = max_width, "resizing image to printable width");
        img = img.resize(max_width, u32::MAX, FilterType::Triangle);
    }

    let mode = match dither {
        Dither::Threshold => RasterMode::Threshold(level),
        Dither::Floyd => RasterMode::FloydSteinberg,
        Dither::Bayer => RasterMode::Bayer,
    };
    let bitmap = Rasterizer::new(max_width).rasterize(&img, mode)?;
    Ok(Command::RasterImage { bitmap, scale })
}

/// Open the printer, submit one job and report the outcome.
fn send(printer: &PrinterArgs, config: &WriterConfig, spec: &PrintSpec) -> Result<(), ReciboError> {
    let writer = PrintJobWriter::new(config);
    // Encode before connecting so markup errors never touch the printer
    let bytes = writer.encoder().encode(spec)?;

    let mut transport = printer.connect()?;
    let result = writer.submit_bytes(&bytes, &mut transport);
    transport.close();

    let report = result.into_result()?;
    println!(
        "Printed {} bytes in {} chunks",
        report.bytes_written, report.chunks
    );
    if let Some(status) = report.status {
        debug!(?status, "printer status");
    }
    Ok(())
}
