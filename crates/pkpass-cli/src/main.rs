//! Command-line interface for building signed Wallet passes.
//!
//! Reads a pass model directory and writes a signed `.pkpass` bundle using
//! PKCS#12 or PEM-format Pass Type ID certificates.

mod model;

use clap::Parser;
use pkpass::PkPass;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pkpass")]
#[command(about = "Build and sign Apple Wallet passes", version)]
struct Cli {
    /// Pass model directory (pass.json, *.png, *.lproj/)
    model: PathBuf,

    /// Output file (default: <model>.pkpass)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Certificate file (PEM or DER)
    #[arg(short = 'c', long, env = "PKPASS_CERTIFICATE")]
    certificate: Option<PathBuf>,

    /// Private key file (PEM)
    #[arg(short = 'k', long, env = "PKPASS_PRIVATE_KEY")]
    private_key: Option<PathBuf>,

    /// PKCS#12 file (.p12)
    #[arg(short = 'p', long, env = "PKPASS_PKCS12", conflicts_with_all = ["certificate", "private_key"])]
    pkcs12: Option<PathBuf>,

    /// Apple WWDR intermediate certificate (PEM or DER)
    #[arg(short = 'w', long, env = "PKPASS_WWDR")]
    wwdr: Option<PathBuf>,

    /// Password for private key or PKCS#12
    #[arg(long, env = "PKPASS_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Override serialNumber from pass.json
    #[arg(long)]
    serial_number: Option<String>,

    /// ZIP compression level (0-9)
    #[arg(short = 'z', long, default_value = "6")]
    zip_level: u32,

    /// Log verbosity when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut model = model::load_model(&cli.model)?;
    if let Some(serial) = cli.serial_number.clone() {
        model.descriptor.serial_number = Some(serial);
    }

    let mut builder = PkPass::new()
        .descriptor(model.descriptor)
        .images(model.images)
        .localizations(model.localizations)
        .compression_level(cli.zip_level);

    if let Some(ref p12) = cli.pkcs12 {
        builder = builder.pkcs12(p12);
    }
    if let Some(ref cert) = cli.certificate {
        builder = builder.certificate(cert);
    }
    if let Some(ref key) = cli.private_key {
        builder = builder.private_key(key);
    }
    if let Some(password) = cli.password {
        builder = builder.password(password);
    }
    if let Some(ref wwdr) = cli.wwdr {
        builder = builder.intermediate(wwdr);
    }

    let output = cli.output.unwrap_or_else(|| default_output(&cli.model));
    builder.write_to(&output)?;

    println!("Built: {}", output.display());
    Ok(())
}

/// `Flowers.pass/` becomes `Flowers.pkpass` next to it.
fn default_output(model: &std::path::Path) -> PathBuf {
    let mut out = model.to_path_buf();
    out.set_extension("pkpass");
    out
}
