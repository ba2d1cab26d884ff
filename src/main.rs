use clap::{Parser, Subcommand};
use farc::dialect::{FLAG_COMPRESS, FLAG_ENCRYPT, FLAG_LITTLE_ENDIAN};
use farc::{Archive, ParseMode, Signature};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "farc", about = "FARC archive container CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pack one or more files into an archive
    Pack {
        #[arg(short, long)]
        output: PathBuf,
        /// Dialect: modern (default) or legacy
        #[arg(short, long, default_value = "modern")]
        signature: String,
        /// Zstd compression level
        #[arg(short, long, default_value = "3")]
        level: i32,
        /// Payload alignment (power of two)
        #[arg(short, long, default_value = "16")]
        alignment: u32,
        /// Place the TOC after the payload region (modern dialect only)
        #[arg(long)]
        footer: bool,
        /// Store payloads verbatim instead of compressing
        #[arg(long)]
        store: bool,
        /// Encrypt every entry (AES-256-GCM, Argon2id key derivation)
        #[arg(short, long)]
        password: Option<String>,
        #[arg(short, long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,
    },
    /// Unpack an archive
    Unpack {
        input: PathBuf,
        #[arg(short = 'C', long, default_value = ".")]
        output_dir: PathBuf,
        #[arg(short, long)]
        password: Option<String>,
    },
    /// List archive contents
    List {
        input: PathBuf,
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Show archive metadata
    Info {
        input: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    match Cli::parse().command {
        // ── Pack ─────────────────────────────────────────────────────────────
        Commands::Pack { output, signature, level, alignment, footer, store, password, input } => {
            let signature = parse_signature(&signature)?;
            let mut flags = if store { 0 } else { FLAG_COMPRESS };
            if password.is_some() {
                flags |= FLAG_ENCRYPT;
            }
            let mut ar = Archive::new(signature, flags, footer);
            ar.set_compression_level(level);
            ar.set_alignment(alignment)?;
            if let Some(ref pwd) = password {
                ar.set_password(pwd)?;
            }
            for path in &input {
                let data = std::fs::read(path)?;
                let name = path
                    .file_name()
                    .ok_or_else(|| format!("not a file: {}", path.display()))?
                    .to_string_lossy();
                ar.add_file_data(&name, &data)?;
                println!("  packed  {}", path.display());
            }
            ar.write_file(&output, false)?;
            println!("Created: {}", output.display());
        }

        // ── Unpack ───────────────────────────────────────────────────────────
        Commands::Unpack { input, output_dir, password } => {
            let mut ar = open_archive(&input, &password)?;
            ar.extract_all(&output_dir)?;
            println!("Unpacked to: {}", output_dir.display());
        }

        // ── List ─────────────────────────────────────────────────────────────
        Commands::List { input, password } => {
            let mut ar = open_archive(&input, &password)?;
            println!("Archive: {}", input.display());
            println!("{:<30} {:>12}  {:<5}  Content hash", "Name", "Size", "Flags");
            for index in 0..ar.len() {
                let data = ar.data_by_index(index)?;
                let hash = hex::encode(&blake3::hash(data).as_bytes()[..6]);
                let entry = ar.file_by_index(index)?;
                let flags = format!(
                    "{}{}",
                    if entry.compressed() { "c" } else { "-" },
                    if entry.encrypted() { "e" } else { "-" },
                );
                println!("{:<30} {:>12}  {:<5}  {}", entry.name(), entry.size(), flags, hash);
            }
        }

        // ── Info ─────────────────────────────────────────────────────────────
        Commands::Info { input } => {
            let bytes = std::fs::read(&input)?;
            let total = bytes.len();
            let ar = Archive::parse(bytes, ParseMode::Lazy)?;
            println!("── FARC archive ─────────────────────────────────────────");
            println!("  Path         {}", input.display());
            println!("  Dialect      {}", ar.signature().name());
            println!("  Endianness   {}", if ar.flags() & FLAG_LITTLE_ENDIAN != 0 { "little" } else { "big" });
            println!("  Compress     {}", ar.flags() & FLAG_COMPRESS != 0);
            println!("  Encrypt      {}", ar.flags() & FLAG_ENCRYPT != 0);
            println!("  Level        {}", ar.compression_level());
            println!("  Alignment    {}", ar.alignment());
            println!("  Footer TOC   {}", ar.ft());
            println!("  Entries      {}", ar.len());
            println!("  Total bytes  {}", total);
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn open_archive(
    path: &PathBuf,
    password: &Option<String>,
) -> Result<Archive, Box<dyn std::error::Error>> {
    Ok(match password {
        Some(pwd) => Archive::open_encrypted(path, ParseMode::Lazy, pwd)?,
        None => Archive::open(path, ParseMode::Lazy)?,
    })
}

fn parse_signature(s: &str) -> Result<Signature, String> {
    match s.to_lowercase().as_str() {
        "legacy" => Ok(Signature::Legacy),
        "modern" => Ok(Signature::Modern),
        other => Err(format!("unknown signature '{other}' (use legacy or modern)")),
    }
}
