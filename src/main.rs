use pokedex_layers::{
    DataKind, DirectoryLoader, Generation, GenerationNumber, Generations, Language, Manifest,
};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;

const USAGE: &str =
    "usage: pokedex-layers <manifest.ron> <generation> <kind> <name> [--mod M] [--lang L]... [--details] [-v]";

struct Args {
    manifest: PathBuf,
    generation: GenerationNumber,
    kind: DataKind,
    name: String,
    mod_name: Option<String>,
    languages: Vec<Language>,
    details: bool,
    verbose: bool,
}

fn parse_args(mut raw: impl Iterator<Item = String>) -> Result<Args, String> {
    let mut positional = Vec::new();
    let mut mod_name = None;
    let mut languages = Vec::new();
    let mut details = false;
    let mut verbose = false;

    while let Some(arg) = raw.next() {
        match arg.as_str() {
            "--mod" => mod_name = Some(raw.next().ok_or("--mod needs a value")?),
            "--lang" => {
                let code = raw.next().ok_or("--lang needs a value")?;
                let language =
                    Language::from_str(&code).map_err(|_| format!("unknown language '{}'", code))?;
                languages.push(language);
            }
            "--details" => details = true,
            "-v" | "--verbose" => verbose = true,
            _ => positional.push(arg),
        }
    }

    let [manifest, generation, kind, name]: [String; 4] = positional
        .try_into()
        .map_err(|_| USAGE.to_string())?;
    let generation = generation
        .trim_start_matches("gen")
        .parse::<u8>()
        .ok()
        .and_then(GenerationNumber::new)
        .ok_or_else(|| format!("invalid generation '{}'", generation))?;
    let kind = DataKind::from_str(&kind).map_err(|_| format!("unknown kind '{}'", kind))?;

    Ok(Args {
        manifest: PathBuf::from(manifest),
        generation,
        kind,
        name,
        mod_name,
        languages,
        details,
        verbose,
    })
}

fn print_entry(view: &Generation, kind: DataKind, name: &str) -> Result<(), Box<dyn Error>> {
    let Some(entry) = view.get(kind, name) else {
        return Err(format!("no {} named '{}' in {}", kind, name, view.num()).into());
    };

    println!("{}", serde_json::to_string_pretty(&entry.to_json())?);
    for (field, targets) in entry.resolve_references() {
        let names: Vec<String> = targets.iter().map(|t| t.name().to_string()).collect();
        if names.is_empty() {
            println!("  {} -> (unresolved)", field);
        } else {
            println!("  {} -> {}", field, names.join(", "));
        }
    }
    Ok(())
}

async fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let text = tokio::fs::read_to_string(&args.manifest).await?;
    let manifest = Manifest::from_ron(&text, &args.manifest.display().to_string())?;
    let root = args.manifest.parent().unwrap_or(Path::new("."));

    let registry = Generations::new(manifest, DirectoryLoader::new(root)).await?;
    let mod_name = args.mod_name.as_deref();
    let view = if args.details {
        registry
            .get_with_details(args.generation, mod_name, &args.languages)
            .await?
    } else {
        registry.get(args.generation, mod_name, &args.languages).await?
    };
    print_entry(&view, args.kind, &args.name)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{}", message);
            return ExitCode::FAILURE;
        }
    };

    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
