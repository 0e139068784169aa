mod samples;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use slc::{Compiler, GlslEnvironment, SpirvEnvironment};
use std::{fs::File, io::Write, path::Path};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Target {
    Spirv,
    Glsl,
    Sl,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(help = "Built-in sample module to compile. Use --list to see them.")]
    sample: Option<String>,

    #[arg(
        short,
        long,
        help = "Output file path. The output is printed to stdout if this \
        path is not given (SPIR-V is hex-dumped rather than written raw)."
    )]
    out_path: Option<String>,

    #[arg(long, value_enum, default_value = "spirv", help = "Output form.")]
    target: Target,

    #[arg(long, help = "List the built-in sample modules and exit.")]
    list: bool,

    #[arg(long, help = "Dump a JSON reflection summary instead of the compiled output.")]
    reflect: bool,

    #[arg(long, default_value = "1.3", help = "SPIR-V target version (1.0 to 1.3).")]
    spv_version: String,

    #[arg(long, default_value = "310es", help = "GLSL target, e.g. `310es` or `430`.")]
    glsl_version: String,
}

#[derive(Serialize)]
struct BindingSummary {
    name: String,
    ty: String,
    set: Option<u32>,
    binding: Option<u32>,
}

#[derive(Serialize)]
struct EntryPointSummary {
    name: String,
    stage: String,
}

#[derive(Serialize)]
struct ReflectionSummary {
    module: String,
    bindings: Vec<BindingSummary>,
    entry_points: Vec<EntryPointSummary>,
}

fn parse_spv_version(text: &str) -> Result<SpirvEnvironment> {
    let (major, minor) = text
        .split_once('.')
        .context("SPIR-V version must look like `1.3`")?;
    Ok(SpirvEnvironment {
        spv_major: major.parse().context("bad SPIR-V major version")?,
        spv_minor: minor.parse().context("bad SPIR-V minor version")?,
    })
}

fn parse_glsl_version(text: &str) -> Result<GlslEnvironment> {
    let (number, gl_es) = match text.strip_suffix("es") {
        Some(number) => (number, true),
        None => (text, false),
    };
    let number: u32 = number.parse().context("bad GLSL version number")?;
    Ok(GlslEnvironment {
        gl_major: number / 100,
        gl_minor: (number % 100) / 10,
        gl_es,
        ..Default::default()
    })
}

fn write_output(out_path: Option<&str>, bytes: &[u8], hex_on_stdout: bool) -> Result<()> {
    match out_path {
        Some(out_path) => {
            let mut out_file = File::create(Path::new(out_path))
                .with_context(|| format!("failed to open output file `{out_path}`"))?;
            out_file.write_all(bytes).context("failed to write output file")?;
        }
        None if hex_on_stdout => {
            let mut stdout = std::io::stdout();
            for (i, chunk) in bytes.chunks(4).enumerate() {
                let mut word = [0u8; 4];
                word[..chunk.len()].copy_from_slice(chunk);
                let sep = if i % 8 == 7 { "\n" } else { " " };
                write!(stdout, "{:08x}{sep}", u32::from_le_bytes(word))?;
            }
            writeln!(stdout)?;
        }
        None => {
            std::io::stdout().write_all(bytes)?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.list {
        for name in samples::SAMPLE_NAMES {
            println!("{name}");
        }
        return Ok(());
    }

    let sample_name = args.sample.as_deref().unwrap_or("texture");
    let Some(raw) = samples::build(sample_name) else {
        bail!("unknown sample `{sample_name}`; try --list");
    };

    log::info!("compiling sample `{sample_name}`");
    let compiler = Compiler::new();
    let sanitized = compiler
        .sanitize(raw)
        .with_context(|| format!("sanitizing `{sample_name}` failed"))?;

    if args.reflect {
        let summary = ReflectionSummary {
            module: sanitized.name.clone(),
            bindings: sanitized
                .externals
                .blocks
                .iter()
                .flat_map(|block| {
                    block.bindings.iter().map(move |binding| BindingSummary {
                        name: binding.name.clone(),
                        ty: binding.ty.to_string(),
                        set: block.set,
                        binding: binding.binding,
                    })
                })
                .collect(),
            entry_points: sanitized
                .functions
                .entry_points()
                .map(|(_, decl)| EntryPointSummary {
                    name: decl.name.clone(),
                    stage: decl
                        .entry_point
                        .as_ref()
                        .and_then(|e| e.stage)
                        .map(|stage| format!("{stage:?}"))
                        .unwrap_or_else(|| "unknown".to_owned()),
                })
                .collect(),
        };
        let json = serde_json::to_string_pretty(&summary)?;
        return write_output(args.out_path.as_deref(), json.as_bytes(), false);
    }

    match args.target {
        Target::Spirv => {
            let env = parse_spv_version(&args.spv_version)?;
            let words = compiler.emit_spirv(&sanitized, &env).context("SPIR-V emission failed")?;
            write_output(args.out_path.as_deref(), &slc::spirv_to_bytes(&words), true)
        }
        Target::Glsl => {
            let env = parse_glsl_version(&args.glsl_version)?;
            let output = compiler.emit_glsl(&sanitized, &env).context("GLSL emission failed")?;
            write_output(args.out_path.as_deref(), output.code.as_bytes(), false)
        }
        Target::Sl => {
            let text = compiler.emit_sl(&sanitized);
            write_output(args.out_path.as_deref(), text.as_bytes(), false)
        }
    }
}
