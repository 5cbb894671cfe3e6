use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use clap::Parser;
use image::RgbaImage;
use ps20::{render, Backend, Program, RgbaTexture, RowClamp, Sampler, ShaderData, Texture};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "ps20",
    about = "Run a compiled ps_2_0 pixel shader over a PNG image on the CPU."
)]
struct Args {
    /// Compiled shader bytecode
    shader: PathBuf,

    /// Input PNG, bound to sampler s0
    #[arg(required_unless_present = "dump")]
    input: Option<PathBuf>,

    /// Output PNG, same size as the input
    #[arg(required_unless_present = "dump")]
    output: Option<PathBuf>,

    /// Print the disassembly and exit
    #[arg(short, long, action = clap::ArgAction::SetTrue)]
    dump: bool,

    /// Use the interpreter instead of the compiled kernel
    #[arg(short, long, action = clap::ArgAction::SetTrue)]
    interpreter: bool,

    /// Log every instruction and sample (very verbose)
    #[arg(short, long, action = clap::ArgAction::SetTrue)]
    trace: bool,

    /// Set constant register c<IDX> to VALUE in all four lanes
    #[arg(short = 'c', value_name = "IDX=VALUE", value_parser = parse_scalar)]
    constant: Vec<(u32, f32)>,

    /// Set constant register c<IDX> to (X, Y, 0, 0)
    #[arg(short = 'p', value_name = "IDX=X,Y", value_parser = parse_pair)]
    pair: Vec<(u32, (f32, f32))>,

    /// Clamp sampled rows against the texture width instead of its height
    #[arg(long, action = clap::ArgAction::SetTrue)]
    legacy_row_clamp: bool,
}

fn split_assignment(s: &str) -> Result<(u32, &str), String> {
    let (index, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected IDX=VALUE, got {s:?}"))?;
    let index = index
        .trim()
        .parse()
        .map_err(|e| format!("invalid register index {index:?}: {e}"))?;
    Ok((index, value))
}

fn parse_float(s: &str) -> Result<f32, String> {
    s.trim()
        .parse()
        .map_err(|e| format!("invalid number {s:?}: {e}"))
}

fn parse_scalar(s: &str) -> Result<(u32, f32), String> {
    let (index, value) = split_assignment(s)?;
    Ok((index, parse_float(value)?))
}

fn parse_pair(s: &str) -> Result<(u32, (f32, f32)), String> {
    let (index, value) = split_assignment(s)?;
    let (x, y) = value
        .split_once(',')
        .ok_or_else(|| format!("expected IDX=X,Y, got {s:?}"))?;
    Ok((index, (parse_float(x)?, parse_float(y)?)))
}

fn init_logging(trace: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if trace { "trace" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.trace);
    run(args)
}

fn run(args: Args) -> anyhow::Result<()> {
    let bytes =
        fs::read(&args.shader).with_context(|| format!("read {}", args.shader.display()))?;
    let program = Program::decode(&bytes)
        .with_context(|| format!("decode {}", args.shader.display()))?;

    if args.dump {
        print!("{}", program.disassemble());
        return Ok(());
    }

    let (Some(input), Some(output)) = (&args.input, &args.output) else {
        return Err(anyhow!("INPUT and OUTPUT are required unless --dump is given"));
    };

    let input = load_png(input)?;
    let (width, height) = (input.width(), input.height());
    let row_clamp = if args.legacy_row_clamp {
        RowClamp::LegacyWidth
    } else {
        RowClamp::Height
    };

    let mut data = ShaderData::new();
    for &(index, value) in &args.constant {
        data.set_constant(index, value);
    }
    for &(index, value) in &args.pair {
        data.set_constant(index, value);
    }
    data.set_sampler(0, Sampler::new(input).with_row_clamp(row_clamp))?;
    data.set_output_texture(0, RgbaTexture::new(width, height))?;

    let backend = if args.interpreter {
        Backend::Interpreter
    } else {
        Backend::Compiler
    };
    render(&program, &mut data, backend)
        .with_context(|| format!("render {} with the {backend}", args.shader.display()))?;

    let texture = data.take_output_texture(0)?;
    let mut image = RgbaImage::new(texture.width(), texture.height());
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        pixel.0 = texture.read(x, y).to_le_bytes();
    }
    image
        .save(output)
        .with_context(|| format!("write {}", output.display()))?;
    info!(width, height, output = %output.display(), "wrote image");
    Ok(())
}

fn load_png(path: &Path) -> anyhow::Result<RgbaTexture> {
    let image = image::open(path)
        .with_context(|| format!("load {}", path.display()))?
        .into_rgba8();
    let (width, height) = image.dimensions();
    let texels = image
        .pixels()
        .map(|pixel| u32::from_le_bytes(pixel.0))
        .collect();
    RgbaTexture::from_texels(width, height, texels)
        .ok_or_else(|| anyhow!("{} has an unexpected pixel count", path.display()))
}
