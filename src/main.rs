use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use log::{LevelFilter, info};

use permit_story::{
    config::StoryConfig,
    data::{Dataset, narrative::NarrativeStore},
    player::Player,
    renderer::{Renderer, Snapshot},
    story::{SceneContext, Scroller, Step, StepController, story_sections},
    types::{TerminalContract, Viewport},
};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

const PLAY_USAGE: &str =
    "permit-story play <permits.csv> <demolitions.csv> [--config c.json] [--narrative n.json] [--log f]";
const RENDER_USAGE: &str = "permit-story render <permits.csv> <demolitions.csv> <out.json> [--width W --height H] [--config c.json]";
const CHECK_USAGE: &str = "permit-story check <permits.csv> <demolitions.csv> [--config c.json]";

/// Upper bound on scheduled work drained per step when rendering headlessly.
const HEADLESS_POLLS: usize = 200_000;

/// Positional arguments plus `--flag value` options, in any order.
struct Args {
    positional: Vec<String>,
    config: Option<PathBuf>,
    narrative: Option<PathBuf>,
    log: Option<PathBuf>,
    width: u16,
    height: u16,
}

impl Args {
    fn parse(mut raw: impl Iterator<Item = String>) -> Result<Args> {
        let mut args = Args {
            positional: Vec::new(),
            config: None,
            narrative: None,
            log: None,
            width: 100,
            height: 40,
        };
        while let Some(arg) = raw.next() {
            let mut value = |flag: &str| raw.next().with_context(|| format!("{flag} needs a value"));
            match arg.as_str() {
                "--config" => args.config = Some(value("--config")?.into()),
                "--narrative" => args.narrative = Some(value("--narrative")?.into()),
                "--log" => args.log = Some(value("--log")?.into()),
                "--width" => {
                    let v = value("--width")?;
                    args.width = v.parse().with_context(|| format!("bad --width {v:?}"))?;
                }
                "--height" => {
                    let v = value("--height")?;
                    args.height = v.parse().with_context(|| format!("bad --height {v:?}"))?;
                }
                flag if flag.starts_with("--") => bail!("unknown option {flag}"),
                other => args.positional.push(other.to_string()),
            }
        }
        Ok(args)
    }

    fn path(&self, index: usize, usage: &str) -> Result<&Path> {
        self.positional
            .get(index)
            .map(Path::new)
            .with_context(|| format!("Usage: {usage}"))
    }
}

fn run() -> Result<()> {
    let mut raw = std::env::args().skip(1);
    let command = raw.next();
    let args = Args::parse(raw)?;

    match command.as_deref() {
        Some("play") => play(&args),
        Some("render") => {
            init_logging(None, LevelFilter::Warn)?;
            render(&args)
        }
        Some("check") => {
            init_logging(None, LevelFilter::Info)?;
            check(&args)
        }
        _ => bail!(
            "Permit story: building permits and demolitions, told in the terminal\n\nUsage:\n  {PLAY_USAGE}\n  {RENDER_USAGE}\n  {CHECK_USAGE}"
        ),
    }
}

/// `RUST_LOG` overrides `default`. With `file` set, output goes there.
fn init_logging(file: Option<&Path>, default: LevelFilter) -> Result<()> {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(default).parse_default_env();
    if let Some(path) = file {
        let file =
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}

fn load(args: &Args, usage: &str) -> Result<(StoryConfig, Dataset)> {
    let config = StoryConfig::load(args.config.as_deref());
    let permits = args.path(0, usage)?;
    let demolitions = args.path(1, usage)?;
    let dataset = Dataset::load(permits, demolitions, &config)
        .with_context(|| format!("Failed to load {}", demolitions.display()))?;
    Ok((config, dataset))
}

fn narrative(args: &Args) -> Result<NarrativeStore> {
    match &args.narrative {
        Some(path) => NarrativeStore::from_json_file(path)
            .with_context(|| format!("Failed to load narrative {}", path.display())),
        None => Ok(NarrativeStore::builtin()),
    }
}

fn play(args: &Args) -> Result<()> {
    // The player owns the terminal, so logs go to a file or nowhere.
    match &args.log {
        Some(path) => init_logging(Some(path), LevelFilter::Warn)?,
        None => init_logging(None, LevelFilter::Error)?,
    }
    let (config, dataset) = load(args, PLAY_USAGE)?;
    let narrative = narrative(args)?;

    let (width, height) = crossterm::terminal::size().context("Failed to read terminal size")?;
    let viewport = Player::chart_viewport(width, height, config.layout.narrative_cols);
    let scene = SceneContext::new(dataset, narrative, config, viewport, Duration::ZERO);
    let scroller = Scroller::new(story_sections(), 0, 0);

    let mut player = Player::new(scene, scroller, width, height);
    player.play()
}

/// Replay the story headlessly and write one frame per step.
fn render(args: &Args) -> Result<()> {
    let (config, dataset) = load(args, RENDER_USAGE)?;
    let out_path = args.path(2, RENDER_USAGE)?;
    let narrative = narrative(args)?;

    let viewport = Viewport {
        cols: args.width,
        rows: args.height,
    };
    let contract = TerminalContract {
        width: args.width,
        height: args.height,
    };
    let mut now = Duration::ZERO;
    let mut scene = SceneContext::new(dataset, narrative, config, viewport, now);
    let mut controller = StepController::new();
    let mut snapshots = Vec::with_capacity(Step::ALL.len());

    for step in Step::ALL {
        controller.go_to(&mut scene, step.index(), now)?;
        now = drain(&mut scene, now);
        snapshots.push(Snapshot {
            label: step.name().to_string(),
            cells: Renderer::rasterize(scene.surface(), &contract),
        });
        info!("rendered {}", step.name());
    }
    if controller.failures() > 0 {
        bail!("{} step(s) failed while rendering", controller.failures());
    }

    let presentation = Renderer::render(&snapshots, contract);
    let json = serde_json::to_string_pretty(&presentation)?;
    fs::write(out_path, &json).with_context(|| format!("Failed to write {}", out_path.display()))?;

    eprintln!(
        "Rendered {} frames -> {}",
        presentation.frames.len(),
        out_path.display(),
    );
    Ok(())
}

/// Finish everything the current step started, returning the time reached.
fn drain(scene: &mut SceneContext, mut now: Duration) -> Duration {
    scene.settle(now);
    scene.run_simulation_to_rest();
    for _ in 0..HEADLESS_POLLS {
        let Some(deadline) = scene.next_deadline() else {
            break;
        };
        now = now.max(deadline);
        scene.advance(now);
    }
    now
}

fn check(args: &Args) -> Result<()> {
    let (_, dataset) = load(args, CHECK_USAGE)?;
    let years: Vec<String> = dataset.permits.iter().map(|p| p.year.to_string()).collect();
    let on_map = dataset.demolitions.iter().filter(|d| d.show_on_map).count();
    let granted = dataset.demolitions.iter().filter(|d| d.simulate_grant).count();
    let tiles = dataset.demolitions.iter().filter(|d| d.tile_node).count();
    let homeless: u64 = dataset
        .demolitions
        .iter()
        .map(|d| u64::from(d.people_homeless))
        .sum();

    println!("permit years:    {} ({})", dataset.permits.len(), years.join(", "));
    println!("permits granted: {}", dataset.total_permits());
    println!("demolitions:     {}", dataset.demolitions.len());
    println!("  on the map:    {on_map} over {} dates", dataset.demolition_dates.len());
    println!("  granted:       {granted}");
    println!("  tiles:         {tiles}");
    println!("people homeless: {homeless}");
    Ok(())
}
