//! Augmented Go command-line front end.
//!
//! ## Usage
//!
//! - `augmented-go scan IMAGE --corners x0,y0,x1,y1,x2,y2,x3,y3` - Detect the stones in one photo
//! - `augmented-go replay --size 9 --corners ... IMAGE...` - Reconcile a sequence of photos
//! - `augmented-go demo` - Run a scripted capture sequence without a camera

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use augmented_go::board::{BoardCoordinate, Color, StoneConfiguration};
use augmented_go::constants::{DEFAULT_KOMI, MAX_BOARD_SIZE, MIN_BOARD_SIZE};
use augmented_go::game::Game;
use augmented_go::logger;
use augmented_go::session::{ScanCycle, Session};
use augmented_go::vision::{self, BoardContour, ScanParams};

/// Keeps a digital Go record in sync with a physical board seen by a camera
#[derive(Parser)]
#[command(name = "augmented-go")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log debug output (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect the board and stones in a single image
    Scan {
        image: PathBuf,
        /// Board corners: top-left, top-right, bottom-right, bottom-left
        #[arg(long, value_parser = parse_contour)]
        corners: BoardContour,
        /// JSON file with scan parameters
        #[arg(long)]
        params: Option<PathBuf>,
        /// Write the annotated rectified image here
        #[arg(long)]
        debug_out: Option<PathBuf>,
    },
    /// Reconcile a sequence of images as successive scans of one game
    Replay {
        #[arg(long, default_value_t = 19)]
        size: usize,
        #[arg(long, value_parser = parse_contour)]
        corners: BoardContour,
        #[arg(long)]
        params: Option<PathBuf>,
        #[arg(long, default_value_t = DEFAULT_KOMI)]
        komi: f32,
        /// Save the game record as SGF
        #[arg(long)]
        sgf: Option<PathBuf>,
        /// Score the final position after the last image
        #[arg(long)]
        finish: bool,
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },
    /// Run a scripted game with a capture, without a camera
    Demo,
}

fn parse_contour(s: &str) -> std::result::Result<BoardContour, String> {
    let values = s
        .split(',')
        .map(|v| v.trim().parse::<f32>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid coordinate: {e}"))?;
    let [x0, y0, x1, y1, x2, y2, x3, y3] = values[..] else {
        return Err(format!("expected 8 comma-separated values, got {}", values.len()));
    };
    BoardContour::new([(x0, y0), (x1, y1), (x2, y2), (x3, y3)]).map_err(|e| e.to_string())
}

fn load_params(path: Option<&Path>) -> Result<ScanParams> {
    match path {
        Some(p) => ScanParams::load_json(p).with_context(|| format!("reading {}", p.display())),
        None => Ok(ScanParams::default()),
    }
}

fn load_frame(path: &Path) -> Result<image::RgbImage> {
    Ok(image::open(path)
        .with_context(|| format!("opening {}", path.display()))?
        .to_rgb8())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::init(cli.verbose);

    match cli.command {
        Some(Commands::Scan {
            image,
            corners,
            params,
            debug_out,
        }) => run_scan(&image, &corners, params.as_deref(), debug_out.as_deref()),
        Some(Commands::Replay {
            size,
            corners,
            params,
            komi,
            sgf,
            finish,
            images,
        }) => {
            if !(MIN_BOARD_SIZE..=MAX_BOARD_SIZE).contains(&size) {
                bail!("board size must be between {MIN_BOARD_SIZE} and {MAX_BOARD_SIZE}");
            }
            let session = Session::with_params(Game::with_komi(size, komi), load_params(params.as_deref())?);
            session.set_contour(corners);
            run_replay(&session, &images, sgf.as_deref(), finish)
        }
        Some(Commands::Demo) | None => {
            run_demo();
            Ok(())
        }
    }
}

fn run_scan(image: &Path, contour: &BoardContour, params: Option<&Path>, debug_out: Option<&Path>) -> Result<()> {
    let params = load_params(params)?;
    let frame = load_frame(image)?;
    let output = vision::scan(&frame, Some(contour), &params).with_context(|| format!("scanning {}", image.display()))?;

    println!("{0}x{0} board", output.configuration.size());
    print!("{}", output.configuration);
    if let Some(path) = debug_out {
        output
            .debug_image
            .save(path)
            .with_context(|| format!("writing {}", path.display()))?;
    }
    Ok(())
}

fn run_replay(session: &Session, images: &[PathBuf], sgf: Option<&Path>, finish: bool) -> Result<()> {
    for path in images {
        let frame = load_frame(path)?;
        match session.run_cycle(&frame) {
            ScanCycle::Reconciled { result, board, .. } => {
                println!("{}: {result:?}", path.display());
                print!("{board}");
            }
            ScanCycle::NoGrid(e) => println!("{}: skipped ({e})", path.display()),
            ScanCycle::NotReady => bail!("no board contour"),
        }
    }

    if finish {
        println!("Result: {}", session.finish());
    }
    if let Some(path) = sgf {
        if !session.save(path, "", "", "") {
            bail!("could not write {}", path.display());
        }
        println!("Saved {}", path.display());
    }
    Ok(())
}

fn run_demo() {
    println!("Augmented Go: scripted capture on a 9x9 board\n");

    let c = BoardCoordinate::new;
    let mut game = Game::new(9);
    let mut seen = StoneConfiguration::empty(9);

    let show = |game: &mut Game, seen: &StoneConfiguration, what: &str| {
        let result = game.reconcile(seen);
        println!("{what}: {result:?} ({:?})", game.phase());
    };

    // White stone at E4 gets surrounded and captured by Black at E5.
    let script = [
        (c(4, 4), Color::Black, "Black D4"),
        (c(5, 4), Color::White, "White E4"),
        (c(6, 4), Color::Black, "Black F4"),
        (c(1, 1), Color::White, "White A1"),
        (c(5, 3), Color::Black, "Black E3"),
        (c(9, 9), Color::White, "White J9"),
        (c(5, 5), Color::Black, "Black E5 (captures, stone still on the board)"),
    ];
    for (coord, color, what) in script {
        seen = seen.with_stone(coord, color);
        show(&mut game, &seen, what);
    }

    seen = seen.without_stone(c(5, 4));
    show(&mut game, &seen, "E4 lifted off");

    println!("\n{}", game.board());
    println!("Result: {}", game.finish());
}
