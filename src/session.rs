//! Scan context shared between the periodic scanner and the presentation layer.
//!
//! A [`Session`] owns the board contour, the scan parameters and the [`Game`]
//! behind one mutex. A scan cycle copies the contour and parameters out,
//! releases the lock for the (slow) vision pipeline, and only re-locks to
//! reconcile the result, so user commands never wait for image processing
//! and never observe a half-applied update.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use image::RgbImage;
use log::{debug, info};

use crate::board::StoneConfiguration;
use crate::game::{Game, GameError, UpdateResult};
use crate::vision::{self, BoardContour, ScanFailure, ScanParams};

/// Default pause between two scans.
pub const SCAN_INTERVAL: Duration = Duration::from_millis(1000);

/// What one scan cycle did.
#[derive(Clone, Debug)]
pub enum ScanCycle {
    /// No contour selected yet.
    NotReady,
    /// The frame did not yield a grid; the game is untouched.
    NoGrid(ScanFailure),
    Reconciled {
        result: UpdateResult,
        board: StoneConfiguration,
        debug_image: RgbImage,
    },
}

struct SessionState {
    contour: Option<BoardContour>,
    params: ScanParams,
    game: Game,
}

pub struct Session {
    state: Mutex<SessionState>,
}

impl Session {
    pub fn new(game: Game) -> Self {
        Self::with_params(game, ScanParams::default())
    }

    pub fn with_params(game: Game, params: ScanParams) -> Self {
        Self {
            state: Mutex::new(SessionState {
                contour: None,
                params,
                game,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_contour(&self, contour: BoardContour) {
        self.lock().contour = Some(contour);
    }

    pub fn clear_contour(&self) {
        self.lock().contour = None;
    }

    pub fn contour(&self) -> Option<BoardContour> {
        self.lock().contour
    }

    pub fn set_params(&self, params: ScanParams) {
        self.lock().params = params;
    }

    /// Start a new game.
    ///
    /// # Panics
    /// If the current game has stones on the board and is not finished.
    pub fn start(&self, size: usize, setup: Option<&StoneConfiguration>) -> Result<(), GameError> {
        let game = match setup {
            Some(setup) => Game::with_setup(size, setup)?,
            None => Game::new(size),
        };
        let mut state = self.lock();
        assert!(
            state.game.is_finished() || state.game.board().is_empty(),
            "resetting a game in progress is not implemented"
        );
        info!("new {size}x{size} game");
        state.game = game;
        Ok(())
    }

    /// Scan one frame and reconcile the result with the game.
    pub fn run_cycle(&self, frame: &RgbImage) -> ScanCycle {
        let (contour, params) = {
            let state = self.lock();
            (state.contour, state.params.clone())
        };

        let output = match vision::scan(frame, contour.as_ref(), &params) {
            Ok(output) => output,
            Err(ScanFailure::NoContour) => return ScanCycle::NotReady,
            Err(e) => {
                debug!("scan failed: {e}");
                return ScanCycle::NoGrid(e);
            }
        };

        let mut state = self.lock();
        let result = state.game.reconcile(&output.configuration);
        ScanCycle::Reconciled {
            result,
            board: state.game.board(),
            debug_image: output.debug_image,
        }
    }

    /// Reconcile an already scanned configuration.
    pub fn submit(&self, config: &StoneConfiguration) -> UpdateResult {
        self.lock().game.reconcile(config)
    }

    pub fn pass(&self) -> UpdateResult {
        self.lock().game.pass()
    }

    pub fn resign(&self) -> String {
        self.lock().game.resign()
    }

    pub fn finish(&self) -> String {
        self.lock().game.finish()
    }

    pub fn save(&self, path: impl AsRef<Path>, black: &str, white: &str, game_name: &str) -> bool {
        self.lock().game.save(path, black, white, game_name)
    }

    pub fn board(&self) -> StoneConfiguration {
        self.lock().game.board()
    }

    pub fn result(&self) -> String {
        self.lock().game.result().to_string()
    }

    pub fn is_finished(&self) -> bool {
        self.lock().game.is_finished()
    }

    /// Run `f` with the game locked.
    pub fn with_game<T>(&self, f: impl FnOnce(&Game) -> T) -> T {
        f(&self.lock().game)
    }
}

/// Supplies camera frames to the scanner thread.
pub trait FrameSource: Send {
    /// The next frame, or `None` when the source is exhausted.
    fn next_frame(&mut self) -> Option<RgbImage>;
}

impl<I> FrameSource for I
where
    I: Iterator<Item = RgbImage> + Send,
{
    fn next_frame(&mut self) -> Option<RgbImage> {
        self.next()
    }
}

/// Handle to a running scanner thread.
pub struct Scanner {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<usize>,
}

impl Scanner {
    /// Ask the thread to stop after the current cycle and wait for it.
    /// Returns the number of completed cycles.
    pub fn stop(self) -> usize {
        self.stop.store(true, Ordering::Relaxed);
        self.join()
    }

    /// Wait until the frame source is exhausted.
    pub fn join(self) -> usize {
        self.handle.join().unwrap_or(0)
    }
}

/// Scan frames from `source` every `interval` until stopped or the source runs dry.
pub fn spawn_scanner<S>(session: Arc<Session>, mut source: S, interval: Duration) -> Scanner
where
    S: FrameSource + 'static,
{
    let stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop);
    let handle = thread::spawn(move || {
        let mut cycles = 0;
        while !flag.load(Ordering::Relaxed) {
            let Some(frame) = source.next_frame() else {
                break;
            };
            if let ScanCycle::Reconciled { result, .. } = session.run_cycle(&frame) {
                debug!("scan cycle {cycles}: {result:?}");
            }
            cycles += 1;
            if !interval.is_zero() {
                thread::sleep(interval);
            }
        }
        cycles
    });
    Scanner { stop, handle }
}
