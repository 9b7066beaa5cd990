//! # leg_synth
//!
//! Play a melody with your left leg and chords with your right.  Each ankle's
//! direction from the calibrated centre picks a scale degree; how far it
//! reaches sets the expression level.
//!
//! ## Modes
//!
//! * (default) **Simulation**: a window stands in for the camera.  Drag the
//!   ankles with the mouse.
//! * `--replay <file>` **Replay**: a recorded landmark session is played
//!   headless at its recorded pace.
//!
//! ### Simulation controls
//!
//! | Input | Action |
//! |---|---|
//! | `C` | Calibrate (stand centred for one second) |
//! | `R` | Next root note |
//! | `S` | Next scale |
//! | `P` | Next sound preset |
//! | `H` | Hide / show the performer |
//! | `Q` / `Esc` | Quit |
//! | Left mouse drag | Move the left ankle (melody) |
//! | Right mouse drag | Move the right ankle (harmony) |

pub mod app;
pub mod config;
pub mod input;
pub mod player;
pub mod visualizer;
