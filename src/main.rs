//! # Box Swarm Entry Point
//!
//! Opens a window, starts the simulation thread and renders the boxes until
//! the window is closed. The actual application logic is implemented in the
//! `app` module.

fn main() {
    if let Err(e) = box_swarm::app::run() {
        log::error!("{}", e);
        eprintln!("box_swarm: {}", e);
        std::process::exit(1);
    }
}
