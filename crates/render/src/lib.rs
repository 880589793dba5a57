//! Rendering Adapter: renderer-agnostic interface over an agent generation.
//!
//! # Invariants
//! - Renderers only read the generation they are handed; they never mutate it.
//! - What is drawn derives from the exposed generation and the frame info alone.
//!
//! The text renderer serves headless runs; the windowed host implements the
//! same trait with an instanced-triangle pipeline in `pps-gpu`.

mod renderer;

pub use renderer::{AgentRenderer, FrameInfo, TextRenderer};

pub fn crate_info() -> &'static str {
    "pps-render v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("render"));
    }
}
