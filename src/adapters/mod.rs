use anyhow::Result;
use std::sync::Arc;

use crate::core::models::Item;
use crate::core::sources::Sources;

pub mod simulated;
pub mod youtube;

pub use simulated::{RecordingNotifier, SimulatedSource};
pub use youtube::YoutubeClient;

pub fn get_sources(simulation: bool) -> Result<Sources> {
    if simulation {
        let source = SimulatedSource::new();
        let controller = source.clone();

        std::thread::spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lines().map_while(Result::ok) {
                let parts: Vec<&str> = line.split_whitespace().collect();
                match parts.as_slice() {
                    ["upload", channel, id, title @ ..] => {
                        controller.upload(channel, Item::new(title.join(" "), *id, ""));
                    }
                    ["down", channel] => controller.set_unreachable(channel, true),
                    ["up", channel] => controller.set_unreachable(channel, false),
                    _ => println!(
                        "(Simulator) Use: 'upload <channel> <video-id> [title]', 'down <channel>' or 'up <channel>'"
                    ),
                }
            }
        });

        return Ok(Sources::from_single(Arc::new(source)));
    }

    Ok(Sources::from_single(Arc::new(YoutubeClient::new()?)))
}
