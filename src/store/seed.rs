//! Seed dataset loaded on first start, on version mismatch and on force-reset.

use std::collections::VecDeque;

use chrono::Utc;

use super::model::{Artist, GlobalState, VoteOption, STATE_VERSION};

/// Build the event's initial line-up with zeroed counters
pub fn seed_artists() -> Vec<Artist> {
    vec![
        Artist::new(
            "1",
            "KINESI",
            "01h00 - 02h20",
            [
                VoteOption::new("Que Calor !", "Latino - Rave - Hard Bounce"),
                VoteOption::new("Hell Raver", "Metal - Hard Techno - Indus"),
            ],
        ),
        Artist::new(
            "2",
            "AZKAËL",
            "02h20 - 03h40",
            [
                VoteOption::new("Mystical Tekno", "melodic tekno - acidcore - tribecore"),
                VoteOption::new("Rave Tekno", "rave - tekno - hybrid tekno"),
            ],
        ),
        Artist::new(
            "3",
            "HANNIBASS",
            "03h40 - 04h40",
            [
                VoteOption::new("Versatile", "tekno - hard music - bass music"),
                VoteOption::new("Overdrive", "tekno, rawstyle, uptempo"),
            ],
        ),
        Artist::new(
            "4",
            "SKEPTX",
            "04h40 - 06h00",
            [
                VoteOption::new("Rapture", "Tekno to DnB"),
                VoteOption::new("Assault", "Tekno to Hardcore"),
            ],
        ),
    ]
}

/// Fresh state built from the seed dataset
pub fn seed_state() -> GlobalState {
    GlobalState {
        version: STATE_VERSION,
        artists: seed_artists(),
        vote_history: VecDeque::new(),
        global_voting_enabled: true,
        last_update: Utc::now().timestamp_millis(),
    }
}
