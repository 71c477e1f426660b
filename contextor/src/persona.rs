//! Persona resolution: who the bot impersonates.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::info;

use crate::corpus::DocumentStore;
use crate::error::BootstrapError;

pub const DEFAULT_SAMPLE_SIZE: usize = 10;

/// The impersonated speaker and the human they talk to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Persona {
    pub bot_name: String,
    pub primary: String,
}

/// Finds the single non-primary speaker among the first `sample_size` records.
///
/// # Errors
/// - [`BootstrapError::NoPersona`] if the sample holds only the primary speaker
/// - [`BootstrapError::AmbiguousPersona`] if it holds two or more others
///   (candidates listed in sorted order)
pub fn resolve_persona(
    store: &DocumentStore,
    primary: &str,
    sample_size: usize,
) -> Result<Persona, BootstrapError> {
    let candidates: BTreeSet<&str> = store
        .records()
        .iter()
        .take(sample_size)
        .map(|r| r.speaker.as_str())
        .filter(|s| *s != primary)
        .collect();

    let mut it = candidates.iter();
    match (it.next(), it.next()) {
        (Some(bot), None) => {
            info!(bot_name = %bot, primary, sample_size, "persona resolved");
            Ok(Persona {
                bot_name: (*bot).to_string(),
                primary: primary.to_string(),
            })
        }
        (None, _) => Err(BootstrapError::NoPersona {
            primary: primary.to_string(),
        }),
        _ => Err(BootstrapError::AmbiguousPersona {
            candidates: candidates.into_iter().map(str::to_string).collect(),
        }),
    }
}
