//! Parse a turn's thinking text into ordered OODA reasoning steps.

use automaton_core::{OodaPhase, ReasoningStep, new_id};

/// Split thinking into steps. Paragraphs carrying an explicit phase
/// marker (`observe:`, `orient:`, `decide:`, `act:`) take that phase;
/// unmarked paragraphs walk the cycle in order, with everything past
/// the third falling to `act`.
pub fn parse_reasoning(turn_id: &str, thinking: &str) -> Vec<ReasoningStep> {
    let phases = [
        OodaPhase::Observe,
        OodaPhase::Orient,
        OodaPhase::Decide,
        OodaPhase::Act,
    ];

    thinking
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .enumerate()
        .map(|(i, paragraph)| {
            let (phase, content) = match explicit_phase(paragraph) {
                Some((phase, rest)) => (phase, rest),
                None => (phases[i.min(3)], paragraph),
            };
            ReasoningStep {
                id: new_id(),
                turn_id: turn_id.to_string(),
                step_number: i as u32,
                phase,
                content: content.to_string(),
            }
        })
        .collect()
}

fn explicit_phase(paragraph: &str) -> Option<(OodaPhase, &str)> {
    let lower = paragraph.to_lowercase();
    for (marker, phase) in [
        ("observe:", OodaPhase::Observe),
        ("orient:", OodaPhase::Orient),
        ("decide:", OodaPhase::Decide),
        ("act:", OodaPhase::Act),
    ] {
        if lower.starts_with(marker) {
            return Some((phase, paragraph[marker.len()..].trim_start()));
        }
    }
    None
}
