//! The agent card this agent serves to the world.

use automaton_core::{AutomatonConfig, Identity};

/// Build the public agent card. The card never leaks the sandbox id,
/// the internal API base, or the creator address.
pub fn build_agent_card(config: &AutomatonConfig, identity: &Identity) -> serde_json::Value {
    let description = if config.genesis_prompt.is_empty() {
        "an autonomous agent".to_string()
    } else {
        let mut d = config.genesis_prompt.clone();
        if d.len() > 140 {
            let mut cut = 140;
            while !d.is_char_boundary(cut) {
                cut -= 1;
            }
            d.truncate(cut);
        }
        d
    };

    serde_json::json!({
        "type": "agent-card",
        "name": config.name,
        "address": identity.address,
        "description": description,
        "services": [
            {"name": "messages", "endpoint": config.social_relay_url}
        ],
        "x402Support": true,
        "active": true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> Identity {
        Identity {
            address: "0x1111111111111111111111111111111111111111".into(),
            creator_address: "0x2222222222222222222222222222222222222222".into(),
            wallet_private_key: "secret".into(),
            sandbox_id: "sbx-self".into(),
            created_at: automaton_core::id::now_iso(),
        }
    }

    #[test]
    fn card_has_the_public_shape() {
        let config = AutomatonConfig {
            name: "probe".into(),
            genesis_prompt: "index the web".into(),
            ..Default::default()
        };
        let card = build_agent_card(&config, &identity());
        assert_eq!(card["type"], "agent-card");
        assert_eq!(card["name"], "probe");
        assert_eq!(card["x402Support"], true);
        assert_eq!(card["services"][0]["name"], "messages");
    }

    #[test]
    fn card_leaks_nothing_internal() {
        let config = AutomatonConfig::default();
        let id = identity();
        let serialized = build_agent_card(&config, &id).to_string();
        assert!(!serialized.contains(&id.sandbox_id));
        assert!(!serialized.contains(&id.creator_address));
        assert!(!serialized.contains("secret"));
    }

    #[test]
    fn long_genesis_is_clipped() {
        let config = AutomatonConfig {
            genesis_prompt: "g".repeat(500),
            ..Default::default()
        };
        let card = build_agent_card(&config, &identity());
        assert!(card["description"].as_str().unwrap().len() <= 140);
    }
}
