//! Model listing and per-conversation council configuration

use std::error::Error;

use crate::api::{CouncilClient, ModelConfig};

/// Apply command-line overrides to a conversation's model configuration.
/// Returns `None` when nothing was asked to change.
pub fn apply_overrides(
    current: &ModelConfig,
    council: Vec<String>,
    chairman: Option<String>,
) -> Option<ModelConfig> {
    let council: Vec<String> = council
        .into_iter()
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .collect();
    let chairman = chairman
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty());
    if council.is_empty() && chairman.is_none() {
        return None;
    }

    let mut updated = current.clone();
    if !council.is_empty() {
        updated.council_models = council;
    }
    if let Some(chairman) = chairman {
        updated.chairman_model = chairman;
    }
    Some(updated)
}

pub fn config_lines(config: &ModelConfig) -> Vec<String> {
    let mut lines = vec!["Council:".to_string()];
    if config.council_models.is_empty() {
        lines.push("  (backend default)".to_string());
    } else {
        lines.extend(config.council_models.iter().map(|m| format!("  • {m}")));
    }
    let chairman = if config.chairman_model.is_empty() {
        "(backend default)"
    } else {
        config.chairman_model.as_str()
    };
    lines.push(format!("Chairman: {chairman}"));
    lines
}

pub async fn list_models(client: &CouncilClient) -> Result<(), Box<dyn Error>> {
    let models = client.list_models().await?;

    println!("🤖 Available Models on {}", client.base_url());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    if models.is_empty() {
        println!("No models reported by the backend.");
    } else {
        println!("Found {} models:", models.len());
        println!();
        for model in models {
            println!("  • {model}");
        }
    }
    Ok(())
}

pub async fn conversation_models(
    client: &CouncilClient,
    conversation_id: &str,
    council: Vec<String>,
    chairman: Option<String>,
) -> Result<(), Box<dyn Error>> {
    let current = client.get_conversation_models(conversation_id).await?;
    let config = match apply_overrides(&current, council, chairman) {
        Some(updated) => {
            client
                .update_conversation_models(conversation_id, &updated)
                .await?;
            println!("✅ Updated models for conversation {conversation_id}");
            updated
        }
        None => current,
    };
    for line in config_lines(&config) {
        println!("{line}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn current() -> ModelConfig {
        ModelConfig {
            council_models: vec!["a/one".into(), "b/two".into()],
            chairman_model: "c/chair".into(),
        }
    }

    #[test]
    fn no_overrides_means_no_update() {
        assert_eq!(apply_overrides(&current(), Vec::new(), None), None);
        assert_eq!(
            apply_overrides(&current(), vec![" ".into()], Some("".into())),
            None
        );
    }

    #[test]
    fn chairman_only_keeps_council() {
        let updated = apply_overrides(&current(), Vec::new(), Some("d/new".into())).unwrap();
        assert_eq!(updated.council_models, current().council_models);
        assert_eq!(updated.chairman_model, "d/new");
    }

    #[test]
    fn council_replaces_the_whole_list() {
        let updated = apply_overrides(&current(), vec!["x/solo".into()], None).unwrap();
        assert_eq!(updated.council_models, ["x/solo"]);
        assert_eq!(updated.chairman_model, "c/chair");
    }

    #[test]
    fn empty_config_shows_backend_defaults() {
        let lines = config_lines(&ModelConfig {
            council_models: Vec::new(),
            chairman_model: String::new(),
        });
        assert_eq!(
            lines,
            ["Council:", "  (backend default)", "Chairman: (backend default)"]
        );
    }
}
