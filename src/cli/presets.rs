//! Council presets: named model line-ups kept by the backend

use std::error::Error;

use crate::api::{is_custom_preset_id, CouncilClient, ModelConfig, Preset, SavePresetRequest};

pub fn preset_lines(id: &str, preset: &Preset) -> Vec<String> {
    let marker = if preset.is_custom { " (custom)" } else { "" };
    let mut lines = vec![format!("  • {id}: {}{marker}", preset.name)];
    if !preset.description.trim().is_empty() {
        lines.push(format!("    {}", preset.description.trim()));
    }
    lines.push(format!("    Council: {}", preset.council_models.join(", ")));
    lines.push(format!("    Chairman: {}", preset.chairman_model));
    lines
}

/// Build a save request, rejecting an incomplete line-up before it reaches
/// the backend.
pub fn save_request(
    name: String,
    description: Option<String>,
    council: Vec<String>,
    chairman: String,
) -> Result<SavePresetRequest, String> {
    let name = name.trim().to_string();
    if name.is_empty() {
        return Err("Preset name cannot be empty".to_string());
    }
    let council_models: Vec<String> = council
        .into_iter()
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .collect();
    if council_models.is_empty() {
        return Err("Specify at least one --council model".to_string());
    }
    let chairman_model = chairman.trim().to_string();
    if chairman_model.is_empty() {
        return Err("Specify a --chairman model".to_string());
    }
    Ok(SavePresetRequest {
        name,
        description: description.unwrap_or_default().trim().to_string(),
        council_models,
        chairman_model,
    })
}

pub async fn list_presets(client: &CouncilClient) -> Result<(), Box<dyn Error>> {
    let presets = client.get_presets().await?.presets;
    println!("🎛  Presets on {}", client.base_url());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    if presets.is_empty() {
        println!("No presets available.");
    }
    for (id, preset) in &presets {
        for line in preset_lines(id, preset) {
            println!("{line}");
        }
    }
    Ok(())
}

pub async fn save_preset(
    client: &CouncilClient,
    name: String,
    description: Option<String>,
    council: Vec<String>,
    chairman: String,
) -> Result<(), Box<dyn Error>> {
    let request = save_request(name, description, council, chairman)?;
    let id = client.save_preset(&request).await?;
    println!("✅ Saved preset '{}' as {id}", request.name);
    Ok(())
}

pub async fn delete_preset(client: &CouncilClient, id: &str) -> Result<(), Box<dyn Error>> {
    if !is_custom_preset_id(id) {
        return Err(format!("Only custom presets can be deleted ('{id}' is built in)").into());
    }
    client.delete_preset(id).await?;
    println!("✅ Deleted preset {id}");
    Ok(())
}

pub async fn apply_preset(
    client: &CouncilClient,
    preset_id: &str,
    conversation_id: &str,
) -> Result<(), Box<dyn Error>> {
    let presets = client.get_presets().await?.presets;
    let preset = presets
        .get(preset_id)
        .ok_or_else(|| format!("Unknown preset: {preset_id}"))?;
    let config = ModelConfig {
        council_models: preset.council_models.clone(),
        chairman_model: preset.chairman_model.clone(),
    };
    client
        .update_conversation_models(conversation_id, &config)
        .await?;
    println!(
        "✅ Applied preset '{}' to conversation {conversation_id}",
        preset.name
    );
    Ok(())
}
