//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the appropriate commands.

pub mod ask;
pub mod conversations;
pub mod models;
pub mod presets;
pub mod settings;

use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::debug;

use crate::api::CouncilClient;
use crate::core::config::Config;
use crate::logging::{init_file_logging, init_stderr_logging};
use crate::ui::chat_loop::run_chat;

#[derive(Parser)]
#[command(name = "council")]
#[command(version)]
#[command(about = "A terminal client for LLM council backends")]
#[command(
    long_about = "Council is a full-screen terminal client for an LLM council: several models \
answer your question, rank each other's answers anonymously, and a chairman model \
synthesizes the final answer. Each stage is shown as soon as the backend streams it.\n\n\
Environment Variables:\n\
  COUNCIL_BASE_URL  Backend URL (overrides the config file, defaults to http://localhost:8001)\n\
  COUNCIL_LOG       Log filter, e.g. 'debug' or 'council=trace' (defaults to 'warn')\n\n\
Controls:\n\
  Enter             Send the message\n\
  Up/Down/PgUp/PgDn Scroll the transcript\n\
  Home/End          Scroll to the top or bottom\n\
  Tab/Shift+Tab     Jump to the next or previous section\n\
  [ and ]           Cycle individual responses (with an empty input)\n\
  Ctrl+R            Retry the last prompt\n\
  Ctrl+T            Toggle dark/light theme\n\
  Ctrl+B            Toggle the rubber-band effect\n\
  Ctrl+C / Esc      Quit"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Council backend URL for this invocation
    #[arg(short = 'u', long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// Enable logging to specified file
    #[arg(short = 'l', long, global = true, value_name = "FILE")]
    pub log: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the chat interface (default)
    Chat {
        /// Resume an existing conversation instead of starting a new one
        #[arg(short = 'c', long, value_name = "ID")]
        conversation: Option<String>,
    },
    /// Ask the council one question and print the final answer
    Ask {
        /// The question (can be multiple words)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        prompt: Vec<String>,
    },
    /// List conversations
    Conversations,
    /// Create an empty conversation
    New,
    /// Print a conversation
    Show {
        /// Conversation ID
        id: String,
    },
    /// Delete a conversation
    Delete {
        /// Conversation ID
        id: String,
    },
    /// List available models, or show/update a conversation's council
    Models {
        /// Conversation whose model configuration to show or change
        id: Option<String>,
        /// Council member model (repeatable)
        #[arg(long = "council", value_name = "MODEL", requires = "id")]
        council: Vec<String>,
        /// Chairman model
        #[arg(long, value_name = "MODEL", requires = "id")]
        chairman: Option<String>,
    },
    /// List council presets
    Presets,
    /// Save a custom preset
    PresetSave {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// Council member model (repeatable)
        #[arg(long = "council", value_name = "MODEL", required = true)]
        council: Vec<String>,
        #[arg(long, value_name = "MODEL")]
        chairman: String,
    },
    /// Delete a custom preset
    PresetDelete {
        /// Preset ID (custom presets only)
        id: String,
    },
    /// Copy a preset's models onto a conversation
    PresetApply {
        /// Preset ID
        preset: String,
        /// Conversation ID
        conversation: String,
    },
    /// Set configuration values, or print them when no key is given
    Set {
        /// Configuration key to set
        key: Option<String>,
        /// Value to set for the key
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        value: Vec<String>,
    },
    /// Unset configuration values
    Unset {
        /// Configuration key to unset
        key: String,
    },
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let command = args.command.unwrap_or(Commands::Chat { conversation: None });

    // The chat UI owns the terminal, so it only logs when asked to.
    match (&args.log, &command) {
        (Some(path), _) => init_file_logging(path)?,
        (None, Commands::Chat { .. }) => {}
        (None, _) => init_stderr_logging(),
    }

    let config = Config::load()?;
    let base_url = config.effective_base_url(args.base_url.as_deref());
    debug!(base_url = %base_url, "Resolved council backend");
    let client = CouncilClient::new(base_url);

    match command {
        Commands::Chat { conversation } => run_chat(client, config, conversation).await,
        Commands::Ask { prompt } => ask::run_ask(client, &config, prompt).await,
        Commands::Conversations => conversations::list_conversations(&client).await,
        Commands::New => conversations::new_conversation(&client).await,
        Commands::Show { id } => conversations::show_conversation(&client, &id).await,
        Commands::Delete { id } => conversations::delete_conversation(&client, &id).await,
        Commands::Models {
            id: None,
            ..
        } => models::list_models(&client).await,
        Commands::Models {
            id: Some(id),
            council,
            chairman,
        } => models::conversation_models(&client, &id, council, chairman).await,
        Commands::Presets => presets::list_presets(&client).await,
        Commands::PresetSave {
            name,
            description,
            council,
            chairman,
        } => presets::save_preset(&client, name, description, council, chairman).await,
        Commands::PresetDelete { id } => presets::delete_preset(&client, &id).await,
        Commands::PresetApply {
            preset,
            conversation,
        } => presets::apply_preset(&client, &preset, &conversation).await,
        Commands::Set { key, value } => {
            if let Err(e) = settings::run_set(key, value) {
                e.print();
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Unset { key } => {
            if let Err(e) = settings::run_unset(&key) {
                e.print();
                std::process::exit(1);
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests;
