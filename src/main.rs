//! agent-harvest - command line entry point
//!
//! `harvest` runs OpenHands against a repository and prints the test files it
//! produced as JSON. `chat` sends one prompt to an Azure OpenAI deployment.

use std::path::PathBuf;
use std::sync::Arc;

use agent_harvest::backend::openhands::OpenHandsRuntime;
use agent_harvest::config::Config;
use agent_harvest::harvest::AgentInvoker;
use agent_harvest::llm::{AzureChat, DEFAULT_MODEL};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    name = "agent-harvest",
    about = "Run a coding agent on a repository and collect the tests it writes",
    version
)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the agent on a repository and print the harvested test files
    Harvest {
        /// Repository the agent works in
        repo_dir: PathBuf,
        /// Instruction given to the agent
        prompt: String,
    },
    /// Send a single prompt to an Azure OpenAI deployment
    Chat {
        prompt: String,
        /// System prompt prepended to the conversation
        #[arg(short, long, default_value = "")]
        system: String,
        /// Deployment to use: gpt-4o or o3-mini
        #[arg(short, long, default_value = DEFAULT_MODEL)]
        model: String,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async_main(args))
}

async fn async_main(args: Args) -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays machine-readable.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agent_harvest=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env()?;

    match args.command {
        Command::Harvest { repo_dir, prompt } => {
            info!(
                "Harvesting tests: repo={}, python={}",
                repo_dir.display(),
                config.openhands.python_path
            );
            let invoker = AgentInvoker::new(Arc::new(OpenHandsRuntime::with_config(
                config.openhands,
            )));
            let files = invoker.invoke(&repo_dir, &prompt).await?;
            info!("Harvested {} test files", files.len());
            println!("{}", serde_json::to_string_pretty(&files)?);
        }
        Command::Chat {
            prompt,
            system,
            model,
        } => {
            let chat = AzureChat::from_config(&config.azure);
            match chat.call_chat(prompt, &system, &model).await? {
                Some(responses) => {
                    for response in responses {
                        println!("{}", response);
                    }
                }
                None => println!("(no content)"),
            }
        }
    }

    Ok(())
}
