//! Command-line client for the copdesk backend.
//!
//! One-shot tool: each invocation performs one API call and prints the
//! response as pretty JSON. Batch payloads (tasks, profiles, patches) are
//! read from JSON files to keep the flag surface small.

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use tracing_subscriber::EnvFilter;

use copdesk_api::ApiClient;
use copdesk_core::api::{
    NewProfile, NewTask, ProfileGroupPatch, ProfilePatch, ReleasePatch, TaskPatch,
};

#[derive(Parser, Debug)]
#[command(name = "copdeskctl", version, about = "Control the copdesk backend")]
struct Args {
    /// Backend base URL.
    #[arg(long, global = true, default_value = "http://127.0.0.1:4000")]
    backend: String,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    Release {
        #[command(subcommand)]
        release: ReleaseCmd,
    },
    Task {
        #[command(subcommand)]
        task: TaskCmd,
    },
    Group {
        #[command(subcommand)]
        group: GroupCmd,
    },
    Profile {
        #[command(subcommand)]
        profile: ProfileCmd,
    },
}

#[derive(Subcommand, Debug)]
enum ReleaseCmd {
    /// List all releases.
    List,
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        site: String,
    },
    Delete {
        #[arg(long)]
        id: String,
    },
    /// Apply a partial update read from a JSON patch file.
    Update {
        #[arg(long)]
        id: String,
        #[arg(long)]
        file: String,
    },
}

#[derive(Subcommand, Debug)]
enum TaskCmd {
    /// Add tasks from a JSON file holding an array of task payloads.
    Add {
        #[arg(long)]
        release: String,
        #[arg(long)]
        file: String,
    },
    Remove {
        #[arg(long)]
        release: String,
        #[arg(long, num_args = 1..)]
        task_ids: Vec<String>,
    },
    /// Update tasks from a JSON file: `{"taskIds": [...], "updates": [...]}`.
    Update {
        #[arg(long)]
        release: String,
        #[arg(long)]
        file: String,
    },
    Start {
        #[arg(long)]
        release: String,
        #[arg(long, num_args = 1..)]
        task_ids: Vec<String>,
    },
    Stop {
        #[arg(long)]
        release: String,
        #[arg(long, num_args = 1..)]
        task_ids: Vec<String>,
    },
    /// Print a task's log, optionally only entries after a timestamp.
    Log {
        #[arg(long)]
        release: String,
        #[arg(long)]
        task: String,
        #[arg(long)]
        after: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum GroupCmd {
    /// List all profile groups.
    List,
    Create {
        #[arg(long)]
        name: String,
    },
    Delete {
        #[arg(long)]
        id: String,
    },
    Update {
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: String,
    },
    /// Import groups from a file readable by the backend.
    Import {
        #[arg(long)]
        file: String,
    },
    /// Export all groups to a file writable by the backend.
    Export {
        #[arg(long)]
        file: String,
    },
}

#[derive(Subcommand, Debug)]
enum ProfileCmd {
    /// List a group's profiles with their effective shipping addresses.
    List {
        #[arg(long)]
        group: String,
    },
    /// Add profiles from a JSON file holding an array of profile payloads.
    Add {
        #[arg(long)]
        group: String,
        #[arg(long)]
        file: String,
    },
    Remove {
        #[arg(long)]
        group: String,
        #[arg(long, num_args = 1..)]
        profile_ids: Vec<String>,
    },
    /// Apply a partial update read from a JSON patch file.
    Update {
        #[arg(long)]
        group: String,
        #[arg(long)]
        id: String,
        #[arg(long)]
        file: String,
    },
}

async fn read_json<T: DeserializeOwned>(path: &str) -> anyhow::Result<T> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("read {path}"))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parse {path}"))
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Wire shape of the `task update --file` payload.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskUpdateFile {
    task_ids: Vec<String>,
    updates: Vec<TaskPatch>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let client = ApiClient::new(&args.backend);

    match args.cmd {
        Cmd::Release { release } => match release {
            ReleaseCmd::List => print_json(&client.list_releases().await?)?,
            ReleaseCmd::Create { name, site } => {
                let req = copdesk_core::api::CreateReleaseRequest { name, site };
                print_json(&client.create_release(&req).await?)?;
            }
            ReleaseCmd::Delete { id } => {
                client.delete_release(&id).await?;
                println!("deleted {id}");
            }
            ReleaseCmd::Update { id, file } => {
                let patch: ReleasePatch = read_json(&file).await?;
                print_json(&client.update_release(&id, &patch).await?)?;
            }
        },
        Cmd::Task { task } => match task {
            TaskCmd::Add { release, file } => {
                let tasks: Vec<NewTask> = read_json(&file).await?;
                print_json(&client.add_tasks(&release, tasks).await?)?;
            }
            TaskCmd::Remove { release, task_ids } => {
                client.remove_tasks(&release, task_ids).await?;
                println!("removed");
            }
            TaskCmd::Update { release, file } => {
                let body: TaskUpdateFile = read_json(&file).await?;
                print_json(&client.update_tasks(&release, body.task_ids, body.updates).await?)?;
            }
            TaskCmd::Start { release, task_ids } => {
                client.start_tasks(&release, task_ids).await?;
                println!("started");
            }
            TaskCmd::Stop { release, task_ids } => {
                client.stop_tasks(&release, task_ids).await?;
                println!("stopped");
            }
            TaskCmd::Log {
                release,
                task,
                after,
            } => {
                let log = client.poll_task_log(&release, &task, after.as_deref()).await?;
                print_json(&log.entries)?;
            }
        },
        Cmd::Group { group } => match group {
            GroupCmd::List => print_json(&client.list_profile_groups().await?)?,
            GroupCmd::Create { name } => {
                let req = copdesk_core::api::CreateProfileGroupRequest { name };
                print_json(&client.create_profile_group(&req).await?)?;
            }
            GroupCmd::Delete { id } => {
                client.delete_profile_group(&id).await?;
                println!("deleted {id}");
            }
            GroupCmd::Update { id, name } => {
                let patch = ProfileGroupPatch { name: Some(name) };
                print_json(&client.update_profile_group(&id, &patch).await?)?;
            }
            GroupCmd::Import { file } => {
                print_json(&client.import_profile_groups(&file).await?)?;
            }
            GroupCmd::Export { file } => {
                client.export_profile_groups(&file).await?;
                println!("exported to {file}");
            }
        },
        Cmd::Profile { profile } => match profile {
            ProfileCmd::List { group } => {
                let groups = client.list_profile_groups().await?;
                let found = groups
                    .get(&group)
                    .with_context(|| format!("no group {group}"))?;
                let mut profiles: Vec<_> = found.profiles.values().collect();
                profiles.sort_by(|a, b| a.name.cmp(&b.name));
                for p in profiles {
                    println!("{}  {}", p.name, p.effective_shipping_address());
                }
            }
            ProfileCmd::Add { group, file } => {
                let profiles: Vec<NewProfile> = read_json(&file).await?;
                print_json(&client.add_profiles(&group, profiles).await?)?;
            }
            ProfileCmd::Remove { group, profile_ids } => {
                client.remove_profiles(&group, profile_ids).await?;
                println!("removed");
            }
            ProfileCmd::Update { group, id, file } => {
                let patch: ProfilePatch = read_json(&file).await?;
                print_json(&client.update_profile(&group, &id, &patch).await?)?;
            }
        },
    }

    Ok(())
}
