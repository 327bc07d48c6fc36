// src/lib.rs

pub mod build;
pub mod cli;
pub mod commands;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod server;
pub mod sync;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::commands::{Command, Invocation};
use crate::config::{load_project_config, load_server_config, ServerConfig};
use crate::engine::{BuildContext, BuildOptions, Orchestrator, Runtime, RuntimeEvent};
use crate::errors::{Result, SdkError};
use crate::exec::declare_plugin_tasks;
use crate::fs::{FileSystem, RealFileSystem};
use crate::server::ServerVersion;
use crate::sync::{HttpSandbox, LocalDirSandbox, SandboxClient, SandboxSync};
use crate::types::VersionProtocol;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - command lookup (before any configuration is read)
/// - server configuration and project manifest loading
/// - the build context and its sandbox
/// - the task catalogue and the orchestrator
/// - for `dev`, the file watcher, Ctrl-C handling and the watch runtime
pub async fn run(args: CliArgs) -> Result<()> {
    let command = match commands::resolve(args.command.as_deref()) {
        Ok(Invocation::Run(cmd)) => cmd,
        Ok(Invocation::Usage) => {
            print!("{}", commands::usage());
            return Ok(());
        }
        Err(err) => {
            print!("{}", commands::usage());
            return Err(err);
        }
    };

    let server = if args.use_server_defaults {
        debug!("using built-in server defaults");
        ServerConfig::default()
    } else {
        load_server_config(&args.server_config)?
    };

    let project_path = PathBuf::from(&args.project);
    let project = load_project_config(&project_path)?;
    let root = project_root(&project_path);

    let options = build_options(&args, &server)?;
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let mut ctx = BuildContext::new(Arc::clone(&fs), &root, server, project, options);
    if let Some(sandbox) = sandbox_for(&ctx) {
        ctx = ctx.with_sandbox(sandbox);
    }

    let mut orchestrator = Orchestrator::new();
    declare_plugin_tasks(&mut orchestrator, &ctx)?;

    if ctx.options().dry_run {
        print_dry_run(&orchestrator, command)?;
        return Ok(());
    }

    info!(
        command = command.name,
        task = command.entry_task,
        community = ctx.server().community.as_deref().unwrap_or("-"),
        root = ?root,
        "running"
    );
    let report = orchestrator.run(&ctx, command.entry_task).await?;
    debug!(executed = ?report.executed, skipped = ?report.skipped, "entry task complete");

    if !command.watch {
        return Ok(());
    }

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);
    let _watcher_handle = watch::spawn_watcher(&root, Arc::clone(&fs), rt_tx.clone())?;

    // Ctrl-C → graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl+C");
                return;
            }
            request_shutdown(&tx).await;
        });
    }

    Runtime::new(orchestrator, ctx, rt_rx).run().await
}

/// CLI flags win. `dryRun` from the server config applies when the flag is
/// absent.
/// Ask the runtime loop to stop. Returns false when it has already exited.
async fn request_shutdown(tx: &mpsc::Sender<RuntimeEvent>) -> bool {
    if tx.send(RuntimeEvent::ShutdownRequested).await.is_err() {
        debug!("runtime already stopped; shutdown request dropped");
        return false;
    }
    true
}

fn build_options(args: &CliArgs, server: &ServerConfig) -> Result<BuildOptions> {
    let mut options = BuildOptions::with_bundled_minimum()?;
    options.dry_run = args.dry_run || server.dry_run;
    if let Some(min) = &args.min_version {
        options.minimum_version = ServerVersion::parse(min)?;
    }
    if args.legacy_version_check {
        options.protocol = VersionProtocol::LegacyXml;
    }
    Ok(options)
}

/// Directory holding the project manifest, or the working directory for a
/// bare file name. Canonicalized so watcher paths and context paths agree.
fn project_root(project_path: &Path) -> PathBuf {
    let dir = match project_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    };
    dir.canonicalize().unwrap_or(dir)
}

/// A local sandbox directory wins over uploading to the server.
fn sandbox_for(ctx: &BuildContext) -> Option<SandboxSync> {
    let server = ctx.server();
    let client: Arc<dyn SandboxClient> = match (&server.sandbox_plugin_dir, &server.server_url) {
        (Some(dir), _) => Arc::new(LocalDirSandbox::new(ctx.shared_fs(), ctx.resolve(dir))),
        (None, Some(url)) => Arc::new(HttpSandbox::new(
            url,
            &server.plugin_reload_url,
            server.plugin_token.clone(),
        )),
        (None, None) => return None,
    };
    Some(SandboxSync::new(client, ctx.plugin_dir()))
}

/// Print the tasks `command` would run, in execution order.
fn print_dry_run(orchestrator: &Orchestrator, command: &Command) -> Result<()> {
    let plan = orchestrator.plan(command.entry_task)?;
    println!("li dry-run: {}", command.name);
    println!();
    println!("tasks ({}):", plan.len());
    for name in &plan {
        let Some(spec) = orchestrator.spec(name) else {
            return Err(SdkError::TaskNotFound(name.clone()));
        };
        let mut notes = Vec::new();
        if spec.body.is_none() {
            notes.push("group".to_string());
        }
        if let Some(cond) = &spec.condition {
            notes.push(format!("when {}", cond.label));
        }
        if let Some(watch) = spec.watch_spec() {
            notes.push("watch".to_string());
            if !watch.then.is_empty() {
                notes.push(format!("then {:?}", watch.then));
            }
        }
        if notes.is_empty() {
            println!("  - {name}");
        } else {
            println!("  - {name} ({})", notes.join(", "));
        }
    }
    if command.watch {
        println!();
        println!("then watch for changes until interrupted");
    }
    debug!("dry-run complete (no execution)");
    Ok(())
}
