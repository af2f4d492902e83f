use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use notify_debouncer_mini::{DebouncedEvent, DebouncedEventKind, new_debouncer};

use adapters::controlplane::load_network_map;
use adapters::firewall::{InstalledRule, UserspaceFirewall};
use application::acl_service_impl::AclAppService;
use infrastructure::constants::WATCH_DEBOUNCE_MS;
use ports::secondary::firewall_port::FirewallPort;

use crate::cli::OutputFormat;
use crate::shutdown;

fn build_service() -> (Arc<UserspaceFirewall>, AclAppService) {
    let firewall = UserspaceFirewall::new();
    let service = AclAppService::new(Some(firewall.clone() as Arc<dyn FirewallPort>));
    (firewall, service)
}

fn apply_once(service: &AclAppService, path: &Path) -> Result<()> {
    let map = load_network_map(path)
        .with_context(|| format!("loading network map from {}", path.display()))?;
    service.apply_filtering(&map);
    Ok(())
}

// ── Apply ───────────────────────────────────────────────────────────────

pub fn cmd_apply(map_path: &Path, output: OutputFormat) -> Result<()> {
    let (firewall, service) = build_service();
    apply_once(&service, map_path)?;
    print_rules(&firewall.installed_rules(), output)
}

fn print_rules(rules: &[InstalledRule], output: OutputFormat) -> Result<()> {
    if output == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(rules)?);
        return Ok(());
    }

    if rules.is_empty() {
        println!("No firewall rules installed.");
        return Ok(());
    }

    println!(
        "{:<10}  {:<39}  {:<5}  {:<3}  {:<6}  {:>8}  {:>8}  {:<9}",
        "ID", "PEER IP", "PROTO", "DIR", "ACTION", "SRC", "DST", "IPSET"
    );
    for rule in rules {
        let src = rule
            .src_port
            .as_ref()
            .map_or_else(|| "any".to_string(), ToString::to_string);
        let dst = rule
            .dst_port
            .as_ref()
            .map_or_else(|| "any".to_string(), ToString::to_string);
        println!(
            "{:<10}  {:<39}  {:<5}  {:<3}  {:<6}  {:>8}  {:>8}  {:<9}",
            rule.id,
            rule.ip.to_string(),
            rule.protocol.as_str(),
            rule.direction.as_str(),
            rule.action.as_str(),
            src,
            dst,
            rule.ipset_name,
        );
    }
    Ok(())
}

// ── Watch ───────────────────────────────────────────────────────────────

pub async fn cmd_watch(map_path: &Path) -> Result<()> {
    let (_firewall, service) = build_service();

    apply_once(&service, map_path)?;

    // File watcher events → async loop, debounced so an editor's
    // write-then-rename shows up as one change.
    let (notify_tx, mut notify_rx) = tokio::sync::mpsc::channel::<()>(4);
    let mut debouncer = new_debouncer(
        Duration::from_millis(WATCH_DEBOUNCE_MS),
        move |res: Result<Vec<DebouncedEvent>, notify::Error>| {
            if let Ok(events) = res {
                for event in &events {
                    if event.kind == DebouncedEventKind::Any {
                        let _ = notify_tx.blocking_send(());
                        return;
                    }
                }
            }
        },
    )
    .context("failed to create network map watcher")?;
    debouncer
        .watcher()
        .watch(map_path, notify::RecursiveMode::NonRecursive)
        .with_context(|| format!("failed to watch {}", map_path.display()))?;

    tracing::info!(path = %map_path.display(), "watching network map for changes");

    let token = shutdown::create_shutdown_token();
    loop {
        tokio::select! {
            () = token.cancelled() => {
                tracing::info!("shutdown signal received");
                break;
            }
            Some(()) = notify_rx.recv() => {
                if let Err(e) = apply_once(&service, map_path) {
                    // Keep the last good rule set; the next change gets
                    // another chance.
                    tracing::error!("failed to re-apply network map: {e:#}");
                }
            }
        }
    }

    Ok(())
}
