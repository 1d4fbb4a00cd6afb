//! Relaunch - Resend Listmonk campaigns to new subscribers
//!
//! Each campaign is launched if it never ran, otherwise a copy is sent to
//! everyone who joined its lists since the last send.

use anyhow::{Result, bail};
use campaign::{CampaignId, CampaignResumer, ListIdCache, ListmonkClient, ServiceSettings};
use clap::Parser;
use log::{error, info, warn};
use std::sync::Arc;

/// Resend Listmonk campaigns to subscribers who joined since the last send
#[derive(Parser, Debug)]
#[command(name = "relaunch")]
#[command(version)]
struct Args {
    /// Campaigns to launch or resume, in parallel
    #[arg(required = true)]
    campaign_ids: Vec<u64>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    // Bootstrap config directory
    if let Err(e) = config::init() {
        error!("Failed to initialize config directory: {}", e);
    }

    let ids: Vec<CampaignId> = args.campaign_ids.into_iter().map(CampaignId::from).collect();

    let settings = match ServiceSettings::load() {
        Ok(settings) => settings,
        Err(e) => {
            warn!("Listmonk settings not found: {}", e);
            if let Some(path) = ServiceSettings::default_settings_path() {
                warn!(
                    "To configure Listmonk access, either:\n\
                     1. Place your settings at: {}\n\
                     2. Or set environment variables: LISTMONK_URL, LISTMONK_USERNAME and LISTMONK_PASSWORD",
                    path.display()
                );
            }
            return Err(e);
        }
    };

    let service = Arc::new(ListmonkClient::new(&settings)?);
    let lists = Arc::new(ListIdCache::initialize(
        service.clone(),
        settings.refresh_lists_on_miss,
    )?);
    let resumer = CampaignResumer::new(service, lists);
    info!("Connected to {}", settings.base_url);

    let resumer = &resumer;
    let failures = std::thread::scope(|s| {
        let handles: Vec<_> = ids
            .iter()
            .map(|&id| (id, s.spawn(move || resumer.resume(id))))
            .collect();

        let mut failures = 0;
        for (id, handle) in handles {
            match handle.join() {
                Ok(Ok(outcome)) => info!("Campaign {}: {}", id, outcome),
                Ok(Err(e)) => {
                    error!("Campaign {} failed: {}", id, e);
                    failures += 1;
                }
                Err(_) => {
                    error!("Campaign {} panicked", id);
                    failures += 1;
                }
            }
        }
        failures
    });

    if failures > 0 {
        bail!("{} of {} campaigns failed", failures, ids.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_campaign_ids() {
        let args = Args::try_parse_from(["relaunch", "3", "17"]).unwrap();
        assert_eq!(args.campaign_ids, vec![3, 17]);
    }

    #[test]
    fn test_campaign_ids_required() {
        assert!(Args::try_parse_from(["relaunch"]).is_err());
    }

    #[test]
    fn test_rejects_non_numeric_id() {
        assert!(Args::try_parse_from(["relaunch", "newsletter"]).is_err());
    }
}
