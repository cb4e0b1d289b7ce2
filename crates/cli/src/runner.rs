use anyhow::{anyhow, Context, Result};
use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use camscout_channels::{Catalog, ChannelEnumerator, DiscoveryMode};
use camscout_common::{
    generate_rtsp_url, parse_rtsp_url, user_agent, validate_rtsp_url, Credential, Endpoint, RtspProbeResult,
    ScanOptions, StreamCheck, StreamValidator, DEFAULT_PORTS,
};
use camscout_orchestrator::{ScanSession, SessionReport};
use camscout_rtsp::RtspClient;
use camscout_scanner_tcp::TcpProber;
use camscout_target_resolver::{local_network, TargetResolver};

use crate::args::{CheckUrlArgs, ProbeArgs, ScanArgs};
use crate::output::{emit_report, format_duration};
use crate::validator::FfprobeValidator;

/// Everything a scan needs, resolved from the command line before any network activity.
pub struct ScanPlan {
    pub targets: Vec<IpAddr>,
    pub ports: Vec<u16>,
    pub options: ScanOptions,
    pub catalog: Catalog,
    pub mode: DiscoveryMode,
    pub credential: Option<Credential>,
    pub brute: bool,
    pub skip_channels: bool,
}

impl ScanPlan {
    pub async fn from_args(args: &ScanArgs) -> Result<Self> {
        let mut options = match args.preset.as_str() {
            "fast" => ScanOptions::fast(),
            "gentle" => ScanOptions::gentle(),
            _ => ScanOptions::default(),
        };
        if let Some(ms) = args.timeout {
            options.port_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = args.rtsp_timeout {
            options.rtsp_timeout = Duration::from_millis(ms);
        }
        if let Some(n) = args.workers {
            options.port_concurrency = n;
        }
        if let Some(n) = args.channel_workers {
            options.channel_concurrency = n;
        }
        if args.rate_limit.is_some() {
            options.rate_limit = args.rate_limit;
        }
        if let Some(max) = args.channels_max {
            options.max_channel = max;
        }

        let targets = match &args.targets {
            Some(spec) => TargetResolver::resolve(spec).await?,
            None => {
                let network = local_network();
                info!("No targets given, scanning local network {}", network);
                network.addresses().collect()
            }
        };
        let ports = match &args.ports {
            Some(spec) => parse_ports(spec)?,
            None => DEFAULT_PORTS.to_vec(),
        };
        let catalog = load_catalog(args.catalog.as_deref())?;

        let mode = match args.mode.parse::<DiscoveryMode>()? {
            DiscoveryMode::Numbered { .. } => DiscoveryMode::Numbered { max: options.max_channel },
            mode => mode,
        };

        Ok(Self {
            targets,
            ports,
            options,
            catalog,
            mode,
            credential: credential(args.username.as_deref(), args.password.as_deref()),
            brute: args.brute,
            skip_channels: args.skip_channels,
        })
    }
}

pub async fn run_scan(args: ScanArgs) -> Result<()> {
    let plan = ScanPlan::from_args(&args).await?;
    info!(
        "Scanning {} host(s) x {} port(s), mode {}, {} catalog entries",
        plan.targets.len(),
        plan.ports.len(),
        plan.mode,
        plan.catalog.len()
    );

    let session = Arc::new(ScanSession::new().with_rate_limit(plan.options.rate_limit));
    let interrupt = {
        let session = session.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, finishing in-flight probes");
                session.cancel();
            }
        })
    };

    let validator = args
        .check
        .then(|| FfprobeValidator::new(plan.options.rtsp_timeout));
    let report = execute(
        &session,
        &plan,
        validator.as_ref().map(|v| v as &dyn StreamValidator),
    )
    .await;
    interrupt.abort();

    info!(
        "Scan finished in {}: {} open port(s), {} reachable stream path(s)",
        format_duration(report.duration().to_std().unwrap_or_default()),
        report.stats.open_ports,
        report.reachable().count()
    );
    emit_report(&report, &args.output_format, args.output.as_deref())
}

/// Port sweep, then path discovery on every open port, then optional stream checks.
pub async fn execute(session: &ScanSession, plan: &ScanPlan, validator: Option<&dyn StreamValidator>) -> SessionReport {
    let span = session.span();
    let options = &plan.options;

    let prober = TcpProber::new()
        .with_timeout(options.port_timeout)
        .with_span(span.clone());
    let ports = prober
        .probe_targets(
            &session.coordinator(options.port_concurrency),
            &plan.targets,
            &plan.ports,
            |p| debug!("port sweep {}/{} ({} open)", p.completed, p.total, p.matched),
        )
        .await;
    let open: Vec<Endpoint> = ports.iter().filter(|p| p.is_open()).map(|p| p.endpoint()).collect();
    session.record_ports(ports).await;

    if plan.skip_channels || open.is_empty() {
        return session.finish().await;
    }

    let client = RtspClient::new()
        .with_timeout(options.rtsp_timeout)
        .with_user_agent(user_agent())
        .with_span(span.clone());
    let enumerator = ChannelEnumerator::new(client, session.coordinator(options.channel_concurrency))
        .with_progress(|p| debug!("paths {}/{} ({} reachable)", p.completed, p.total, p.matched))
        .with_span(span);

    let mut brute_list = Vec::new();
    if plan.brute {
        brute_list.extend(plan.credential.clone());
        brute_list.extend(Credential::common().into_iter().filter(|c| Some(c) != plan.credential.as_ref()));
    }

    let rtsp: Vec<Endpoint> = enumerator
        .confirm_rtsp(&open)
        .await
        .into_iter()
        .filter(|check| check.is_rtsp)
        .map(|check| Endpoint::new(check.host, check.port))
        .collect();
    if rtsp.len() < open.len() {
        info!("skipping {} open port(s) without an RTSP answer to OPTIONS", open.len() - rtsp.len());
    }

    for endpoint in rtsp {
        if session.is_cancelled() {
            break;
        }
        let mut results = enumerator
            .discover(endpoint.ip, endpoint.port, &plan.catalog, plan.credential.as_ref(), plan.mode)
            .await;
        if plan.brute {
            let cracked = enumerator.crack(endpoint.ip, endpoint.port, &results, &brute_list).await;
            merge_cracked(&mut results, cracked);
        }
        let working: Vec<RtspProbeResult> = results.iter().filter(|r| r.is_ok()).cloned().collect();
        session.record_probes(results).await;

        if let Some(validator) = validator {
            let checks = validate(validator, &working).await;
            session.record_validations(checks).await;
        }
    }

    session.finish().await
}

/// Replace each protected result with the one its credential search opened.
fn merge_cracked(results: &mut [RtspProbeResult], cracked: Vec<RtspProbeResult>) {
    for found in cracked {
        if let Some(slot) = results
            .iter_mut()
            .find(|r| r.path == found.path && r.manufacturer_tag == found.manufacturer_tag)
        {
            *slot = found;
        }
    }
}

async fn validate(validator: &dyn StreamValidator, working: &[RtspProbeResult]) -> Vec<StreamCheck> {
    let mut checks = Vec::with_capacity(working.len());
    for probe in working {
        let url = generate_rtsp_url(&probe.host.to_string(), probe.port, &probe.path, "", "");
        let check = if validator.is_available() {
            match validator.verify_stream(&url, probe.credential.as_ref()).await {
                Ok(check) => check,
                Err(e) => StreamCheck::unavailable(url, e.to_string()),
            }
        } else {
            StreamCheck::unavailable(url, format!("{} is not available", validator.name()))
        };
        checks.push(check);
    }
    if !validator.is_available() && !checks.is_empty() {
        warn!("{} not available, {} stream(s) left unchecked", validator.name(), checks.len());
    }
    checks
}

pub async fn run_probe(args: ProbeArgs) -> Result<()> {
    let addr = resolve_one(&args.host).await?;
    let client = RtspClient::new()
        .with_timeout(Duration::from_millis(args.timeout))
        .with_user_agent(user_agent());

    let check = client.check_protocol(addr, args.port).await;
    println!("{}", serde_json::to_string_pretty(&check)?);

    if let Some(path) = &args.path {
        let cred = credential(args.username.as_deref(), args.password.as_deref());
        let playback = client.verify_playback(addr, args.port, path, cred.as_ref()).await;
        println!("{}", serde_json::to_string_pretty(&playback)?);
    }
    Ok(())
}

pub async fn run_check_url(args: CheckUrlArgs) -> Result<()> {
    if let Err(reason) = validate_rtsp_url(&args.url) {
        return Err(anyhow!("{}: {}", args.url, reason));
    }
    let parts = parse_rtsp_url(&args.url)?;
    println!("{}", serde_json::to_string_pretty(&parts)?);

    if args.play {
        let addr = resolve_one(&parts.hostname).await?;
        let cred = credential(parts.username.as_deref(), parts.password.as_deref());
        let client = RtspClient::new()
            .with_timeout(Duration::from_millis(args.timeout))
            .with_user_agent(user_agent());
        let playback = client.verify_playback(addr, parts.port, &parts.path, cred.as_ref()).await;
        println!("{}", serde_json::to_string_pretty(&playback)?);
    }
    Ok(())
}

async fn resolve_one(host: &str) -> Result<IpAddr> {
    let host = host.trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(ip);
    }
    TargetResolver::resolve(host)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("{} did not resolve", host))
}

fn credential(username: Option<&str>, password: Option<&str>) -> Option<Credential> {
    let cred = Credential::new(username.unwrap_or_default(), password.unwrap_or_default());
    (!cred.is_empty()).then_some(cred)
}

fn load_catalog(path: Option<&Path>) -> Result<Catalog> {
    let Some(path) = path else {
        return Ok(Catalog::builtin());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read catalog {}", path.display()))?;
    Catalog::from_json(&json).with_context(|| format!("invalid catalog {}", path.display()))
}

/// Parses a port string like "554,8554,550-560" into a vector of u16 ports
fn parse_ports(ports_str: &str) -> Result<Vec<u16>> {
    let mut ports = Vec::new();

    for part in ports_str.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        if let Some((start, end)) = part.split_once('-') {
            let start: u16 = start.trim().parse().context(format!("Invalid start port: {}", start))?;
            let end: u16 = end.trim().parse().context(format!("Invalid end port: {}", end))?;
            if start > end {
                return Err(anyhow!("Invalid range: start > end"));
            }
            ports.extend(start..=end);
        } else {
            let port: u16 = part.parse().context(format!("Invalid port: {}", part))?;
            ports.push(port);
        }
    }

    ports.retain(|&p| p != 0);
    ports.sort_unstable();
    ports.dedup();
    if ports.is_empty() {
        Err(anyhow!("No ports specified"))
    } else {
        Ok(ports)
    }
}
