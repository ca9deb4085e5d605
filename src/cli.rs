use crate::config::Config;
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};
use nostalgia_core::{
    entities::*,
    gateways::{
        api::PinsApi,
        device::{DeviceError, LocationDevice, RawPosition},
    },
    geolocation::GeolocationConsent,
    location_detail::{DetailCompletion, DetailOpened, LocationDetailQueries},
    repositories::{ConsentRepo, OnboardingRepo},
    usecases,
    viewport::{AppliedPins, Completion, PinSetUpdate, PinsRequest, Settled, ViewportQueries},
};
use nostalgia_gateways::{
    device::FixedLocationDevice, http::HttpApi, query_cache::InMemoryQueryCache,
    storage::JsonFileStorage,
};
use std::path::PathBuf;
use url::Url;

/// Explore what used to be here.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Configuration file (default: nostalgia.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Settle a sequence of viewports and show their pins
    Pins {
        /// Zoom level of the map
        #[arg(long)]
        zoom: f64,

        /// Viewports as west,south,east,north
        #[arg(required = true, allow_hyphen_values = true, value_name = "BBOX")]
        viewports: Vec<MapBounds>,
    },
    /// Show the timeline of a location
    Location { id: PinId },
    /// Submit a memory of a former business
    Remember {
        /// Location of the business
        id: PinId,

        #[arg(long)]
        business_name: String,

        #[arg(long)]
        start_year: Option<i32>,

        #[arg(long)]
        end_year: Option<i32>,

        #[arg(long)]
        note: Option<String>,

        /// Link to a photo or document
        #[arg(long)]
        proof_url: Option<String>,
    },
    /// Inspect or change the stored geolocation consent
    Consent {
        #[command(subcommand)]
        action: ConsentAction,
    },
    /// Request the device position
    Locate {
        /// Origin the client is served from
        #[arg(long)]
        origin: Option<Url>,

        /// Position reported by the device as lat,lng
        #[arg(long, allow_hyphen_values = true, conflicts_with = "fail")]
        fix: Option<MapPoint>,

        /// Accuracy of the reported position in meters
        #[arg(long, requires = "fix")]
        accuracy: Option<f64>,

        /// Let the device fail
        #[arg(long, value_enum)]
        fail: Option<DeviceFailure>,
    },
}

#[derive(Subcommand)]
enum ConsentAction {
    /// Show the stored consent and the last known position
    Show,
    /// Forget the consent decision
    Reset,
    /// Don't show the onboarding again
    DismissOnboarding,
}

#[derive(Clone, Copy, ValueEnum)]
enum DeviceFailure {
    Denied,
    Timeout,
    Unavailable,
}

impl From<DeviceFailure> for DeviceError {
    fn from(from: DeviceFailure) -> Self {
        match from {
            DeviceFailure::Denied => Self::PermissionDenied,
            DeviceFailure::Timeout => Self::Timeout,
            DeviceFailure::Unavailable => Self::PositionUnavailable,
        }
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let cfg = Config::try_load_from_file_or_default(cli.config.as_ref())?;
    match cli.command {
        Command::Pins { zoom, viewports } => show_pins(&cfg, zoom, &viewports),
        Command::Location { id } => show_location(&cfg, id),
        Command::Remember {
            id,
            business_name,
            start_year,
            end_year,
            note,
            proof_url,
        } => {
            let submission = MemorySubmission {
                location_id: id,
                business_name,
                start_year,
                end_year,
                note,
                proof_url,
            };
            remember(&cfg, &submission)
        }
        Command::Consent { action } => consent(&cfg, action),
        Command::Locate {
            origin,
            fix,
            accuracy,
            fail,
        } => {
            let device = match (fix, fail) {
                (Some(pos), _) => FixedLocationDevice::with_fix(RawPosition {
                    lat: pos.lat(),
                    lng: pos.lng(),
                    accuracy,
                }),
                (None, Some(failure)) => FixedLocationDevice::failing(failure.into()),
                (None, None) => FixedLocationDevice::without_capability(),
            };
            let origin = origin.unwrap_or_else(|| cfg.geolocation.origin.clone());
            locate(&cfg, origin, &device)
        }
    }
}

fn http_api(cfg: &Config) -> Result<HttpApi> {
    HttpApi::try_new(cfg.api.base_url.clone(), cfg.api.timeout, cfg.api.retry)
}

fn print_applied(applied: &AppliedPins, source: &str) {
    let AppliedPins {
        key,
        update,
        evicted,
    } = applied;
    match update {
        PinSetUpdate::Changed(snapshot) => {
            println!("{key}: {} pins ({source}, changed)", snapshot.len());
        }
        PinSetUpdate::Unchanged => println!("{key}: unchanged ({source})"),
    }
    if let Some(evicted) = evicted {
        println!("  evicted {evicted}");
    }
}

fn fetch_pins(
    api: &HttpApi,
    cache: &InMemoryQueryCache,
    queries: &mut ViewportQueries,
    request: &PinsRequest,
) {
    let result = api.fetch_pins(&request.bounds, request.limit);
    match queries.complete(cache, request.id, result, TimestampMs::now()) {
        Completion::Applied(applied) => print_applied(&applied, "fetched"),
        Completion::Discarded => println!("{}: discarded", request.key),
        Completion::Failed(err) => println!("{}: {err} ({})", request.key, err.code()),
    }
}

fn show_pins(cfg: &Config, zoom: f64, viewports: &[MapBounds]) -> Result<()> {
    let api = http_api(cfg)?;
    let cache = InMemoryQueryCache::new(cfg.cache.gc_time);
    let mut queries = ViewportQueries::new(cfg.viewport);
    for bounds in viewports {
        let now = TimestampMs::now();
        cache.collect_garbage(now);
        match queries.settle(&cache, bounds, zoom, now) {
            Settled::BelowMinZoom => {
                println!("{bounds}: zoom {zoom} is too low to show pins");
            }
            Settled::InvalidBounds => println!("{bounds}: invalid viewport"),
            Settled::Cached(applied) => print_applied(&applied, "cached"),
            Settled::Revalidate { applied, request } => {
                print_applied(&applied, "stale");
                if let Some(request) = request {
                    fetch_pins(&api, &cache, &mut queries, &request);
                }
            }
            Settled::Pending(key) => println!("{key}: pending"),
            Settled::Fetch(request) => fetch_pins(&api, &cache, &mut queries, &request),
        }
    }
    let (Some(snapshot), Some(last)) = (queries.snapshot(), viewports.last()) else {
        return Ok(());
    };
    for pin in snapshot.pins() {
        println!(
            "{:>8}  {}  {}",
            pin.id,
            pin.address,
            pin.current_business.as_deref().unwrap_or("-")
        );
    }
    if let Some(nearest) = snapshot.nearest(last.center()) {
        println!("Nearest to the center: {} ({})", nearest.address, nearest.id);
    }
    Ok(())
}

fn show_location(cfg: &Config, id: PinId) -> Result<()> {
    let api = http_api(cfg)?;
    let cache = InMemoryQueryCache::new(cfg.cache.gc_time);
    let mut queries = LocationDetailQueries::new(cfg.cache.staleness.location_detail);
    let detail = match queries.open(&cache, id, TimestampMs::now()) {
        DetailOpened::Cached(detail) => detail,
        DetailOpened::Pending => return Ok(()),
        DetailOpened::Fetch(request) => {
            let result = api.fetch_location_detail(request.location_id);
            match queries.complete(&cache, request.id, result, TimestampMs::now()) {
                DetailCompletion::Applied(detail) => detail,
                DetailCompletion::Discarded => return Ok(()),
                DetailCompletion::Failed(err) => return Err(err.into()),
            }
        }
    };
    queries.close();
    println!("{} ({})", detail.address, detail.pos);
    if detail.timeline.is_empty() {
        println!("  No known history");
    }
    for entry in &detail.timeline {
        let date = |d: Option<time::Date>| d.map_or_else(|| "?".to_owned(), |d| d.to_string());
        println!(
            "  {} .. {}  {}{}{}",
            date(entry.start_date),
            if entry.is_current {
                "today".to_owned()
            } else {
                date(entry.end_date)
            },
            entry.business_name,
            entry
                .category
                .as_deref()
                .map(|c| format!(" ({c})"))
                .unwrap_or_default(),
            if entry.is_current { " [current]" } else { "" }
        );
    }
    Ok(())
}

fn remember(cfg: &Config, submission: &MemorySubmission) -> Result<()> {
    let api = http_api(cfg)?;
    let cache = InMemoryQueryCache::new(cfg.cache.gc_time);
    let receipt = usecases::submit_memory(&api, &cache, submission)?;
    println!(
        "Memory {} of location {} is {}",
        receipt.id, receipt.location_id, receipt.status
    );
    Ok(())
}

fn open_storage(cfg: &Config) -> Result<JsonFileStorage> {
    JsonFileStorage::try_new(&cfg.storage.dir).map_err(|err| {
        anyhow!(
            "Unable to open the storage in {}: {err}",
            cfg.storage.dir.display()
        )
    })
}

fn consent(cfg: &Config, action: ConsentAction) -> Result<()> {
    let storage = open_storage(cfg)?;
    match action {
        ConsentAction::Show => {
            println!("Consent: {}", storage.consent()?);
            match storage.last_position()? {
                Some(position) => println!(
                    "Last position: {} at {} (accuracy: {})",
                    position.pos,
                    position.ts,
                    position
                        .accuracy
                        .map_or_else(|| "unknown".to_owned(), |a| format!("{a}m"))
                ),
                None => println!("Last position: unknown"),
            }
            println!(
                "Onboarding dismissed: {}",
                storage.is_onboarding_dismissed()?
            );
        }
        ConsentAction::Reset => {
            let mut machine = GeolocationConsent::new(
                &storage,
                cfg.geolocation.origin.clone(),
                cfg.geolocation.settings,
            );
            machine.reset_consent();
            println!("Consent: {}", machine.consent());
        }
        ConsentAction::DismissOnboarding => {
            usecases::dismiss_onboarding(&storage)?;
            println!("Onboarding dismissed");
        }
    }
    Ok(())
}

fn locate(cfg: &Config, origin: Url, device: &FixedLocationDevice) -> Result<()> {
    let storage = open_storage(cfg)?;
    let mut machine = GeolocationConsent::new(&storage, origin, cfg.geolocation.settings);
    if let Some(request) = machine.init(device) {
        let outcome = device.current_position(&request.options);
        machine.complete_request(request.id, outcome, TimestampMs::now());
    } else if machine.state() == GeolocationState::Denied {
        println!("Geolocation consent was denied before, reset it first");
    } else {
        machine.locate(device, TimestampMs::now());
    }
    println!("State: {}", machine.state());
    if let Some(err) = machine.error() {
        println!("Error: {} ({})", err.message, err.reason);
    }
    let focus = machine.map_focus(&cfg.map);
    println!("Map center: {} (zoom {})", focus.center, focus.zoom);
    Ok(())
}
