//! An air-quality and weather dashboard.
//!
//! Fetches the last day of hourly readings from Open-Meteo, replays them
//! hour by hour onto a grid of charts, gauges, text and 3D icons, then keeps
//! the board current by polling live values. Daily bars show the mean of each
//! day over the past and coming week.
//!
//! The flow is
//! [DataSource](source::DataSource) → [Timeline](timeline::Timeline) →
//! [ReplayScheduler](replay::ReplayScheduler) → [ProjectionSet](projection::ProjectionSet) →
//! [Board](board::Board) → [Dashboard](dashboard::Dashboard),
//! after which the [LivePoller](poller::LivePoller) feeds the same projections.
//!
//! # Features
//! - `simulator`: draw into a desktop window (needs SDL2) rather than rewriting a PNG
//!   at `frame_path` on every flush.

pub mod assets;
pub mod board;
pub mod dashboard;
pub mod frame;
pub mod layout;
pub mod metric;
pub mod outlook;
pub mod pacing;
pub mod panel;
pub mod poller;
pub mod projection;
pub mod replay;
pub mod settings;
pub mod simulator;
pub mod source;
pub mod tier;
pub mod timeline;

use assets::AssetLibrary;
use board::Board;
use dashboard::Dashboard;
use layout::Layout;
use metric::Metric;
use outlook::DailyOutlook;
use pacing::{Clock, Context, LocalClock, Pacer};
use poller::LivePoller;
use projection::ProjectionSet;
use replay::{ReplayScheduler, ReplayState};
use settings::{Settings, SettingsError};
use source::{DataSource, OpenMeteoSource, SourceError, Window};
use timeline::Timeline;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("could not fetch history: {0}")]
    Source(#[from] SourceError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error("no hour has a value for every metric; nothing to replay")]
    EmptyTimeline,
}

/// Run the dashboard against Open-Meteo until `ctx` is cancelled.
pub fn run<D: Dashboard>(settings: &Settings, dashboard: D, ctx: &Context) -> Result<D, Error> {
    settings.validate()?;
    let mut source = OpenMeteoSource::new(settings.into())?;
    let mut pacer = ctx.clone();
    run_with(settings, &mut source, dashboard, &mut pacer, &LocalClock)
}

/// Draw the daily outlook, fetch history, replay it, then poll, until the
/// pacer reports cancellation.
///
/// Returns the dashboard once the run ends. History that cannot be fetched
/// ends the run before anything is replayed.
pub fn run_with<D: Dashboard>(
    settings: &Settings,
    source: &mut impl DataSource,
    dashboard: D,
    pacer: &mut impl Pacer,
    clock: &impl Clock,
) -> Result<D, Error> {
    tracing::info!(
        "dashboard for {} ({}, {})",
        settings.location,
        settings.latitude,
        settings.longitude
    );
    let mut board = Board::new(
        dashboard,
        ProjectionSet::standard(),
        AssetLibrary::new(&settings.asset_root),
    );
    board.build(&Layout::standard(&settings.location));

    // The bars are a side panel; the run goes on without them.
    match source.fetch_history(&Metric::DAILY, settings.outlook_window()) {
        Ok(series) => {
            let outlook = DailyOutlook::from_series(&series);
            tracing::info!("{} daily means", outlook.len());
            board.apply(outlook.updates());
            board.flush();
        }
        Err(e) => tracing::warn!("no daily outlook: {}", e),
    }

    let history = source.fetch_history(&Metric::ALL, Window::from(settings))?;
    let timeline = Timeline::merge(&history);
    if timeline.is_empty() {
        tracing::warn!("{}", Error::EmptyTimeline);
    } else {
        tracing::info!("{} hours of history", timeline.len());
    }

    let mut replay = ReplayScheduler::new(&timeline, settings.replay_step());
    replay.start(clock.now());
    if replay.run(&mut board, pacer) == ReplayState::Stopped {
        return Ok(board.into_dashboard());
    }

    let mut poller = LivePoller::new(&Metric::ALL, settings.poll_interval());
    poller.run(source, &mut board, &timeline, pacer, clock);
    Ok(board.into_dashboard())
}
